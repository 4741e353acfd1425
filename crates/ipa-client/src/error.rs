/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ipa_transport::TransportError),

    /// Telegram-level error.
    #[error("telegram error: {0}")]
    Frame(#[from] ipa_telegram::FrameError),

    /// The request could not be written (not connected or the write failed).
    #[error("failed to send request for job {job_id}")]
    SendFailed { job_id: u32 },

    /// A required field is missing or not an integer.
    #[error("bad response telegram, missing required field {0}")]
    MalformedResponse(&'static str),

    /// The companion reported that it could not perform the command.
    #[error("companion failed command {cmd}: {message}")]
    CommandFailed { cmd: i32, message: String },

    /// Waiting for a response took too long.
    #[error("no response after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, ClientError>;
