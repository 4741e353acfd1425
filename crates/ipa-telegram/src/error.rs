/// Errors that can occur during telegram encoding, reassembly and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than a full header were supplied to the header parser.
    #[error("header needs {needed} bytes, got {got}")]
    ShortHeader { needed: usize, got: usize },

    /// The header does not start with the `"IPA\0"` signature.
    #[error("invalid telegram signature (expected \"IPA\\0\")")]
    InvalidSignature,

    /// The body exceeds the configured maximum size.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The received body does not sum to the checksum in its header.
    #[error("checksum mismatch for frame of size {body_len}")]
    ChecksumMismatch {
        body_len: u32,
        expected: u32,
        actual: u32,
    },

    /// The header names a compressor this client does not know.
    #[error("unknown compressor id {0:#04x}")]
    UnknownCompressor(u8),

    /// A compressed body could not be inflated.
    #[error("failed to decompress body: {0}")]
    Decompress(#[source] std::io::Error),

    /// An I/O error occurred while reading or writing telegrams.
    #[error("telegram I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete telegram was received.
    #[error("connection closed (incomplete telegram)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream the error came from can no longer be used.
    ///
    /// Size and encoding errors are raised before anything is written.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
