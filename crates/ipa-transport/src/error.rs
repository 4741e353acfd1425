use std::net::SocketAddr;

/// Errors that can occur in loopback transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The companion has not published its listening port yet.
    #[error("companion port is not known yet")]
    PortUnknown,

    /// No candidate address is configured.
    #[error("no candidate addresses configured")]
    NoCandidates,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
