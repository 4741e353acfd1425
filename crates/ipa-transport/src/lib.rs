//! Loopback TCP transport for talking to the companion analysis process.
//!
//! The companion listens on a port of the local host. Which loopback family
//! it bound to is not known in advance, so connections rotate through an
//! ordered list of candidate addresses (IPv6 first, then IPv4).
//!
//! This is the lowest layer of the client. Everything else builds on top of
//! the [`LoopbackStream`] type provided here.

pub mod address;
pub mod error;
pub mod stream;
pub mod tcp;

pub use address::{AddressRotator, DEFAULT_CANDIDATES};
pub use error::{Result, TransportError};
pub use stream::LoopbackStream;
pub use tcp::{LoopbackConnector, DEFAULT_CONNECT_TIMEOUT};
