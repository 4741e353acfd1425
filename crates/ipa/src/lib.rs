//! Client for the interactive path analysis companion process.
//!
//! The companion analysis engine listens on a loopback TCP port and answers
//! framed request telegrams. This crate ties the layers together:
//!
//! - [`transport`]: loopback TCP connections with address rotation
//! - [`telegram`]: telegram framing, reassembly and body compression
//! - [`client`]: request building, response correlation and the [`client::GateIo`] façade
//!
//! With the `cli` feature the `ipa` binary drives the client from a terminal.

/// Re-export transport types.
pub mod transport {
    pub use ipa_transport::*;
}

/// Re-export telegram types.
pub mod telegram {
    pub use ipa_telegram::*;
}

/// Re-export client types.
pub mod client {
    pub use ipa_client::*;
}
