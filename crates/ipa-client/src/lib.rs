//! Client side of the interactive path analysis telegram protocol.
//!
//! This is the "just works" layer. It keeps one reconnecting connection to
//! the companion process, turns caller intents into request telegrams,
//! correlates responses by job id, and reports results as [`ClientEvent`]s.
//!
//! All protocol state is owned by a single [`GateIo`] and mutated only from
//! the thread that drives its event loop.

pub mod companion;
pub mod error;
pub mod gate;
pub mod jobs;
pub mod params;
pub mod protocol;
pub mod request;
pub mod response;
pub mod socket;

pub use companion::CompanionStatus;
pub use error::{ClientError, Result};
pub use gate::{ClientConfig, ClientEvent, GateIo};
pub use jobs::{JobMeasurement, JobStats, JobTracker};
pub use params::{HighlightParams, PathListParams};
pub use protocol::Command;
pub use request::{
    build_options_string, OptionKind, OutboundRequest, RequestBuilder, RequestOption,
};
pub use response::{Response, ResponseFields};
pub use socket::{Transport, TransportConfig, TransportEvent};
