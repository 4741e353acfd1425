use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use ipa_client::{ClientError, ClientEvent, GateIo};
use ipa_transport::TransportError;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod highlight;
pub mod paths;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request the critical path report.
    Paths(PathsArgs),
    /// Highlight path elements in the companion's view.
    Highlight(HighlightArgs),
    /// Stay connected and print every client event.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Paths(args) => paths::run(args, format),
        Command::Highlight(args) => highlight::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Companion listening port.
    #[arg(long, env = "IPA_PORT")]
    pub port: u16,
    /// Number of critical paths to report (at most 10000).
    #[arg(long, default_value = "100")]
    pub path_num: u32,
    /// Timing check to report.
    #[arg(long, default_value = "setup", value_parser = ["setup", "hold"])]
    pub path_type: String,
    /// Report detail level.
    #[arg(long, default_value = "netlist")]
    pub details_level: String,
    /// Report flat routing.
    #[arg(long)]
    pub flat: bool,
    /// Maximum time to wait for the report (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct HighlightArgs {
    /// Companion listening port.
    #[arg(long, env = "IPA_PORT")]
    pub port: u16,
    /// Path elements to highlight, or `none` to clear.
    #[arg(long)]
    pub items: String,
    /// Highlight mode.
    #[arg(long, default_value = "crit path flylines")]
    pub mode: String,
    /// Also draw the path contour.
    #[arg(long)]
    pub contour: bool,
    /// Maximum time to wait for the acknowledgement (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Companion listening port.
    #[arg(long, env = "IPA_PORT")]
    pub port: u16,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Option values are not escaped on the wire.
pub(crate) fn check_option_value(name: &str, value: &str) -> CliResult<()> {
    if value.contains([';', ':', '"']) {
        return Err(CliError::new(
            USAGE,
            format!("--{name} must not contain ';', ':' or '\"'"),
        ));
    }
    Ok(())
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Try every candidate address once before giving up.
pub(crate) fn connect_any(gate: &mut GateIo) -> Result<(), ClientError> {
    let attempts = gate.config().transport.candidates.len();
    let mut last = ClientError::Transport(TransportError::NoCandidates);
    for _ in 0..attempts {
        match gate.connect() {
            Ok(()) => return Ok(()),
            Err(err) => last = err,
        }
    }
    Err(last)
}

/// Drive the event loop until the outcome for `job_id` arrives.
///
/// Success events for the job are returned; a failed command becomes
/// [`ClientError::CommandFailed`]. Unrelated events are dropped.
pub(crate) fn wait_for_job(
    gate: &mut GateIo,
    events: &Receiver<ClientEvent>,
    job_id: u32,
    timeout: Duration,
) -> Result<ClientEvent, ClientError> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        gate.process_events();
        loop {
            match events.try_recv() {
                Ok(ClientEvent::CommandFailed {
                    job_id: id,
                    cmd,
                    message,
                }) if id == job_id => return Err(ClientError::CommandFailed { cmd, message }),
                Ok(event @ ClientEvent::PathListReceived { job_id: id, .. })
                | Ok(event @ ClientEvent::HighlightApplied { job_id: id })
                    if id == job_id =>
                {
                    return Ok(event)
                }
                Ok(_) => continue,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }
    Err(ClientError::Timeout(timeout))
}
