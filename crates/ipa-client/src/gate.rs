use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use bytes::Bytes;
use ipa_telegram::pretty::{pretty_duration_ms, pretty_size};
use ipa_telegram::TelegramFrame;
use tracing::{debug, error, info, warn};

use crate::companion::CompanionStatus;
use crate::error::{ClientError, Result};
use crate::jobs::{JobStats, JobTracker};
use crate::params::{HighlightParams, PathListParams};
use crate::protocol::{Command, SELECTION_NONE};
use crate::request::{OutboundRequest, RequestBuilder};
use crate::response::Response;
use crate::socket::{Transport, TransportConfig, TransportEvent};

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub transport: TransportConfig,
    /// How often the statistics line is considered for logging.
    pub stats_interval: Duration,
    pub path_list: PathListParams,
    pub highlight: HighlightParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            stats_interval: Duration::from_secs(10),
            path_list: PathListParams::default(),
            highlight: HighlightParams::default(),
        }
    }
}

/// Notifications delivered to the caller, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    ConnectionChanged(bool),
    RequestSent {
        job_id: u32,
        command: Command,
    },
    /// Every checksum-verified telegram, body already inflated.
    FrameReceived {
        body: Bytes,
        was_compressed: bool,
    },
    PathListReceived {
        job_id: u32,
        data: String,
    },
    HighlightApplied {
        job_id: u32,
    },
    /// The companion answered with a false `STATUS`.
    CommandFailed {
        job_id: u32,
        cmd: i32,
        message: String,
    },
}

/// Client façade over the companion protocol.
///
/// Owns the transport, the request builder and the job tracker. Nothing
/// here is shared with other threads except [`CompanionStatus`]; drive it
/// with [`GateIo::process_events`] or [`GateIo::run`] from one thread.
pub struct GateIo {
    config: ClientConfig,
    transport: Transport,
    builder: RequestBuilder,
    jobs: JobTracker,
    last_path_items: String,
    events: Sender<ClientEvent>,
    next_stats_at: Instant,
}

impl GateIo {
    /// Create the façade and the receiving end of its event channel.
    pub fn new(config: ClientConfig, companion: CompanionStatus) -> (Self, Receiver<ClientEvent>) {
        let (events, receiver) = mpsc::channel();
        let gate = Self {
            transport: Transport::new(config.transport.clone(), companion),
            builder: RequestBuilder::new(),
            jobs: JobTracker::new(),
            last_path_items: SELECTION_NONE.to_string(),
            next_stats_at: Instant::now() + config.stats_interval,
            events,
            config,
        };
        (gate, receiver)
    }

    /// Port published by the companion.
    pub fn set_port(&self, port: u16) {
        self.transport.companion().set_port(port);
    }

    pub fn set_server_running(&self, running: bool) {
        self.transport.companion().set_running(running);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_path_list_params(&mut self, params: PathListParams) {
        self.config.path_list = params;
    }

    pub fn last_path_items(&self) -> &str {
        &self.last_path_items
    }

    /// Make one connection attempt now instead of waiting for the watcher.
    pub fn connect(&mut self) -> Result<()> {
        let connected = self.transport.connect();
        self.forward_transport_events();
        connected
    }

    /// Ask for the critical path report. Returns the job id.
    pub fn request_path_list(&mut self, initiator: &str) -> Result<u32> {
        let request = self.builder.path_list_request(&self.config.path_list);
        self.send_request(request, initiator)
    }

    /// Ask the companion to highlight `path_items`. Returns the job id.
    pub fn request_path_items_highlight(
        &mut self,
        path_items: &str,
        initiator: &str,
    ) -> Result<u32> {
        self.last_path_items = path_items.to_string();
        let request = self
            .builder
            .draw_path_request(path_items, &self.config.highlight);
        self.send_request(request, initiator)
    }

    /// Apply new highlight settings and re-send the last selection with them.
    ///
    /// The remembered selection starts as `none`, which is re-sent too so the
    /// companion redraws with the new mode. Returns `None` only for an empty
    /// selection.
    pub fn on_highlight_mode_changed(&mut self, params: HighlightParams) -> Option<Result<u32>> {
        self.config.highlight = params;
        if self.last_path_items.is_empty() {
            return None;
        }
        let items = self.last_path_items.clone();
        Some(self.request_path_items_highlight(&items, "highlight mode changed"))
    }

    /// Run one serialized tick of the event loop.
    pub fn process_events(&mut self) {
        let now = Instant::now();
        self.transport.poll(now);
        self.forward_transport_events();

        if now >= self.next_stats_at {
            if let Some(line) = self.jobs.report(true) {
                info!("{line}");
            }
            self.next_stats_at = now + self.config.stats_interval;
        }
    }

    /// Tick until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            self.process_events();
        }
    }

    /// Drop every outstanding job without waiting for its response.
    ///
    /// A late response for a dropped job counts as broken. Returns how many
    /// jobs were dropped.
    pub fn clear_pending(&mut self) -> usize {
        let abandoned = self.jobs.abandon_pending();
        if abandoned > 0 {
            debug!(abandoned, "pending jobs cleared");
        }
        abandoned
    }

    pub fn stats(&self) -> JobStats {
        self.jobs.stats()
    }

    /// Whether a response for `job_id` is still outstanding.
    pub fn is_pending(&self, job_id: u32) -> bool {
        self.jobs.is_pending(job_id)
    }

    fn send_request(&mut self, request: OutboundRequest, initiator: &str) -> Result<u32> {
        let OutboundRequest {
            job_id,
            command,
            body,
            compressor_id,
        } = request;
        debug!(job_id, cmd = command.name(), initiator, "sending request");

        let sent = self.transport.send(&body, compressor_id);
        // A connect made for this write abandons older jobs before the new
        // one is tracked.
        self.forward_transport_events();

        match sent {
            Ok(header) => {
                self.jobs.track_request(job_id, header.wire_size() as u64);
                self.emit(ClientEvent::RequestSent { job_id, command });
                Ok(job_id)
            }
            Err(err) => {
                error!(job_id, error = %err, "failed to send request");
                Err(ClientError::SendFailed { job_id })
            }
        }
    }

    fn forward_transport_events(&mut self) {
        for event in self.transport.take_events() {
            match event {
                TransportEvent::ConnectionChanged(connected) => {
                    if connected {
                        let abandoned = self.jobs.abandon_pending();
                        if abandoned > 0 {
                            debug!(abandoned, "dropping jobs pending from previous connection");
                        }
                    }
                    self.emit(ClientEvent::ConnectionChanged(connected));
                }
                TransportEvent::FrameReceived(frame) => self.handle_frame(frame),
            }
        }
    }

    fn handle_frame(&mut self, frame: TelegramFrame) {
        let response_size = frame.wire_size() as u64;
        let was_compressed = frame.is_compressed();
        let body = match frame.decoded_body() {
            Ok(body) => body,
            Err(err) => {
                warn!(header = %frame.header, error = %err, "cannot decode telegram body");
                self.jobs.track_response_broken();
                return;
            }
        };
        debug!(
            header = %frame.header,
            decoded = body.len(),
            "response telegram"
        );
        self.emit(ClientEvent::FrameReceived {
            body: body.clone(),
            was_compressed,
        });

        let text = String::from_utf8_lossy(&body);
        let response = match Response::parse(&text) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "dropping inconsistent response");
                self.jobs.track_response_broken();
                return;
            }
        };

        match self
            .jobs
            .track_finish(response.job_id, response.status, response_size)
        {
            Some(m) => debug!(
                job_id = response.job_id,
                size = %pretty_size(m.total_size),
                duration = %pretty_duration_ms(m.duration_ms),
                "job finished"
            ),
            None => {
                warn!(
                    job_id = response.job_id,
                    "response for unknown job, discarding"
                );
                return;
            }
        }

        self.dispatch(response);
    }

    fn dispatch(&mut self, response: Response) {
        let Response {
            job_id,
            cmd,
            status,
            data,
        } = response;

        if !status {
            error!(job_id, cmd, message = %data, "companion failed to perform command");
            self.emit(ClientEvent::CommandFailed {
                job_id,
                cmd,
                message: data,
            });
            return;
        }

        match Command::from_id(cmd) {
            Some(Command::GetPathList) => self.emit(ClientEvent::PathListReceived { job_id, data }),
            Some(Command::DrawPath) => self.emit(ClientEvent::HighlightApplied { job_id }),
            None => warn!(job_id, cmd, "response for unsupported command"),
        }
    }

    fn emit(&self, event: ClientEvent) {
        // The caller may have dropped the receiver; events are then discarded.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for GateIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateIo")
            .field("transport", &self.transport)
            .field("pending", &self.jobs.pending_count())
            .field("last_path_items", &self.last_path_items)
            .finish()
    }
}
