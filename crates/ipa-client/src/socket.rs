//! Reconnecting loopback transport.
//!
//! [`Transport`] owns at most one connection to the companion. Inbound bytes
//! are read with a short timeout on every [`Transport::poll`] and fed to the
//! reassembler; completed frames and connection changes queue up as
//! [`TransportEvent`]s for the owner to drain.

use std::io::{ErrorKind, Read};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use ipa_telegram::{
    TelegramConfig, TelegramFrame, TelegramHeader, TelegramReassembler, TelegramWriter,
};
use ipa_transport::{
    AddressRotator, LoopbackConnector, LoopbackStream, TransportError, DEFAULT_CANDIDATES,
    DEFAULT_CONNECT_TIMEOUT,
};
use tracing::{debug, error, info, warn};

use crate::companion::CompanionStatus;
use crate::error::Result;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Connection and polling settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Loopback addresses tried in order, rotating on failure.
    pub candidates: Vec<IpAddr>,
    pub connect_timeout: Duration,
    /// Period of reconnect attempts while disconnected.
    pub watcher_interval: Duration,
    /// How long one poll waits for inbound bytes.
    pub poll_timeout: Duration,
    pub write_timeout: Duration,
    pub telegram: TelegramConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.to_vec(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            watcher_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(20),
            write_timeout: Duration::from_secs(30),
            telegram: TelegramConfig::default(),
        }
    }
}

/// Something the owner of a [`Transport`] has to react to.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    ConnectionChanged(bool),
    /// A checksum-verified telegram, body still as sent.
    FrameReceived(TelegramFrame),
}

/// Periodic reconnect timer.
#[derive(Debug)]
struct ConnectionWatcher {
    interval: Duration,
    next_tick: Option<Instant>,
}

impl ConnectionWatcher {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
        }
    }

    /// Start ticking; the first tick is due immediately.
    fn start(&mut self, now: Instant) {
        if self.next_tick.is_none() {
            debug!(interval = ?self.interval, "connection watcher started");
            self.next_tick = Some(now);
        }
    }

    fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!("connection watcher stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Whether a tick is due at `now`; a due tick schedules the next one.
    fn tick(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(due) if now >= due => {
                self.next_tick = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

struct Connection {
    reader: LoopbackStream,
    writer: TelegramWriter<LoopbackStream>,
}

/// Single reconnecting connection to the companion process.
pub struct Transport {
    config: TransportConfig,
    connector: LoopbackConnector,
    companion: CompanionStatus,
    connection: Option<Connection>,
    reassembler: TelegramReassembler,
    watcher: ConnectionWatcher,
    events: Vec<TransportEvent>,
    read_buf: Vec<u8>,
}

impl Transport {
    pub fn new(config: TransportConfig, companion: CompanionStatus) -> Self {
        let connector = LoopbackConnector::with_rotator(
            AddressRotator::with_candidates(config.candidates.clone()),
            config.connect_timeout,
        );
        Self {
            reassembler: TelegramReassembler::with_max_body(config.telegram.max_body_size),
            watcher: ConnectionWatcher::new(config.watcher_interval),
            connector,
            companion,
            connection: None,
            events: Vec::new(),
            read_buf: vec![0u8; READ_CHUNK_SIZE],
            config,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn companion(&self) -> &CompanionStatus {
        &self.companion
    }

    /// The address the next connection attempt will use.
    pub fn current_candidate(&self) -> Option<IpAddr> {
        self.connector.current()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_active()
    }

    /// Make one connection attempt to the published port.
    ///
    /// Does nothing when already connected. A failed attempt rotates to the
    /// next candidate address.
    pub fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let port = self.companion.port().ok_or(TransportError::PortUnknown)?;
        let stream = self.connector.connect(port)?;
        stream.set_nodelay(true)?;

        let reader = stream.try_clone()?;
        reader.set_read_timeout(Some(self.config.poll_timeout))?;
        let writer_config = TelegramConfig {
            write_timeout: Some(self.config.write_timeout),
            ..self.config.telegram.clone()
        };
        let writer = TelegramWriter::with_config_stream(stream, writer_config)?;

        self.reassembler.clear();
        self.connection = Some(Connection { reader, writer });
        self.watcher.stop();
        self.events.push(TransportEvent::ConnectionChanged(true));
        Ok(())
    }

    /// Connect unless already connected.
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            self.connect()
        }
    }

    /// Send one telegram, connecting first if needed.
    ///
    /// A failed write drops the connection; a telegram rejected before any
    /// byte went out leaves it open. Nothing is queued or retried.
    pub fn send(&mut self, body: &[u8], compressor_id: u8) -> Result<TelegramHeader> {
        self.ensure_connected()?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(TransportError::PortUnknown.into());
        };
        match connection.writer.send(body, compressor_id) {
            Ok(header) => {
                debug!(%header, "telegram sent");
                Ok(header)
            }
            Err(err) if err.is_connection_error() => {
                error!(error = %err, "failed to write telegram");
                self.disconnect("write failed");
                Err(err.into())
            }
            Err(err) => {
                error!(error = %err, "telegram rejected before writing");
                Err(err.into())
            }
        }
    }

    /// Send an uncompressed body; `false` on any failure.
    pub fn write(&mut self, body: &[u8]) -> bool {
        self.send(body, ipa_telegram::NONE_COMPRESSOR_ID).is_ok()
    }

    /// Run one transport tick: watcher bookkeeping, a reconnect attempt if
    /// one is due, then one bounded read.
    ///
    /// Without a connection the tick idles for the poll timeout instead of
    /// reading.
    pub fn poll(&mut self, now: Instant) {
        self.sync_watcher(now);
        if self.watcher.tick(now) {
            if let Err(err) = self.connect() {
                debug!(error = %err, "reconnect attempt failed");
            }
        }

        if self.connection.is_some() {
            self.read_once();
        } else {
            std::thread::sleep(self.config.poll_timeout);
        }
    }

    /// Drain queued events in arrival order.
    pub fn take_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.events)
    }

    /// Close the connection, discarding any partially received telegram.
    pub fn disconnect(&mut self, reason: &str) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let _ = connection.reader.shutdown();
        self.reassembler.clear();
        info!(reason, "disconnected from companion");
        self.events.push(TransportEvent::ConnectionChanged(false));
    }

    fn sync_watcher(&mut self, now: Instant) {
        if self.connection.is_some() || !self.companion.is_running() {
            self.watcher.stop();
        } else {
            self.watcher.start(now);
        }
    }

    fn read_once(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let read = loop {
            match connection.reader.read(&mut self.read_buf) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match read {
            Ok(0) => self.disconnect("connection closed by companion"),
            Ok(n) => {
                let frames = self.reassembler.feed(&self.read_buf[..n]);
                for err in self.reassembler.take_errors() {
                    warn!(error = %err, "dropping damaged telegram");
                }
                for frame in frames {
                    debug!(header = %frame.header, "telegram received");
                    self.events.push(TransportEvent::FrameReceived(frame));
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(err) => {
                warn!(error = %err, "socket error");
                self.disconnect("socket error");
            }
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .field("port", &self.companion.port())
            .field("watching", &self.watcher.is_active())
            .field("buffered", &self.reassembler.buffered().len())
            .finish()
    }
}
