use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use ipa_transport::LoopbackStream;
use tracing::warn;

use crate::codec::{TelegramConfig, TelegramFrame};
use crate::error::{FrameError, Result};
use crate::reassembler::TelegramReassembler;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete, checksum-verified telegrams from any `Read` stream.
///
/// Handles partial reads and stream garbage internally; telegrams with a
/// bad checksum are logged and skipped.
pub struct TelegramReader<T> {
    inner: T,
    reassembler: TelegramReassembler,
    ready: VecDeque<TelegramFrame>,
    config: TelegramConfig,
}

impl<T: Read> TelegramReader<T> {
    /// Create a new telegram reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TelegramConfig::default())
    }

    /// Create a new telegram reader with explicit configuration.
    pub fn with_config(inner: T, config: TelegramConfig) -> Self {
        Self {
            inner,
            reassembler: TelegramReassembler::with_max_body(config.max_body_size),
            ready: VecDeque::new(),
            config,
        }
    }

    /// Read the next complete telegram (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<TelegramFrame> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let frames = self.reassembler.feed(&chunk[..read]);
            self.ready.extend(frames);
            for err in self.reassembler.take_errors() {
                warn!(error = %err, "skipping damaged telegram");
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current telegram reader configuration.
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }
}

impl TelegramReader<LoopbackStream> {
    /// Create a telegram reader for `LoopbackStream` and apply read timeout from config.
    pub fn with_config_stream(inner: LoopbackStream, config: TelegramConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: ipa_transport::TransportError) -> FrameError {
    match err {
        ipa_transport::TransportError::Io(io)
        | ipa_transport::TransportError::Connect { source: io, .. } => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
