//! `tokio_util::codec` adapter over the telegram reassembler.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{encode_telegram, TelegramConfig, TelegramFrame};
use crate::error::FrameError;
use crate::reassembler::TelegramReassembler;

/// Decodes checksum-verified telegrams and encodes outbound frames.
///
/// Damaged telegrams are logged and skipped; they never end the stream.
#[derive(Debug)]
pub struct TelegramCodec {
    reassembler: TelegramReassembler,
    ready: VecDeque<TelegramFrame>,
    max_body_size: usize,
}

impl TelegramCodec {
    pub fn new() -> Self {
        Self::with_config(&TelegramConfig::default())
    }

    pub fn with_config(config: &TelegramConfig) -> Self {
        Self {
            reassembler: TelegramReassembler::with_max_body(config.max_body_size),
            ready: VecDeque::new(),
            max_body_size: config.max_body_size,
        }
    }
}

impl Default for TelegramCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TelegramCodec {
    type Item = TelegramFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let chunk = src.split();
            self.ready.extend(self.reassembler.feed(&chunk));
            for err in self.reassembler.take_errors() {
                warn!(error = %err, "skipping damaged telegram");
            }
        }
        Ok(self.ready.pop_front())
    }
}

impl Encoder<TelegramFrame> for TelegramCodec {
    type Error = FrameError;

    fn encode(&mut self, item: TelegramFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body.len() > self.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: item.body.len(),
                max: self.max_body_size,
            });
        }
        encode_telegram(&item.body, item.header.compressor_id(), dst)?;
        Ok(())
    }
}
