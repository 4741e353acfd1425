//! Stream reassembly.
//!
//! Bytes arrive in arbitrary chunks. The reassembler accumulates them and
//! runs a two-state machine over the accumulation buffer:
//! - `SeekingHeader`: scan for the signature, drop anything before it, and
//!   parse the header once 13 bytes are available
//! - `AwaitingBody`: wait until the whole body is buffered, verify its
//!   checksum, emit or drop it, then go back to seeking
//!
//! Bytes preceding a signature are discarded for good. A telegram whose
//! checksum does not match is dropped and reported; reassembly continues
//! with the bytes that follow it.

use tracing::{debug, trace, warn};

use crate::buffer::{checksum, ByteBuffer};
use crate::codec::{TelegramFrame, DEFAULT_MAX_BODY};
use crate::error::FrameError;
use crate::header::{TelegramHeader, HEADER_SIZE, SIGNATURE, SIGNATURE_SIZE};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

#[derive(Debug, Clone, Copy)]
enum State {
    SeekingHeader,
    AwaitingBody(TelegramHeader),
}

/// Converts a raw byte stream into checksum-verified telegram frames.
#[derive(Debug)]
pub struct TelegramReassembler {
    buf: ByteBuffer,
    state: State,
    /// Offset where the next signature search starts; bytes before it are
    /// known not to begin a usable header.
    scan_from: usize,
    max_body_size: usize,
    errors: Vec<FrameError>,
    discarded: u64,
}

impl TelegramReassembler {
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY)
    }

    /// Create a reassembler that rejects headers announcing bodies larger
    /// than `max_body_size`.
    pub fn with_max_body(max_body_size: usize) -> Self {
        Self {
            buf: ByteBuffer::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: State::SeekingHeader,
            scan_from: 0,
            max_body_size,
            errors: Vec::new(),
            discarded: 0,
        }
    }

    /// Add received bytes to the accumulation buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `bytes` and drain every frame completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TelegramFrame> {
        self.append(bytes);
        self.drain()
    }

    /// Extract every complete telegram currently buffered, in arrival order.
    ///
    /// Checksum failures are collected and available from
    /// [`TelegramReassembler::take_errors`].
    pub fn drain(&mut self) -> Vec<TelegramFrame> {
        let mut frames = Vec::new();
        loop {
            match self.state {
                State::SeekingHeader => {
                    if !self.seek_header() {
                        break;
                    }
                }
                State::AwaitingBody(header) => {
                    if self.buf.len() < header.wire_size() {
                        break;
                    }
                    self.buf.consume(HEADER_SIZE);
                    let body = self.buf.split_to(header.body_len() as usize);
                    self.state = State::SeekingHeader;

                    let actual = checksum(&body);
                    if actual == header.body_checksum() {
                        trace!(%header, "telegram complete");
                        frames.push(TelegramFrame { header, body });
                    } else {
                        warn!(
                            %header,
                            actual,
                            "dropping telegram with mismatched checksum"
                        );
                        self.errors.push(FrameError::ChecksumMismatch {
                            body_len: header.body_len(),
                            expected: header.body_checksum(),
                            actual,
                        });
                    }
                }
            }
        }
        frames
    }

    /// Take the errors reported since the last call.
    pub fn take_errors(&mut self) -> Vec<FrameError> {
        std::mem::take(&mut self.errors)
    }

    /// Drop all buffered bytes and any partially received telegram.
    pub fn clear(&mut self) {
        if !self.buf.is_empty() {
            debug!(bytes = self.buf.len(), "clearing reassembly buffer");
        }
        self.buf.clear();
        self.state = State::SeekingHeader;
        self.scan_from = 0;
    }

    /// Bytes buffered but not yet delivered.
    pub fn buffered(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether a header has been parsed and its body is still incomplete.
    pub fn is_awaiting_body(&self) -> bool {
        matches!(self.state, State::AwaitingBody(_))
    }

    /// Total bytes thrown away while searching for a signature.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Locate and parse the next header. Returns `true` once the state has
    /// moved to `AwaitingBody`.
    fn seek_header(&mut self) -> bool {
        loop {
            let Some(pos) = self.buf.find_sequence_from(&SIGNATURE, self.scan_from) else {
                // A signature may straddle the end of the buffer.
                self.scan_from = self.buf.len().saturating_sub(SIGNATURE_SIZE - 1);
                return false;
            };

            if pos > 0 {
                debug!(bytes = pos, "discarding bytes before telegram signature");
                self.discarded += pos as u64;
                self.buf.consume(pos);
            }
            self.scan_from = 0;

            if self.buf.len() < HEADER_SIZE {
                return false;
            }
            let Ok(header) = TelegramHeader::parse(&self.buf) else {
                return false;
            };

            if !header.is_valid() {
                self.scan_from = 1;
                continue;
            }
            if header.body_len() as usize > self.max_body_size {
                warn!(%header, max = self.max_body_size, "skipping header with oversized body");
                self.errors.push(FrameError::BodyTooLarge {
                    size: header.body_len() as usize,
                    max: self.max_body_size,
                });
                self.scan_from = 1;
                continue;
            }

            self.state = State::AwaitingBody(header);
            return true;
        }
    }
}

impl Default for TelegramReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_telegram;

    fn telegram(body: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_telegram(body, 0, &mut wire).unwrap();
        wire.to_vec()
    }

    #[test]
    fn single_telegram_in_one_chunk() {
        let mut reassembler = TelegramReassembler::new();
        let frames = reassembler.feed(&telegram(b"some message"));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"some message");
        assert!(reassembler.is_empty());
        assert!(reassembler.take_errors().is_empty());
    }

    #[test]
    fn any_two_chunk_split_yields_one_frame() {
        let wire = telegram(b"{\"JOB_ID\":\"3\",\"CMD\":\"1\",\"STATUS\":\"1\"}");
        for split in 1..wire.len() {
            let mut reassembler = TelegramReassembler::new();
            let mut frames = reassembler.feed(&wire[..split]);
            frames.extend(reassembler.feed(&wire[split..]));

            assert_eq!(frames.len(), 1, "split at {split}");
            assert_eq!(&frames[0].body[..], &wire[HEADER_SIZE..]);
            assert!(reassembler.is_empty());
        }
    }

    #[test]
    fn byte_by_byte_delivery() {
        let wire = telegram(b"slow");
        let mut reassembler = TelegramReassembler::new();
        let mut frames = Vec::new();
        for byte in &wire {
            frames.extend(reassembler.feed(std::slice::from_ref(byte)));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"slow");
    }

    #[test]
    fn uneven_chunks_across_several_telegrams() {
        let mut wire = telegram(b"first");
        wire.extend(telegram(b""));
        wire.extend(telegram(b"third telegram body"));

        let mut reassembler = TelegramReassembler::new();
        let mut frames = Vec::new();
        for chunk in wire.chunks(5) {
            frames.extend(reassembler.feed(chunk));
        }

        let bodies: Vec<&[u8]> = frames.iter().map(|f| f.body.as_ref()).collect();
        assert_eq!(bodies, vec![&b"first"[..], b"", b"third telegram body"]);
    }

    #[test]
    fn garbage_prefix_is_discarded() {
        let mut input = b"#@!".to_vec();
        input.extend(telegram(b"message"));

        let mut reassembler = TelegramReassembler::new();
        let frames = reassembler.feed(&input);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"message");
        assert_eq!(reassembler.discarded_bytes(), 3);
    }

    #[test]
    fn garbage_before_incomplete_telegram_is_dropped_early() {
        let header = TelegramHeader::from_body(b"some message", 0).unwrap();
        let mut reassembler = TelegramReassembler::new();
        reassembler.append(b"#@!");
        reassembler.append(&header.to_bytes());

        assert!(reassembler.drain().is_empty());
        assert_eq!(reassembler.buffered(), header.to_bytes().as_slice());
        assert!(reassembler.is_awaiting_body());
    }

    #[test]
    fn signature_split_across_chunks() {
        let wire = telegram(b"payload");
        let mut reassembler = TelegramReassembler::new();

        let mut first = b"noise".to_vec();
        first.extend_from_slice(&wire[..2]);
        assert!(reassembler.feed(&first).is_empty());

        let frames = reassembler.feed(&wire[2..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"payload");
    }

    #[test]
    fn one_finished_one_opened() {
        let t1 = telegram(b"message1");
        let mut t2 = telegram(b"message2");
        t2.truncate(t2.len() - 2);

        let mut reassembler = TelegramReassembler::new();
        reassembler.append(&t1);
        reassembler.append(&t2);
        let frames = reassembler.drain();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"message1");
        assert_eq!(reassembler.buffered(), t2.as_slice());
    }

    #[test]
    fn two_telegrams_in_one_chunk() {
        let mut wire = telegram(b"message1");
        wire.extend(telegram(b"message2"));

        let mut reassembler = TelegramReassembler::new();
        let frames = reassembler.feed(&wire);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].body.as_ref(), b"message1");
        assert_eq!(frames[1].body.as_ref(), b"message2");
        assert!(reassembler.buffered().is_empty());
    }

    #[test]
    fn corrupted_body_is_reported_and_skipped() {
        let mut corrupted = telegram(b"message1");
        corrupted[HEADER_SIZE + 2] ^= 0x20;
        let mut wire = corrupted;
        wire.extend(telegram(b"message2"));

        let mut reassembler = TelegramReassembler::new();
        let frames = reassembler.feed(&wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"message2");

        let errors = reassembler.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            FrameError::ChecksumMismatch { body_len: 8, .. }
        ));
        assert_eq!(
            errors[0].to_string(),
            "checksum mismatch for frame of size 8"
        );
        assert!(reassembler.take_errors().is_empty());
    }

    #[test]
    fn oversized_header_is_skipped() {
        let bogus = TelegramHeader::new(1024, 0, 0).to_bytes();
        let mut wire = bogus.to_vec();
        wire.extend(telegram(b"ok"));

        let mut reassembler = TelegramReassembler::with_max_body(64);
        let frames = reassembler.feed(&wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"ok");
        let errors = reassembler.take_errors();
        assert!(matches!(
            errors.as_slice(),
            [FrameError::BodyTooLarge {
                size: 1024,
                max: 64
            }]
        ));
    }

    #[test]
    fn unmatched_bytes_are_kept_until_a_signature_arrives() {
        let mut reassembler = TelegramReassembler::new();
        assert!(reassembler.feed(b"no signature here").is_empty());
        assert_eq!(reassembler.buffered(), b"no signature here");

        let frames = reassembler.feed(&telegram(b"late"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"late");
        assert!(reassembler.is_empty());
    }

    #[test]
    fn clear_discards_partial_telegram() {
        let wire = telegram(b"interrupted");
        let mut reassembler = TelegramReassembler::new();
        assert!(reassembler.feed(&wire[..HEADER_SIZE + 3]).is_empty());
        assert!(reassembler.is_awaiting_body());

        reassembler.clear();
        assert!(reassembler.is_empty());
        assert!(!reassembler.is_awaiting_body());

        // The tail of the interrupted telegram is garbage now.
        let mut resumed = wire[HEADER_SIZE + 3..].to_vec();
        resumed.extend(telegram(b"fresh"));
        let frames = reassembler.feed(&resumed);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"fresh");
    }
}
