//! Telegram framing for the interactive path analysis client.
//!
//! Every telegram on the wire is a fixed 13-byte header followed by a body:
//! - A 4-byte signature (`"IPA\0"`) for stream synchronization
//! - A 4-byte little-endian body length
//! - A 4-byte little-endian body checksum (sum of body bytes)
//! - A 1-byte compressor id (`0` none, `'z'` zlib)
//!
//! The [`TelegramReassembler`] turns an arbitrarily fragmented byte stream
//! back into checksum-verified frames.

pub mod buffer;
pub mod codec;
pub mod compress;
pub mod error;
pub mod header;
pub mod pretty;
pub mod reader;
pub mod reassembler;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use buffer::{checksum, ByteBuffer};
pub use codec::{encode_telegram, TelegramConfig, TelegramFrame, DEFAULT_MAX_BODY};
pub use compress::{compress, decode_body, decompress, NONE_COMPRESSOR_ID, ZLIB_COMPRESSOR_ID};
pub use error::{FrameError, Result};
pub use header::{TelegramHeader, HEADER_SIZE, SIGNATURE};
pub use reader::TelegramReader;
pub use reassembler::TelegramReassembler;
pub use writer::TelegramWriter;

#[cfg(feature = "async")]
pub use async_codec::TelegramCodec;
