use bytes::{BufMut, Bytes, BytesMut};

use crate::compress::decode_body;
use crate::error::Result;
use crate::header::{TelegramHeader, HEADER_SIZE};

/// Default maximum body size: 256 MiB.
pub const DEFAULT_MAX_BODY: usize = 256 * 1024 * 1024;

/// A header together with its fully received, checksum-verified body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramFrame {
    pub header: TelegramHeader,
    pub body: Bytes,
}

impl TelegramFrame {
    /// Build an outbound frame, computing length and checksum from `body`.
    pub fn new(body: impl Into<Bytes>, compressor_id: u8) -> Result<Self> {
        let body = body.into();
        let header = TelegramHeader::from_body(&body, compressor_id)?;
        Ok(Self { header, body })
    }

    pub fn is_compressed(&self) -> bool {
        self.header.is_body_compressed()
    }

    /// The body with compression undone.
    pub fn decoded_body(&self) -> Result<Bytes> {
        decode_body(self.header.compressor_id(), &self.body)
    }

    /// The total wire size of this telegram (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

/// Encode one telegram (header followed by body) into `dst`.
///
/// Returns the header that was written.
pub fn encode_telegram(
    body: &[u8],
    compressor_id: u8,
    dst: &mut BytesMut,
) -> Result<TelegramHeader> {
    let header = TelegramHeader::from_body(body, compressor_id)?;
    dst.reserve(HEADER_SIZE + body.len());
    header.encode(dst);
    dst.put_slice(body);
    Ok(header)
}

/// Configuration for telegram reading and writing.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Maximum body size in bytes. Default: 256 MiB.
    pub max_body_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
