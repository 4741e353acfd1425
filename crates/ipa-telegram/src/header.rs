use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::buffer::checksum;
use crate::error::{FrameError, Result};
use crate::pretty::pretty_size;

/// Signature opening every telegram: `"IPA"` plus its terminating NUL.
pub const SIGNATURE: [u8; 4] = *b"IPA\0";

pub const SIGNATURE_SIZE: usize = SIGNATURE.len();
pub const LENGTH_SIZE: usize = 4;
pub const CHECKSUM_SIZE: usize = 4;
pub const COMPRESSOR_ID_SIZE: usize = 1;

pub const LENGTH_OFFSET: usize = SIGNATURE_SIZE;
pub const CHECKSUM_OFFSET: usize = LENGTH_OFFSET + LENGTH_SIZE;
pub const COMPRESSOR_ID_OFFSET: usize = CHECKSUM_OFFSET + CHECKSUM_SIZE;

/// Telegram header: signature (4) + length (4) + checksum (4) + compressor (1) = 13 bytes.
pub const HEADER_SIZE: usize = SIGNATURE_SIZE + LENGTH_SIZE + CHECKSUM_SIZE + COMPRESSOR_ID_SIZE;

/// Fixed-size framing header.
///
/// Wire format:
/// ```text
/// ┌───────────────┬────────────┬────────────┬────────────┬─────────────────┐
/// │ Signature (4B)│ Length     │ Checksum   │ Compressor │ Body            │
/// │ "IPA\0"       │ (4B LE)    │ (4B LE)    │ (1B)       │ (Length bytes)  │
/// └───────────────┴────────────┴────────────┴────────────┴─────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramHeader {
    valid: bool,
    body_len: u32,
    body_checksum: u32,
    compressor_id: u8,
}

impl TelegramHeader {
    /// Create a header for an outbound body with known length and checksum.
    pub fn new(body_len: u32, body_checksum: u32, compressor_id: u8) -> Self {
        Self {
            valid: true,
            body_len,
            body_checksum,
            compressor_id,
        }
    }

    /// Compute the header describing `body`.
    ///
    /// Fails only if the body length does not fit the 4-byte length field.
    pub fn from_body(body: &[u8], compressor_id: u8) -> Result<Self> {
        let body_len = u32::try_from(body.len()).map_err(|_| FrameError::BodyTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        })?;
        Ok(Self::new(body_len, checksum(body), compressor_id))
    }

    /// Read a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// The fields are always decoded; [`TelegramHeader::is_valid`] reports
    /// whether the signature matched. `bytes` is not consumed.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::ShortHeader {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let valid = bytes[..SIGNATURE_SIZE] == SIGNATURE;
        let body_len = read_u32_le(bytes, LENGTH_OFFSET);
        let body_checksum = read_u32_le(bytes, CHECKSUM_OFFSET);
        let compressor_id = bytes[COMPRESSOR_ID_OFFSET];

        Ok(Self {
            valid,
            body_len,
            body_checksum,
            compressor_id,
        })
    }

    /// Append the 13 header bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_slice(&SIGNATURE);
        dst.put_u32_le(self.body_len);
        dst.put_u32_le(self.body_checksum);
        dst.put_u8(self.compressor_id);
    }

    /// The serialized header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..SIGNATURE_SIZE].copy_from_slice(&SIGNATURE);
        out[LENGTH_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&self.body_len.to_le_bytes());
        out[CHECKSUM_OFFSET..COMPRESSOR_ID_OFFSET]
            .copy_from_slice(&self.body_checksum.to_le_bytes());
        out[COMPRESSOR_ID_OFFSET] = self.compressor_id;
        out
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn body_len(&self) -> u32 {
        self.body_len
    }

    pub fn body_checksum(&self) -> u32 {
        self.body_checksum
    }

    pub fn compressor_id(&self) -> u8 {
        self.compressor_id
    }

    pub fn is_body_compressed(&self) -> bool {
        self.compressor_id != 0
    }

    /// Header plus body size on the wire.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body_len as usize
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

impl fmt::Display for TelegramHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "header{}[l={}/s={}",
            if self.valid { "" } else { "(INVALID)" },
            pretty_size(u64::from(self.body_len)),
            self.body_checksum
        )?;
        if self.compressor_id != 0 {
            write!(f, "/c={}", char::from(self.compressor_id))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_thirteen() {
        assert_eq!(HEADER_SIZE, 13);
        assert_eq!(COMPRESSOR_ID_OFFSET, 12);
    }

    #[test]
    fn from_body_computes_length_and_checksum() {
        let header = TelegramHeader::from_body(b"some message", 0).unwrap();
        assert!(header.is_valid());
        assert_eq!(header.body_len(), 12);
        assert_eq!(header.body_checksum(), checksum(b"some message"));
        assert!(!header.is_body_compressed());
        assert_eq!(header.wire_size(), HEADER_SIZE + 12);
    }

    #[test]
    fn parse_restores_serialized_fields() {
        for compressor_id in [0u8, b'z'] {
            let header = TelegramHeader::from_body(b"{\"CMD\":\"0\"}", compressor_id).unwrap();
            let parsed = TelegramHeader::parse(&header.to_bytes()).unwrap();
            assert_eq!(parsed, header);
        }
    }

    #[test]
    fn encode_matches_to_bytes() {
        let header = TelegramHeader::new(0x0102_0304, 0xAABB_CCDD, b'z');
        let mut dst = BytesMut::new();
        header.encode(&mut dst);

        assert_eq!(dst.as_ref(), header.to_bytes().as_slice());
        assert_eq!(&dst[..4], b"IPA\0");
        assert_eq!(&dst[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(dst[12], b'z');
    }

    #[test]
    fn parse_flags_bad_signature() {
        let mut raw = TelegramHeader::new(4, 10, 0).to_bytes();
        raw[0] = b'X';
        let parsed = TelegramHeader::parse(&raw).unwrap();
        assert!(!parsed.is_valid());
        assert_eq!(parsed.body_len(), 4);
    }

    #[test]
    fn parse_rejects_short_input() {
        let err = TelegramHeader::parse(b"IPA\0\x01").unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortHeader {
                needed: HEADER_SIZE,
                got: 5
            }
        ));
    }

    #[test]
    fn display_renders_info_line() {
        let plain = TelegramHeader::new(12, 99, 0);
        assert_eq!(plain.to_string(), "header[l=12bytes/s=99]");

        let compressed = TelegramHeader::new(2048, 7, b'z');
        assert_eq!(compressed.to_string(), "header[l=2.00Kb/s=7/c=z]");

        let mut raw = plain.to_bytes();
        raw[1] = 0;
        let invalid = TelegramHeader::parse(&raw).unwrap();
        assert!(invalid.to_string().starts_with("header(INVALID)["));
    }
}
