//! Body compression.
//!
//! Only one algorithm is defined: zlib-wrapped DEFLATE, tagged `'z'`.
//! The companion compresses large responses; requests are never compressed.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{FrameError, Result};

/// Compressor id for an uncompressed body.
pub const NONE_COMPRESSOR_ID: u8 = 0;

/// Compressor id for a zlib (DEFLATE) compressed body.
pub const ZLIB_COMPRESSOR_ID: u8 = b'z';

/// Compress `body` with zlib at best compression.
pub fn compress(body: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len() / 2), Compression::best());
    encoder.write_all(body)?;
    encoder.finish().map_err(FrameError::Io)
}

/// Inflate a zlib-compressed body.
pub fn decompress(body: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(body);
    let mut out = Vec::with_capacity(body.len().saturating_mul(4));
    decoder
        .read_to_end(&mut out)
        .map_err(FrameError::Decompress)?;
    Ok(out)
}

/// Undo the compression named by `compressor_id`.
pub fn decode_body(compressor_id: u8, body: &Bytes) -> Result<Bytes> {
    match compressor_id {
        NONE_COMPRESSOR_ID => Ok(body.clone()),
        ZLIB_COMPRESSOR_ID => decompress(body).map(Bytes::from),
        other => Err(FrameError::UnknownCompressor(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflate_restores_payload() {
        let text = "{\"JOB_ID\":\"1\",\"CMD\":\"0\",\"STATUS\":\"1\",\"DATA\":\"".to_string()
            + &"#Path 1\nStartpoint: a.Q\n".repeat(400)
            + "\"}";
        let packed = compress(text.as_bytes()).unwrap();
        assert!(packed.len() < text.len());

        let restored = decompress(&packed).unwrap();
        assert_eq!(restored, text.as_bytes());
    }

    #[test]
    fn decode_body_passes_plain_through() {
        let body = Bytes::from_static(b"plain");
        assert_eq!(decode_body(NONE_COMPRESSOR_ID, &body).unwrap(), body);
    }

    #[test]
    fn decode_body_rejects_unknown_compressor() {
        let err = decode_body(b'x', &Bytes::from_static(b"??")).unwrap_err();
        assert!(matches!(err, FrameError::UnknownCompressor(b'x')));
    }

    #[test]
    fn corrupt_stream_is_decompress_error() {
        let err = decompress(b"definitely not zlib").unwrap_err();
        assert!(matches!(err, FrameError::Decompress(_)));
    }
}
