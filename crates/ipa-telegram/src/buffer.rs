use std::fmt;
use std::ops::Deref;

use bytes::{Buf, Bytes, BytesMut};

/// Default capacity reserved by [`ByteBuffer::new`].
pub const DEFAULT_SIZE_HINT: usize = 1024;

/// Sum of byte values, wrapping at `u32`.
///
/// This is the body checksum carried in every telegram header.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// Growable, exclusively owned byte sequence.
///
/// Backed by [`BytesMut`], so consuming bytes from the front only moves the
/// start offset instead of shifting the remaining contents.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    inner: BytesMut,
}

impl ByteBuffer {
    /// Create an empty buffer with the default capacity hint.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SIZE_HINT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
        }
    }

    /// Append the contents of another buffer.
    pub fn append(&mut self, other: &ByteBuffer) {
        self.inner.extend_from_slice(&other.inner);
    }

    /// Append raw bytes.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.inner.extend_from_slice(bytes);
    }

    pub fn push(&mut self, byte: u8) {
        self.inner.extend_from_slice(&[byte]);
    }

    /// Offset of the first occurrence of `needle`, if any.
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        self.find_sequence_from(needle, 0)
    }

    /// Offset of the first occurrence of `needle` at or after `start`.
    pub fn find_sequence_from(&self, needle: &[u8], start: usize) -> Option<usize> {
        if needle.is_empty() || start >= self.inner.len() {
            return None;
        }
        self.inner[start..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| pos + start)
    }

    /// Checksum over the whole buffer. See [`checksum`].
    pub fn checksum(&self) -> u32 {
        checksum(&self.inner)
    }

    /// Drop the first `count` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the buffer length.
    pub fn consume(&mut self, count: usize) {
        self.inner.advance(count);
    }

    /// Remove and return the first `count` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the buffer length.
    pub fn split_to(&mut self, count: usize) -> Bytes {
        self.inner.split_to(count).freeze()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    /// Lossy UTF-8 view of the contents.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner).into_owned()
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self {
            inner: BytesMut::from(bytes),
        }
    }
}

impl From<&str> for ByteBuffer {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes())
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            inner: BytesMut::from(bytes.as_slice()),
        }
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_back() {
        let mut buf = ByteBuffer::from("111");
        buf.append(&ByteBuffer::from("222"));
        buf.push(b'3');

        assert_eq!(buf.len(), 7);
        assert_eq!(buf.to_string_lossy(), "1112223");
        assert_eq!(buf[6], b'3');

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.to_string_lossy(), "");
    }

    #[test]
    fn find_sequence_positions() {
        let buf = ByteBuffer::from("xxIPAyyIPA");
        assert_eq!(buf.find_sequence(b"IPA"), Some(2));
        assert_eq!(buf.find_sequence_from(b"IPA", 3), Some(7));
        assert_eq!(buf.find_sequence(b"ZZZ"), None);
        assert_eq!(buf.find_sequence(b"xxIPAyyIPA--"), None);
        assert_eq!(buf.find_sequence_from(b"IPA", 100), None);
    }

    #[test]
    fn checksum_is_byte_sum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(&[1, 2, 3]), 6);
        assert_eq!(ByteBuffer::from(&[0xFFu8, 0x01][..]).checksum(), 256);
    }

    #[test]
    fn checksum_is_deterministic_and_sensitive() {
        let body = b"{\"JOB_ID\":\"7\",\"CMD\":\"0\"}";
        assert_eq!(checksum(body), checksum(body));

        let mut changed = body.to_vec();
        changed[3] ^= 0x01;
        assert_ne!(checksum(body), checksum(&changed));
    }

    #[test]
    fn checksum_wraps_instead_of_overflowing() {
        let bytes = vec![0xFFu8; (u32::MAX as usize / 0xFF) + 2];
        let expected = (bytes.len() as u64 * 0xFF) % (u64::from(u32::MAX) + 1);
        assert_eq!(u64::from(checksum(&bytes)), expected);
    }

    #[test]
    fn consume_and_split() {
        let mut buf = ByteBuffer::from("garbageIPA-body");
        buf.consume(7);
        assert_eq!(buf.as_slice(), b"IPA-body");

        let head = buf.split_to(4);
        assert_eq!(head.as_ref(), b"IPA-");
        assert_eq!(buf.as_slice(), b"body");
    }
}
