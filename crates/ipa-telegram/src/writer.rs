use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ipa_transport::LoopbackStream;

use crate::codec::{encode_telegram, TelegramConfig, TelegramFrame};
use crate::error::{FrameError, Result};
use crate::header::TelegramHeader;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete telegrams to any `Write` stream.
///
/// Each telegram is encoded into one buffer and written whole, so a
/// telegram never interleaves with another on the wire.
pub struct TelegramWriter<T> {
    inner: T,
    buf: BytesMut,
    config: TelegramConfig,
}

impl<T: Write> TelegramWriter<T> {
    /// Create a new telegram writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TelegramConfig::default())
    }

    /// Create a new telegram writer with explicit configuration.
    pub fn with_config(inner: T, config: TelegramConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &TelegramFrame) -> Result<TelegramHeader> {
        self.send(frame.body.as_ref(), frame.header.compressor_id())
    }

    /// Encode and send a body with the given compressor id.
    ///
    /// Returns the header that went out, for logging and size accounting.
    pub fn send(&mut self, body: &[u8], compressor_id: u8) -> Result<TelegramHeader> {
        if body.len() > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: body.len(),
                max: self.config.max_body_size,
            });
        }

        self.buf.clear();
        let header = encode_telegram(body, compressor_id, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        Ok(header)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current telegram writer configuration.
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }
}

impl TelegramWriter<LoopbackStream> {
    /// Create a telegram writer for `LoopbackStream` and apply write timeout from config.
    pub fn with_config_stream(inner: LoopbackStream, config: TelegramConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::{Ipv4Addr, TcpListener, TcpStream};

    use super::*;
    use crate::compress::ZLIB_COMPRESSOR_ID;
    use crate::header::HEADER_SIZE;
    use crate::reader::TelegramReader;
    use crate::reassembler::TelegramReassembler;

    #[test]
    fn write_single_telegram() {
        let mut writer = TelegramWriter::new(Cursor::new(Vec::<u8>::new()));
        let header = writer.send(b"hello", 0).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), HEADER_SIZE + 5);
        assert_eq!(header.body_len(), 5);

        let frames = TelegramReassembler::new().feed(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_ref(), b"hello");
    }

    #[test]
    fn write_frame_keeps_compressor_id() {
        let frame = TelegramFrame::new(&b"zzz"[..], ZLIB_COMPRESSOR_ID).unwrap();
        let mut writer = TelegramWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire[HEADER_SIZE - 1], b'z');
    }

    #[test]
    fn oversized_body_rejected_before_writing() {
        let cfg = TelegramConfig {
            max_body_size: 4,
            ..TelegramConfig::default()
        };
        let mut writer = TelegramWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.send(b"too long", 0).unwrap_err();

        assert!(matches!(err, FrameError::BodyTooLarge { size: 8, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut writer = TelegramWriter::new(ZeroWriter);
        let err = writer.send(b"x", 0).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn roundtrip_over_loopback() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = TelegramReader::new(stream);
            let first = reader.read_frame().unwrap();
            let second = reader.read_frame().unwrap();
            (first.body, second.body)
        });

        let stream = LoopbackStream::from_tcp(TcpStream::connect(addr).unwrap());
        let mut writer =
            TelegramWriter::with_config_stream(stream, TelegramConfig::default()).unwrap();
        writer.send(b"ping", 0).unwrap();
        writer.send(b"pong", 0).unwrap();

        let (first, second) = server.join().unwrap();
        assert_eq!(first.as_ref(), b"ping");
        assert_eq!(second.as_ref(), b"pong");
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
