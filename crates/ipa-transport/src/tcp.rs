use std::net::{IpAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::address::AddressRotator;
use crate::error::{Result, TransportError};
use crate::stream::LoopbackStream;

/// Default bound on a single connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to the companion on the local host.
///
/// Each call to [`LoopbackConnector::connect`] makes exactly one attempt
/// against the current candidate address. A failed attempt rotates to the
/// next candidate so the following call tries a different address family.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    rotator: AddressRotator,
    connect_timeout: Duration,
}

impl LoopbackConnector {
    /// Create a connector over the default loopback candidates.
    pub fn new() -> Self {
        Self::with_rotator(AddressRotator::new(), DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a connector with explicit candidates and attempt timeout.
    pub fn with_rotator(rotator: AddressRotator, connect_timeout: Duration) -> Self {
        Self {
            rotator,
            connect_timeout,
        }
    }

    /// Attempt one connection to `port` on the current candidate (blocking,
    /// bounded by the connect timeout).
    pub fn connect(&mut self, port: u16) -> Result<LoopbackStream> {
        let addr = self
            .rotator
            .socket_addr(port)
            .ok_or(TransportError::NoCandidates)?;

        match TcpStream::connect_timeout(&addr, self.connect_timeout) {
            Ok(stream) => {
                info!(%addr, "connected to companion");
                Ok(LoopbackStream::from_tcp(stream))
            }
            Err(source) => {
                self.rotator.rotate();
                debug!(
                    %addr,
                    next = ?self.rotator.current(),
                    error = %source,
                    "connect attempt failed, rotating address"
                );
                Err(TransportError::Connect { addr, source })
            }
        }
    }

    /// The address the next attempt will use.
    pub fn current(&self) -> Option<IpAddr> {
        self.rotator.current()
    }
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpListener};

    use super::*;

    fn ipv4_only() -> LoopbackConnector {
        LoopbackConnector::with_rotator(
            AddressRotator::with_candidates(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]),
            Duration::from_secs(2),
        )
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_connect_and_exchange() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
        });

        let mut connector = ipv4_only();
        let mut client = connector.connect(port).unwrap();
        client.write_all(b"hello").unwrap();
        assert_eq!(client.peer_addr().unwrap().port(), port);

        handle.join().unwrap();
    }

    #[test]
    fn test_failed_attempts_rotate_addresses() {
        let port = closed_port();
        let mut connector =
            LoopbackConnector::with_rotator(AddressRotator::new(), Duration::from_millis(500));

        let first = connector.current();
        let err = connector.connect(port).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));

        let second = connector.current();
        assert_ne!(first, second);
        assert!(connector.connect(port).is_err());

        // Third attempt wraps back to the first candidate.
        assert_eq!(connector.current(), first);
    }

    #[test]
    fn test_connect_error_names_address() {
        let port = closed_port();
        let mut connector = ipv4_only();
        match connector.connect(port) {
            Err(TransportError::Connect { addr, .. }) => {
                assert_eq!(addr.port(), port);
                assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_no_candidates() {
        let mut connector = LoopbackConnector::with_rotator(
            AddressRotator::with_candidates(Vec::new()),
            DEFAULT_CONNECT_TIMEOUT,
        );
        assert!(matches!(
            connector.connect(1),
            Err(TransportError::NoCandidates)
        ));
    }
}
