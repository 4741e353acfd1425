use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Default connection candidates: IPv6 loopback, then IPv4 loopback.
pub const DEFAULT_CANDIDATES: [IpAddr; 2] = [
    IpAddr::V6(Ipv6Addr::LOCALHOST),
    IpAddr::V4(Ipv4Addr::LOCALHOST),
];

/// Ordered list of candidate host addresses with a wrapping cursor.
///
/// A failed attempt advances the cursor, so consecutive failures cycle
/// through every candidate before returning to the first one.
#[derive(Debug, Clone)]
pub struct AddressRotator {
    candidates: Vec<IpAddr>,
    current: usize,
}

impl AddressRotator {
    /// Create a rotator over the default loopback candidates.
    pub fn new() -> Self {
        Self::with_candidates(DEFAULT_CANDIDATES.to_vec())
    }

    /// Create a rotator over an explicit candidate list.
    pub fn with_candidates(candidates: Vec<IpAddr>) -> Self {
        Self {
            candidates,
            current: 0,
        }
    }

    /// The address the next connection attempt will use.
    ///
    /// Returns `None` only when the candidate list is empty.
    pub fn current(&self) -> Option<IpAddr> {
        self.candidates.get(self.current).copied()
    }

    /// The socket address the next connection attempt will use.
    pub fn socket_addr(&self, port: u16) -> Option<SocketAddr> {
        self.current().map(|ip| SocketAddr::new(ip, port))
    }

    /// Advance to the next candidate, wrapping after the last one.
    pub fn rotate(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.candidates.len();
    }

    pub fn candidates(&self) -> &[IpAddr] {
        &self.candidates
    }
}

impl Default for AddressRotator {
    fn default() -> Self {
        Self::new()
    }
}
