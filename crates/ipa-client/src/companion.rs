use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    running: AtomicBool,
    port: AtomicU32,
}

/// Companion process state as reported by its supervisor.
///
/// This is the one piece of client state written from outside the event
/// loop. Clones share the same state, so the supervisor keeps a clone and
/// the transport reads it on every tick.
#[derive(Debug, Clone, Default)]
pub struct CompanionStatus {
    inner: Arc<Inner>,
}

impl CompanionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status for a companion already known to be up on `port`.
    pub fn running_on(port: u16) -> Self {
        let status = Self::new();
        status.set_port(port);
        status.set_running(true);
        status
    }

    pub fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::Release);
    }

    /// Whether the companion is expected to be accepting connections.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn set_port(&self, port: u16) {
        self.inner.port.store(u32::from(port), Ordering::Release);
    }

    /// Listening port, once the companion has published one.
    pub fn port(&self) -> Option<u16> {
        match self.inner.port.load(Ordering::Acquire) {
            0 => None,
            port => u16::try_from(port).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let status = CompanionStatus::new();
        let supervisor = status.clone();
        assert!(!status.is_running());
        assert_eq!(status.port(), None);

        supervisor.set_port(61555);
        supervisor.set_running(true);
        assert!(status.is_running());
        assert_eq!(status.port(), Some(61555));
    }
}
