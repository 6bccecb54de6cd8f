//! Busy-line gating

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::transport::Transport;

/// Bounded wait for the module's busy line to clear
///
/// Gates writes only; reads never wait on the busy line.
#[derive(Debug, Clone, Copy)]
pub struct BusyGate {
    poll_interval: Duration,
}

impl BusyGate {
    /// Gate sampling the line with the given pause between polls
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Poll until the module reads idle or `wait` elapses
    ///
    /// Returns `false` on deadline expiry. Each poll is a cooperative yield
    /// point, so other tasks run between samples.
    pub async fn await_idle<T: Transport>(&self, transport: &T, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        while transport.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.poll_interval).await;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn test_idle_module_passes_immediately() {
        let mock = MockTransport::new();
        let gate = BusyGate::new(Duration::from_millis(1));

        let start = Instant::now();
        assert!(gate.await_idle(&mock, Duration::from_secs(5)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_module_times_out() {
        let mock = MockTransport::new();
        mock.set_busy(true);
        let gate = BusyGate::new(Duration::from_millis(1));

        let wait = Duration::from_millis(50);
        let start = Instant::now();
        assert!(!gate.await_idle(&mock, wait).await);
        assert!(start.elapsed() >= wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_busy_releases_the_gate() {
        let mock = MockTransport::new();
        mock.set_busy(true);
        let gate = BusyGate::new(Duration::from_millis(1));

        let released = mock.clone();
        let waiter = tokio::spawn(async move {
            let transport = released;
            gate.await_idle(&transport, Duration::from_secs(5)).await
        });

        sleep(Duration::from_millis(10)).await;
        mock.set_busy(false);
        assert!(waiter.await.unwrap());
    }
}
