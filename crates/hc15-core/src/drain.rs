//! Background receive drain
//!
//! A periodic task that moves over-the-air bytes from the transport into
//! the shared line buffer. Each pass competes for the same transport token
//! as configuration commands, so a pass that loses the race is skipped
//! rather than queued and the cadence stays fixed.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::driver::DriverShared;
use crate::lock::TransportGuard;
use crate::transport::Transport;

/// Cadence settings for the drain task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainConfig {
    /// Pause between drain passes
    pub interval: Duration,
    /// Longest wait for the transport token before a pass is skipped
    pub lock_wait: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            lock_wait: Duration::from_secs(5),
        }
    }
}

/// Handle to a running drain task
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) detaches
/// the task; it keeps draining for as long as its driver internals live.
pub struct DrainHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DrainHandle {
    pub(crate) fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    /// Stop the task and wait for it to wind down
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(%err, "drain task ended abnormally");
        }
    }

    /// Whether the task has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) async fn run<T: Transport>(
    shared: Arc<DriverShared<T>>,
    config: DrainConfig,
    cancel: CancellationToken,
) {
    debug!(interval = ?config.interval, "drain task started");
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let guard = tokio::select! {
            _ = cancel.cancelled() => break,
            acquired = shared.transport.acquire(config.lock_wait) => match acquired {
                Ok(guard) => guard,
                Err(_) => {
                    warn!("transport token still held, skipping drain pass");
                    continue;
                }
            },
        };

        drain_pass(guard, &shared);
    }
    debug!("drain task stopped");
}

/// One token-holding pass: read what is pending now, commit it in one push
fn drain_pass<T: Transport>(mut guard: TransportGuard<'_, T>, shared: &DriverShared<T>) {
    if guard.is_busy() {
        trace!("module busy, leaving receive bytes in place");
        return;
    }

    let available = guard.bytes_available();
    if available == 0 {
        return;
    }

    let mut chunk = Vec::with_capacity(available);
    for _ in 0..available {
        match guard.read_byte() {
            Some(byte) => chunk.push(byte),
            None => break,
        }
    }
    if !chunk.is_empty() {
        trace!(bytes = chunk.len(), "drained receive bytes");
        shared.buffer().push_bytes(&chunk);
    }
}
