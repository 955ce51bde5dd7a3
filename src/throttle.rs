//! Process-wide pacing gate for hosting-API writes.
//!
//! GitHub's secondary rate limits are triggered by burst frequency, not by
//! concurrency, so a plain semaphore is not enough: the gate enforces a
//! minimum interval between successive call *starts*, however many tasks
//! are in flight.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A shared gate that spaces out permits by a fixed minimum interval.
///
/// Permits are granted in request order: `tokio::sync::Mutex` queues
/// waiters FIFO, and the holder sleeps out the remaining interval before
/// stamping the new grant time and releasing the lock.
pub struct ThrottleGate {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl ThrottleGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Wait until at least `interval` has elapsed since the previous permit,
    /// then take the next one. Never fails; it only delays.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.interval {
                tokio::time::sleep(self.interval - since).await;
            }
        }
        *last = Some(Instant::now());
    }
}
