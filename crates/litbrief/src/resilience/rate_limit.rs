//! Minimum-interval throttle shared by every caller of one external service.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum gap between consecutive dispatches.
///
/// Callers queue on the inner lock, so concurrent users of the same limiter
/// are released one at a time, each at least `min_interval` after the last.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a dispatch is allowed and records it.
    pub async fn acquire(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                log::debug!(
                    "Throttling dispatch for {}ms",
                    (ready_at - Instant::now()).as_millis()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Waits until a dispatch would be allowed, without recording one.
    pub async fn ready(&self) {
        let last = *self.last_dispatch.lock().await;
        if let Some(ready_at) = last.map(|previous| previous + self.min_interval) {
            tokio::time::sleep_until(ready_at).await;
        }
    }
}
