// Minimum-interval rate limiter for remote inference calls.
//
// Hosted inference endpoints rate-limit per token. All workers share one
// HttpClassifier, so the limiter is the single choke point: each call waits
// until at least `interval` has passed since the previous one went out.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    interval: Duration,
    /// When the next call is allowed to go out
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` calls per second.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                next_slot: None,
            })),
        }
    }

    /// Wait for this caller's slot.
    ///
    /// The slot is reserved under the lock and the sleep happens after the
    /// lock is released, so concurrent callers queue up one interval apart
    /// instead of all waking at the same instant.
    pub async fn acquire(&self) {
        let wait_until = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            let slot = match inner.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            inner.next_slot = Some(slot + inner.interval);
            slot
        };

        tokio::time::sleep_until(wait_until).await;
    }
}
