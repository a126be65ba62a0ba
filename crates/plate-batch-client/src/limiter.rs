use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Token bucket with a single slot: enforces a minimum interval between
/// acquisitions across every holder of the limiter.
///
/// The slot timestamp is guarded by a mutex and held across the wait, so
/// concurrent callers serialize through one acquisition discipline instead
/// of sleeping independently. A zero interval disables pacing.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut slot = self.next_slot.lock().await;
        let now = Instant::now();
        let ready = (*slot).unwrap_or(now);
        if ready > now {
            sleep_until(ready).await;
        }
        *slot = Some(ready.max(now) + self.interval);
    }
}
