//! Token-bucket rate limiter shared by every fetch of a crawl run.
//!
//! Tokens refill continuously and lazily: each call to [`RateLimiter::acquire`]
//! first credits `elapsed_ms * refill_per_ms` tokens (capped at capacity) and
//! then tries to debit. Refill and debit happen under one lock so concurrent
//! callers never spend tokens they did not observe.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket with fixed capacity and refill rate.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_ms: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a full bucket holding `capacity` tokens that regains
    /// `refill_per_ms` tokens per elapsed millisecond.
    pub fn new(capacity: u32, refill_per_ms: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_ms: refill_per_ms.max(f64::MIN_POSITIVE),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Convenience constructor taking a per-second refill rate.
    pub fn per_second(capacity: u32, tokens_per_second: f64) -> Self {
        Self::new(capacity, tokens_per_second / 1000.0)
    }

    /// Suspend until `n` tokens are available, then debit them.
    pub async fn acquire(&self, n: u32) {
        let mut wanted = f64::from(n);
        if wanted > self.capacity {
            warn!(
                requested = n,
                capacity = self.capacity,
                "Requested more tokens than the bucket holds; clamping to capacity"
            );
            wanted = self.capacity;
        }

        loop {
            let wait = {
                let mut state = self.lock();
                self.refill(&mut state);
                // Sub-nanosecond float drift must not cost an extra timer tick.
                if state.tokens + 1e-9 >= wanted {
                    state.tokens = (state.tokens - wanted).max(0.0);
                    return;
                }
                self.refill_wait(wanted - state.tokens)
            };
            debug!(?wait, "Rate limiter exhausted; waiting for refill");
            sleep(wait).await;
        }
    }

    /// Time until `missing` tokens have been credited. Saturates at
    /// [`Duration::MAX`] for rates too slow to express; tokio then parks the
    /// sleep at its far-future deadline instead of overflowing.
    fn refill_wait(&self, missing: f64) -> Duration {
        Duration::try_from_secs_f64(missing / self.refill_per_ms / 1000.0).unwrap_or(Duration::MAX)
    }

    /// Tokens currently available, after crediting elapsed time.
    #[cfg(test)]
    pub fn available(&self) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_secs_f64() * 1000.0;
        state.tokens = (state.tokens + elapsed_ms * self.refill_per_ms).min(self.capacity);
        state.last_refill = now;
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
