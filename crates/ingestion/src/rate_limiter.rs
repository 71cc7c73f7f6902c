//! Token bucket shared by every sensor API request
//!
//! Tokens refill continuously at `refill_amount / refill_interval` up to
//! `capacity`. Waiters queue on a fair async mutex, so callers are served
//! roughly in arrival order. The bucket only delays; it never rejects.

use std::time::Duration;

use contracts::{RateLimitConfig, SyncError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Shortest sleep while waiting for a token
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Async token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    /// Tokens per second
    refill_rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    ///
    /// # Errors
    /// Rejects zero capacity, zero refill amount or a zero interval.
    pub fn new(
        capacity: u32,
        refill_amount: u32,
        refill_interval: Duration,
    ) -> Result<Self, SyncError> {
        if capacity == 0 {
            return Err(SyncError::config_validation(
                "rate_limit.capacity",
                "capacity must be > 0",
            ));
        }
        if refill_amount == 0 {
            return Err(SyncError::config_validation(
                "rate_limit.refill_amount",
                "refill_amount must be > 0",
            ));
        }
        if refill_interval.is_zero() {
            return Err(SyncError::config_validation(
                "rate_limit.refill_interval_secs",
                "refill interval must be > 0",
            ));
        }

        Ok(Self {
            capacity: f64::from(capacity),
            refill_rate: f64::from(refill_amount) / refill_interval.as_secs_f64(),
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        })
    }

    /// Create from the `[sensor_api.rate_limit]` section
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, SyncError> {
        Self::new(
            config.capacity,
            config.refill_amount,
            Duration::from_secs(config.refill_interval_secs),
        )
    }

    /// Wait until a token is available and take it.
    ///
    /// Returns how long the caller was throttled.
    pub async fn acquire(&self) -> Duration {
        if self.try_acquire() {
            return Duration::ZERO;
        }

        let started = Instant::now();
        // Held across the sleep: later callers queue behind the current waiter.
        let mut state = self.state.lock().await;

        loop {
            self.refill(&mut state);
            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                break;
            }

            let deficit = 1.0 - state.tokens;
            let wait = Duration::from_secs_f64(deficit / self.refill_rate).max(MIN_WAIT);
            debug!(
                wait_ms = wait.as_millis() as u64,
                tokens = state.tokens,
                "rate limit reached, waiting for token"
            );
            tokio::time::sleep(wait).await;
        }

        let waited = started.elapsed();
        if !waited.is_zero() {
            metrics::histogram!("parking_syncer_throttle_wait_seconds")
                .record(waited.as_secs_f64());
        }
        waited
    }

    /// Take a token if one is immediately available.
    ///
    /// Returns `false` when the bucket is empty or another caller is waiting.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after refill
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
            state.last_refill = now;
        }
    }
}
