//! Sensor API client metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Fetch metrics
#[derive(Debug, Default)]
pub struct FetchMetrics {
    /// HTTP requests issued (login, listings, event fetches, retries)
    pub requests: AtomicU64,

    /// Events returned by successful event fetches
    pub events_fetched: AtomicU64,

    /// Event fetches retried after a first failure
    pub retries: AtomicU64,

    /// Event fetches that failed twice and degraded to an empty list
    pub degraded: AtomicU64,
}

impl FetchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record request issued
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record events fetched
    pub fn record_events(&self, count: usize) {
        self.events_fetched.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record event fetch retry
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record degraded event fetch
    pub fn record_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> FetchMetricsSnapshot {
        FetchMetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            events_fetched: self.events_fetched.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchMetricsSnapshot {
    pub requests: u64,
    pub events_fetched: u64,
    pub retries: u64,
    pub degraded: u64,
}
