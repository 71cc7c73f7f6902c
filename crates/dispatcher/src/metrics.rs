//! Store metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a context store client
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Batches accepted by the store
    batches_sent: AtomicU64,
    /// Entities inside accepted batches
    entities_sent: AtomicU64,
    /// Batch attempts repeated after a failure
    retries: AtomicU64,
    /// Token renewals
    renewals: AtomicU64,
    /// Full credential authentications
    authentications: AtomicU64,
}

impl StoreMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record accepted batch
    pub fn record_batch(&self, entities: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.entities_sent
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    /// Increment retry count
    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment renewal count
    pub fn inc_renewals(&self) {
        self.renewals.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment authentication count
    pub fn inc_authentications(&self) {
        self.authentications.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            entities_sent: self.entities_sent.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            renewals: self.renewals.load(Ordering::Relaxed),
            authentications: self.authentications.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of store metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetricsSnapshot {
    pub batches_sent: u64,
    pub entities_sent: u64,
    pub retries: u64,
    pub renewals: u64,
    pub authentications: u64,
}
