//! SyncReport - Sync Engine run summary

use serde::{Deserialize, Serialize};

/// Counters collected over one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Projects discovered
    pub projects: usize,

    /// Zones discovered across all projects
    pub zones: usize,

    /// Spots listed by the sensor API
    pub spots_discovered: usize,

    /// Spots dropped for lacking a device association
    pub spots_skipped: usize,

    /// Spots that produced at least one update
    pub spots_synced: usize,

    /// Events fetched across all spots
    pub events_fetched: usize,

    /// Spot updates written to the store
    pub updates_sent: usize,

    /// Batches written to the store (spot and zone passes)
    pub batches_sent: usize,

    /// Zone entities written to the store
    pub zone_entities_sent: usize,
}
