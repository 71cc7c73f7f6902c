//! SensorApi trait - Ingestion input interface
//!
//! Abstracts the vendor sensor API so the sync engine can run against the
//! real HTTP client or an in-memory mock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{Device, Event, Project, Spot, SyncError, Zone};

/// Read-only access to the parking sensor API.
///
/// Listings are keyed by the record's identity attribute. Every call is
/// expected to pass through the shared rate limiter.
#[trait_variant::make(SensorApi: Send)]
pub trait LocalSensorApi {
    /// Projects visible to the logged-in user, keyed by `projectid`
    async fn projects(&self) -> Result<BTreeMap<String, Project>, SyncError>;

    /// Zones of a project, keyed by `zoneid`
    async fn zones(&self, project_id: &str) -> Result<BTreeMap<String, Zone>, SyncError>;

    /// Devices of a zone, keyed by `elementid`
    async fn devices(
        &self,
        project_id: &str,
        zone_id: &str,
    ) -> Result<BTreeMap<String, Device>, SyncError>;

    /// Spots of a project, keyed by `pomid`
    async fn spots(&self, project_id: &str) -> Result<BTreeMap<String, Spot>, SyncError>;

    /// Occupancy events of one spot, ascending by timestamp.
    ///
    /// The window may be shortened by the implementation. Failures degrade
    /// to an empty list and never surface as errors.
    async fn events(
        &self,
        project_id: &str,
        pomid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Event>;
}
