//! Main sync engine implementation.

use chrono::{DateTime, Utc};
use contracts::{
    Entity, EntityStore, SensorApi, SyncError, SyncReport, SyncSettings, PARKING_SPOT_TYPE,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use observability::{RunMetricsAggregator, RunSummary};
use tracing::{debug, info, instrument};

use crate::batch::partition;
use crate::inventory::{discover, Inventory, SpotPlan};
use crate::rotate::rotate;
use crate::transform::{spot_updates, to_zone_entity};
use crate::watermark::resolve_watermark;

/// Updates collected for one spot
#[derive(Debug)]
struct CollectedSpot {
    events: usize,
    /// Seconds between the watermark and the run instant
    lag_secs: f64,
    updates: Vec<Entity>,
}

/// One-shot synchronization of sensor occupancy into the context store
#[derive(Debug)]
pub struct SyncEngine<A, S> {
    api: A,
    store: S,
    /// Store sub-path every entity is written under
    tenant: String,
    settings: SyncSettings,
    aggregator: RunMetricsAggregator,
}

impl<A, S> SyncEngine<A, S>
where
    A: SensorApi + Sync,
    S: EntityStore + Sync,
{
    pub fn new(api: A, store: S, tenant: impl Into<String>, settings: SyncSettings) -> Self {
        Self {
            api,
            store,
            tenant: tenant.into(),
            settings,
            aggregator: RunMetricsAggregator::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Statistics of the last run
    pub fn summary(&self) -> RunSummary {
        self.aggregator.summary()
    }

    /// List projects, zones, devices and spots without fetching events
    pub async fn discover(&self) -> Result<Inventory, SyncError> {
        discover(&self.api).await
    }

    /// Run one synchronization pass ending at `now`.
    ///
    /// Listing and store failures abort the run. A spot whose event fetch
    /// fails contributes no updates.
    #[instrument(
        name = "sync_engine_run",
        skip(self),
        fields(tenant = %self.tenant, store = self.store.name())
    )]
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        self.aggregator.reset();

        let inventory = discover(&self.api).await?;
        let mut report = SyncReport {
            projects: inventory.projects.len(),
            zones: inventory.zone_count(),
            spots_discovered: inventory.spot_count(),
            spots_skipped: inventory.skipped_count(),
            ..Default::default()
        };

        let collected = self.collect(&inventory, now).await?;
        for spot in &collected {
            observability::record_spot_collected(spot.events, spot.lag_secs);
            self.aggregator.observe_spot(spot.events, spot.lag_secs);
            report.events_fetched += spot.events;
            if !spot.updates.is_empty() {
                report.spots_synced += 1;
            }
        }

        let merged = rotate(collected.into_iter().map(|spot| spot.updates));
        let batches = partition(merged, self.settings.batch_size, Entity::id);
        for batch in batches {
            self.upload("spot", &batch).await?;
            report.batches_sent += 1;
            report.updates_sent += batch.len();
        }

        if self.settings.zones {
            let zones = zone_entities(&inventory, now);
            for batch in partition(zones, self.settings.batch_size, Entity::id) {
                self.upload("zone", &batch).await?;
                report.batches_sent += 1;
                report.zone_entities_sent += batch.len();
            }
        }

        observability::record_run_report(&report);
        info!(
            projects = report.projects,
            spots_synced = report.spots_synced,
            spots_skipped = report.spots_skipped,
            events = report.events_fetched,
            batches = report.batches_sent,
            "sync run complete"
        );
        Ok(report)
    }

    /// Fetch and transform every planned spot on a bounded worker pool,
    /// keeping discovery order
    async fn collect(
        &self,
        inventory: &Inventory,
        now: DateTime<Utc>,
    ) -> Result<Vec<CollectedSpot>, SyncError> {
        stream::iter(inventory.plans())
            .map(|plan| self.collect_spot(plan, now))
            .buffered(self.settings.workers.max(1))
            .try_collect()
            .await
    }

    #[instrument(
        name = "sync_engine_collect_spot",
        level = "debug",
        skip(self, plan, now),
        fields(pomid = %plan.spot.pomid)
    )]
    async fn collect_spot(
        &self,
        plan: &SpotPlan,
        now: DateTime<Utc>,
    ) -> Result<CollectedSpot, SyncError> {
        let stored = self
            .store
            .get_entity(&self.tenant, &plan.spot.entity_id(), PARKING_SPOT_TYPE)
            .await?;
        let from = resolve_watermark(stored.as_ref(), now, self.settings.lookback());

        let events = self
            .api
            .events(&plan.project_id, &plan.spot.pomid, from, now)
            .await;
        let updates = spot_updates(&plan.spot, &plan.device, &plan.zone_id, &events);

        debug!(from = %from, events = events.len(), "spot collected");
        Ok(CollectedSpot {
            events: events.len(),
            lag_secs: (now - from).num_milliseconds() as f64 / 1000.0,
            updates,
        })
    }

    async fn upload(&mut self, kind: &str, batch: &[Entity]) -> Result<(), SyncError> {
        self.store.send_batch(&self.tenant, batch).await?;
        observability::record_batch_uploaded(kind, batch.len());
        self.aggregator.observe_batch(batch.len());
        debug!(kind, entities = batch.len(), "batch uploaded");
        Ok(())
    }
}

/// One `OnStreetParking` entity per discovered zone
fn zone_entities(inventory: &Inventory, now: DateTime<Utc>) -> Vec<Entity> {
    inventory
        .projects
        .iter()
        .flat_map(|project| {
            project.zones.values().map(move |zone| {
                to_zone_entity(zone, &project.zone_members(&zone.zoneid), now).into()
            })
        })
        .collect()
}
