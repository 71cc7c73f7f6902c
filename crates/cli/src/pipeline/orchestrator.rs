//! Pipeline orchestrator - wires the configured services into one sync run.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::{EntityStore, SyncBlueprint};
use dispatcher::create_dispatcher;
use ingestion::SensorApiClient;
use sync_engine::SyncEngine;
use tracing::info;

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Configuration with CLI and environment overrides applied
    pub blueprint: SyncBlueprint,

    /// Read from both services but only log batch writes
    pub dry_run: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run one synchronization pass to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let store_config = &blueprint.context_store;
        let tenant = store_config.subservice.clone();

        // Context store first: credential errors surface before any sensor traffic
        info!(
            keystone = %store_config.keystone_url,
            orion = %store_config.orion_url,
            service = %store_config.service,
            subservice = %tenant,
            "Authenticating to context store..."
        );
        let store = create_dispatcher(
            store_config,
            blueprint.sync.retry_policy(),
            self.config.dry_run,
        )
        .context("Failed to create context store client")?;
        store
            .authenticate(&tenant)
            .await
            .context("Context store authentication failed")?;
        let store_metrics = store.metrics();

        info!(
            endpoint = %blueprint.sensor_api.endpoint,
            organism = %blueprint.sensor_api.organism,
            "Logging in to sensor API..."
        );
        let api = SensorApiClient::login(&blueprint.sensor_api)
            .await
            .context("Sensor API login failed")?;
        let fetch_metrics = api.metrics();

        info!(
            store = store.name(),
            workers = blueprint.sync.workers,
            batch_size = blueprint.sync.batch_size,
            zones = blueprint.sync.zones,
            "Starting sync run"
        );
        let mut engine = SyncEngine::new(api, store, tenant, blueprint.sync.clone());
        let report = engine
            .run(Utc::now())
            .await
            .context("Sync run failed")?;

        Ok(PipelineStats {
            report,
            duration: start_time.elapsed(),
            dry_run: self.config.dry_run,
            run_summary: engine.summary(),
            fetch: fetch_metrics.snapshot(),
            store: store_metrics.snapshot(),
        })
    }
}
