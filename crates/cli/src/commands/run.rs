//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI / environment overrides, then re-check
    args.apply_overrides(&mut blueprint);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after overrides")?;
    config_loader::validate_credentials(&blueprint).context("Missing credentials")?;

    info!(
        sensor_api = %blueprint.sensor_api.endpoint,
        organism = %blueprint.sensor_api.organism,
        orion = %blueprint.context_store.orion_url,
        subservice = %blueprint.context_store.subservice,
        batch_size = blueprint.sync.batch_size,
        retries = blueprint.sync.retries,
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        dry_run: args.dry_run,
    });

    let stats = pipeline.run().await.context("Pipeline execution failed")?;
    info!(
        spots_synced = stats.report.spots_synced,
        updates_sent = stats.report.updates_sent,
        batches_sent = stats.report.batches_sent,
        duration_secs = stats.duration.as_secs_f64(),
        "Sync completed successfully"
    );

    // Print detailed statistics
    stats.print_summary();

    info!("Parking Syncer finished");
    Ok(())
}
