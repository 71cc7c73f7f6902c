//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::SyncBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

const REDACTED: &str = "********";

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sensor_api: SensorApiInfo,
    context_store: ContextStoreInfo,
    sync: contracts::SyncSettings,
}

#[derive(Serialize)]
struct SensorApiInfo {
    endpoint: String,
    organism: String,
    username: String,
    password: String,
    request_timeout_secs: u64,
    rate_limit: contracts::RateLimitConfig,
}

#[derive(Serialize)]
struct ContextStoreInfo {
    keystone_url: String,
    orion_url: String,
    service: String,
    subservice: String,
    username: String,
    password: String,
    request_timeout_secs: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

/// Empty secrets stay visibly empty
fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        REDACTED.to_string()
    }
}

fn build_config_info(blueprint: &SyncBlueprint) -> ConfigInfo {
    let api = &blueprint.sensor_api;
    let store = &blueprint.context_store;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sensor_api: SensorApiInfo {
            endpoint: api.endpoint.clone(),
            organism: api.organism.clone(),
            username: api.username.clone(),
            password: redact(&api.password),
            request_timeout_secs: api.request_timeout_secs,
            rate_limit: api.rate_limit.clone(),
        },
        context_store: ContextStoreInfo {
            keystone_url: store.keystone_url.clone(),
            orion_url: store.orion_url.clone(),
            service: store.service.clone(),
            subservice: store.subservice.clone(),
            username: store.username.clone(),
            password: redact(&store.password),
            request_timeout_secs: store.request_timeout_secs,
        },
        sync: blueprint.sync.clone(),
    }
}

fn print_config_info(blueprint: &SyncBlueprint) {
    let api = &blueprint.sensor_api;
    let store = &blueprint.context_store;
    let sync = &blueprint.sync;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Parking Syncer Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Sensor API");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Endpoint: {}", api.endpoint);
    println!("   ├─ Organism: {}", api.organism);
    println!("   ├─ Username: {}", api.username);
    println!("   ├─ Password: {}", redact(&api.password));
    println!("   ├─ Timeout: {}s", api.request_timeout_secs);
    println!(
        "   └─ Rate limit: {} burst, {} per {}s",
        api.rate_limit.capacity, api.rate_limit.refill_amount, api.rate_limit.refill_interval_secs
    );

    println!("\n🗄️  Context Store");
    println!("   ├─ Keystone: {}", store.keystone_url);
    println!("   ├─ Orion: {}", store.orion_url);
    println!("   ├─ Service: {}", store.service);
    println!("   ├─ Subservice: {}", store.subservice);
    println!("   ├─ Username: {}", store.username);
    println!("   └─ Password: {}", redact(&store.password));

    println!("\n⚙️  Sync Settings");
    println!("   ├─ Batch size: {}", sync.batch_size);
    println!("   ├─ Workers: {}", sync.workers);
    println!("   ├─ Lookback: {}h", sync.lookback_hours);
    println!(
        "   ├─ Retries: {} (sleep {}s)",
        sync.retries, sync.retry_sleep_secs
    );
    println!("   ├─ Pace: {}ms", sync.pace_ms);
    println!("   └─ Zones: {}", sync.zones);

    println!();
}
