//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::SyncBlueprint;
use std::path::PathBuf;
use tracing::info;

/// Parking Syncer - parking sensor occupancy to context store synchronization
#[derive(Parser, Debug)]
#[command(
    name = "parking-syncer",
    author,
    version,
    about = "Parking sensor occupancy synchronization",
    long_about = "Synchronizes on-street parking occupancy from the sensor vendor API into an\n\
                  NGSI v2 context broker.\n\n\
                  Discovers projects, zones and spots, fetches every occupancy event since\n\
                  the last stored update, and uploads them in batches."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        env = "PARKING_SYNCER_VERBOSE"
    )]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PARKING_SYNCER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one synchronization pass
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information (secrets redacted)
    Info(InfoArgs),

    /// List projects, zones and spots without fetching events
    Discover(DiscoverArgs),
}

/// Sensor API overrides, usually supplied through the environment
#[derive(Args, Debug, Clone, Default)]
pub struct SensorApiOverrides {
    /// Sensor API base URL
    #[arg(long, env = "SENSOR_API_ENDPOINT")]
    pub sensor_endpoint: Option<String>,

    /// Sensor API organism
    #[arg(long, env = "SENSOR_API_ORGANISM")]
    pub organism: Option<String>,

    /// Sensor API username
    #[arg(long, env = "SENSOR_API_USERNAME")]
    pub sensor_username: Option<String>,

    /// Sensor API password
    #[arg(long, env = "SENSOR_API_PASSWORD", hide_env_values = true)]
    pub sensor_password: Option<String>,
}

impl SensorApiOverrides {
    pub fn apply(&self, blueprint: &mut SyncBlueprint) {
        let api = &mut blueprint.sensor_api;
        if let Some(ref endpoint) = self.sensor_endpoint {
            info!(endpoint = %endpoint, "Overriding sensor API endpoint");
            api.endpoint = endpoint.clone();
        }
        if let Some(ref organism) = self.organism {
            api.organism = organism.clone();
        }
        if let Some(ref username) = self.sensor_username {
            api.username = username.clone();
        }
        if let Some(ref password) = self.sensor_password {
            api.password = password.clone();
        }
    }
}

/// Context store overrides, usually supplied through the environment
#[derive(Args, Debug, Clone, Default)]
pub struct ContextStoreOverrides {
    /// Keystone base URL
    #[arg(long, env = "KEYSTONE_URL")]
    pub keystone_url: Option<String>,

    /// Orion base URL
    #[arg(long, env = "ORION_URL")]
    pub orion_url: Option<String>,

    /// Fiware service
    #[arg(long, env = "ORION_SERVICE")]
    pub service: Option<String>,

    /// Fiware service path
    #[arg(long, env = "ORION_SUBSERVICE")]
    pub subservice: Option<String>,

    /// Keystone username
    #[arg(long, env = "ORION_USERNAME")]
    pub store_username: Option<String>,

    /// Keystone password
    #[arg(long, env = "ORION_PASSWORD", hide_env_values = true)]
    pub store_password: Option<String>,
}

impl ContextStoreOverrides {
    pub fn apply(&self, blueprint: &mut SyncBlueprint) {
        let store = &mut blueprint.context_store;
        if let Some(ref url) = self.keystone_url {
            info!(url = %url, "Overriding Keystone URL");
            store.keystone_url = url.clone();
        }
        if let Some(ref url) = self.orion_url {
            info!(url = %url, "Overriding Orion URL");
            store.orion_url = url.clone();
        }
        if let Some(ref service) = self.service {
            store.service = service.clone();
        }
        if let Some(ref subservice) = self.subservice {
            store.subservice = subservice.clone();
        }
        if let Some(ref username) = self.store_username {
            store.username = username.clone();
        }
        if let Some(ref password) = self.store_password {
            store.password = password.clone();
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "PARKING_SYNCER_CONFIG"
    )]
    pub config: PathBuf,

    #[command(flatten)]
    pub sensor_api: SensorApiOverrides,

    #[command(flatten)]
    pub context_store: ContextStoreOverrides,

    /// Maximum entities per batch write
    #[arg(long, env = "PARKING_SYNCER_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Extra attempts for a rejected batch write
    #[arg(long, env = "PARKING_SYNCER_RETRIES")]
    pub retries: Option<u32>,

    /// Seconds to sleep between batch write attempts
    #[arg(long, env = "PARKING_SYNCER_RETRY_SLEEP")]
    pub retry_sleep: Option<u64>,

    /// Concurrent per-spot fetch workers
    #[arg(long, env = "PARKING_SYNCER_WORKERS")]
    pub workers: Option<usize>,

    /// Also upload one aggregated entity per zone
    #[arg(long, env = "PARKING_SYNCER_ZONES")]
    pub zones: bool,

    /// Read from both services but only log batch writes
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "PARKING_SYNCER_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    /// Apply flag and environment overrides on top of the file configuration
    pub fn apply_overrides(&self, blueprint: &mut SyncBlueprint) {
        self.sensor_api.apply(blueprint);
        self.context_store.apply(blueprint);

        let sync = &mut blueprint.sync;
        if let Some(batch_size) = self.batch_size {
            sync.batch_size = batch_size;
        }
        if let Some(retries) = self.retries {
            sync.retries = retries;
        }
        if let Some(retry_sleep) = self.retry_sleep {
            sync.retry_sleep_secs = retry_sleep;
        }
        if let Some(workers) = self.workers {
            sync.workers = workers;
        }
        if self.zones {
            sync.zones = true;
        }
    }

    /// Prometheus port, `None` when disabled
    pub fn metrics_port(&self) -> Option<u16> {
        (self.metrics_port != 0).then_some(self.metrics_port)
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub sensor_api: SensorApiOverrides,

    #[command(flatten)]
    pub context_store: ContextStoreOverrides,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `discover` command
#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "PARKING_SYNCER_CONFIG"
    )]
    pub config: PathBuf,

    #[command(flatten)]
    pub sensor_api: SensorApiOverrides,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
