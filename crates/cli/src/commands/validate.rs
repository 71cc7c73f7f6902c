//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::SyncBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

const VENDOR_REQUESTS_PER_MINUTE: f64 = 100.0;

/// Validation report, printed as text or JSON
#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    sensor_api: String,
    organism: String,
    orion_url: String,
    service: String,
    subservice: String,
    batch_size: usize,
    workers: usize,
    zones: bool,
}

impl From<&SyncBlueprint> for ConfigSummary {
    fn from(blueprint: &SyncBlueprint) -> Self {
        Self {
            sensor_api: blueprint.sensor_api.endpoint.clone(),
            organism: blueprint.sensor_api.organism.clone(),
            orion_url: blueprint.context_store.orion_url.clone(),
            service: blueprint.context_store.service.clone(),
            subservice: blueprint.context_store.subservice.clone(),
            batch_size: blueprint.sync.batch_size,
            workers: blueprint.sync.workers,
            zones: blueprint.sync.zones,
        }
    }
}

impl ValidationReport {
    fn check(args: &ValidateArgs) -> Self {
        let config_path = args.config.display().to_string();
        match load(args) {
            Ok(blueprint) => Self {
                valid: true,
                config_path,
                error: None,
                warnings: collect_warnings(&blueprint),
                summary: Some(ConfigSummary::from(&blueprint)),
            },
            Err(e) => Self {
                valid: false,
                config_path,
                error: Some(format!("{e:#}")),
                warnings: Vec::new(),
                summary: None,
            },
        }
    }

    fn print(&self) {
        if !self.valid {
            println!("✗ Configuration is invalid: {}", self.config_path);
            if let Some(ref error) = self.error {
                println!("\n  Error: {error}");
            }
            return;
        }

        println!("✓ Configuration is valid: {}", self.config_path);
        if let Some(ref summary) = self.summary {
            println!("\n  Sensor API: {} ({})", summary.sensor_api, summary.organism);
            println!("  Orion: {}", summary.orion_url);
            println!("  Tenant: {}{}", summary.service, summary.subservice);
            println!(
                "  Batch size: {}, workers: {}, zones: {}",
                summary.batch_size, summary.workers, summary.zones
            );
        }
        if !self.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &self.warnings {
                println!("  - {warning}");
            }
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let report = ValidationReport::check(args);
    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize validation report")?;
        println!("{json}");
    } else {
        report.print();
    }

    anyhow::ensure!(report.valid, "Configuration validation failed");
    Ok(())
}

/// Load the file, then layer the same env/flag overrides `run` would apply
fn load(args: &ValidateArgs) -> Result<SyncBlueprint> {
    anyhow::ensure!(args.config.exists(), "File not found: {}", args.config.display());
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    args.sensor_api.apply(&mut blueprint);
    args.context_store.apply(&mut blueprint);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Overrides produced an invalid configuration")?;
    Ok(blueprint)
}

/// Non-fatal issues worth surfacing before a run
fn collect_warnings(blueprint: &SyncBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Err(e) = config_loader::validate_credentials(blueprint) {
        warnings.push(format!("{e} - must be supplied via environment or flags"));
    }

    for (name, url) in [
        ("sensor_api.endpoint", &blueprint.sensor_api.endpoint),
        ("context_store.keystone_url", &blueprint.context_store.keystone_url),
        ("context_store.orion_url", &blueprint.context_store.orion_url),
    ] {
        if url.starts_with("http://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
            warnings.push(format!("{name} uses plain http - credentials travel unencrypted"));
        }
    }

    let sync = &blueprint.sync;
    if sync.retries == 0 {
        warnings.push("sync.retries is 0 - a single rejected batch aborts the run".to_string());
    }
    if sync.workers > sync.batch_size {
        warnings.push(format!(
            "sync.workers ({}) exceeds sync.batch_size ({})",
            sync.workers, sync.batch_size
        ));
    }
    let rate = &blueprint.sensor_api.rate_limit;
    let per_minute = rate.refill_amount as f64 * 60.0 / rate.refill_interval_secs.max(1) as f64;
    if per_minute > VENDOR_REQUESTS_PER_MINUTE {
        warnings.push(format!(
            "sensor_api.rate_limit allows {per_minute:.0} requests/min, \
             above the vendor limit of {VENDOR_REQUESTS_PER_MINUTE:.0}"
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ContextStoreOverrides, SensorApiOverrides};
    use config_loader::{ConfigFormat, ConfigLoader};
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[sensor_api]
organism = "org"

[context_store]
keystone_url = "https://auth.example.org:15001"
orion_url = "https://context.example.org:1026"
service = "smartcity"
subservice = "/parking"

[sync]
retries = 0
"#;

    #[test]
    fn test_warnings_for_missing_secrets_and_plain_http() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();

        let warnings = collect_warnings(&blueprint);
        assert!(warnings.iter().any(|w| w.contains("environment")));
        // default sensor endpoint is plain http
        assert!(warnings.iter().any(|w| w.starts_with("sensor_api.endpoint")));
        assert!(warnings.iter().any(|w| w.starts_with("sync.retries")));
        assert!(!warnings.iter().any(|w| w.contains("rate_limit")));
    }

    #[test]
    fn test_missing_file_reported_invalid() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/parking-syncer.toml"),
            sensor_api: SensorApiOverrides::default(),
            context_store: ContextStoreOverrides::default(),
            json: true,
        };
        let report = ValidationReport::check(&args);
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("File not found"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_report_json_omits_empty_fields() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let report = ValidationReport {
            valid: true,
            config_path: "config.toml".into(),
            error: None,
            warnings: Vec::new(),
            summary: Some(ConfigSummary::from(&blueprint)),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("warnings").is_none());
        assert_eq!(value["summary"]["subservice"], "/parking");
        assert_eq!(value["summary"]["workers"], 8);
    }
}
