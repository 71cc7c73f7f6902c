//! `discover` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use ingestion::SensorApiClient;
use serde::Serialize;
use serde_json::Value;
use sync_engine::Inventory;
use tracing::{debug, info};

use crate::cli::DiscoverArgs;

/// Execute the `discover` command
pub async fn run_discover(args: &DiscoverArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.sensor_api.apply(&mut blueprint);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after overrides")?;

    let api = SensorApiClient::login(&blueprint.sensor_api)
        .await
        .context("Sensor API login failed")?;
    let inventory = sync_engine::discover(&api)
        .await
        .context("Discovery failed")?;
    let parkings = fetch_parkings(&api, &inventory).await?;
    debug!(rate_headroom = api.rate_headroom().await, "Sensor API budget after discovery");

    info!(
        projects = inventory.projects.len(),
        zones = inventory.zone_count(),
        spots = inventory.spot_count(),
        skipped = inventory.skipped_count(),
        parkings = parkings.values().map(BTreeMap::len).sum::<usize>(),
        "Discovery complete"
    );

    let report = DiscoverReport {
        inventory,
        parkings,
    };
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize inventory")?;
        println!("{}", json);
    } else {
        print_inventory(&report);
    }

    Ok(())
}

/// Inventory plus the raw parking records of every project
#[derive(Debug, Serialize)]
struct DiscoverReport {
    #[serde(flatten)]
    inventory: Inventory,
    /// projectid -> pomid -> record
    parkings: BTreeMap<String, BTreeMap<String, Value>>,
}

async fn fetch_parkings(
    api: &SensorApiClient,
    inventory: &Inventory,
) -> Result<BTreeMap<String, BTreeMap<String, Value>>> {
    let mut parkings = BTreeMap::new();
    for project in &inventory.projects {
        let id = &project.project.projectid;
        let records = api
            .parkings(id)
            .await
            .with_context(|| format!("Failed to list parkings of project {id}"))?;
        parkings.insert(id.clone(), records);
    }
    Ok(parkings)
}

fn print_inventory(report: &DiscoverReport) {
    let inventory = &report.inventory;
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Parking Spot Inventory                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    for project in &inventory.projects {
        println!(
            "🏙️  {} ({})",
            project.project.name, project.project.projectid
        );

        let zone_count = project.zones.len();
        for (i, zone) in project.zones.values().enumerate() {
            let prefix = if i + 1 == zone_count { "└─" } else { "├─" };
            println!(
                "   {} {} ({}): {} spots",
                prefix,
                zone.description,
                zone.zoneid,
                project.zone_members(&zone.zoneid).len()
            );
        }

        if !project.skipped.is_empty() {
            println!("   ⚠️  Skipped spots ({}):", project.skipped.len());
            for skipped in &project.skipped {
                println!("      - {}: {}", skipped.pomid, skipped.reason);
            }
        }
        if let Some(records) = report.parkings.get(&project.project.projectid) {
            println!("   🅿️  {} parking records", records.len());
        }
        println!();
    }

    println!(
        "Total: {} projects, {} zones, {} spots ({} skipped)",
        inventory.projects.len(),
        inventory.zone_count(),
        inventory.spot_count(),
        inventory.skipped_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_carries_parkings_beside_projects() {
        let mut records = BTreeMap::new();
        records.insert("10".to_string(), serde_json::json!({"pomid": 10, "sensor_battery": 87}));
        let report = DiscoverReport {
            inventory: Inventory::default(),
            parkings: BTreeMap::from([("1".to_string(), records)]),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["projects"], serde_json::json!([]));
        assert_eq!(json["parkings"]["1"]["10"]["sensor_battery"], 87);
    }
}
