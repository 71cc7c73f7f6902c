//! Discovery: projects, zones, devices and spots joined into sync plans

use std::collections::BTreeMap;
use std::fmt;

use contracts::{Device, Project, SensorApi, Spot, SyncError, Zone};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Why a spot cannot be synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The spot lists no device
    NoDevice,
    /// The spot's device is not attached to any zone of the project
    UnknownDevice,
    /// The device is known but carries no zone
    DeviceWithoutZone,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoDevice => "spot has no device",
            SkipReason::UnknownDevice => "device not found in any zone",
            SkipReason::DeviceWithoutZone => "device has no zone",
        };
        f.write_str(text)
    }
}

/// A spot ready to be synchronized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotPlan {
    pub project_id: String,
    pub spot: Spot,
    pub device: Device,
    pub zone_id: String,
}

/// A spot left out of the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSpot {
    pub project_id: String,
    pub pomid: String,
    pub reason: SkipReason,
}

/// Everything discovered for one project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInventory {
    pub project: Project,
    pub zones: BTreeMap<String, Zone>,
    /// Devices of every zone, keyed by `elementid`
    pub devices: BTreeMap<String, Device>,
    pub plans: Vec<SpotPlan>,
    pub skipped: Vec<SkippedSpot>,
}

impl ProjectInventory {
    /// Planned spots belonging to `zone_id`
    pub fn zone_members(&self, zone_id: &str) -> Vec<&Spot> {
        self.plans
            .iter()
            .filter(|plan| plan.zone_id == zone_id)
            .map(|plan| &plan.spot)
            .collect()
    }
}

/// Discovery result across all projects
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    pub projects: Vec<ProjectInventory>,
}

impl Inventory {
    pub fn zone_count(&self) -> usize {
        self.projects.iter().map(|p| p.zones.len()).sum()
    }

    pub fn spot_count(&self) -> usize {
        self.projects
            .iter()
            .map(|p| p.plans.len() + p.skipped.len())
            .sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.projects.iter().map(|p| p.skipped.len()).sum()
    }

    /// All sync plans in discovery order
    pub fn plans(&self) -> impl Iterator<Item = &SpotPlan> {
        self.projects.iter().flat_map(|p| p.plans.iter())
    }
}

/// List every project, then its zones, devices and spots.
///
/// Listing failures are fatal: the run cannot proceed without them.
#[instrument(name = "inventory_discover", skip(api))]
pub async fn discover<A: SensorApi + Sync>(api: &A) -> Result<Inventory, SyncError> {
    let projects = api.projects().await?;
    let mut inventory = Inventory::default();

    for (project_id, project) in projects {
        let zones = api.zones(&project_id).await?;

        let mut devices = BTreeMap::new();
        for zone_id in zones.keys() {
            devices.extend(api.devices(&project_id, zone_id).await?);
        }

        let spots = api.spots(&project_id).await?;
        let (plans, skipped) = join_spots(&project_id, spots, &devices);

        info!(
            project = %project_id,
            zones = zones.len(),
            devices = devices.len(),
            spots = plans.len(),
            skipped = skipped.len(),
            "project discovered"
        );

        inventory.projects.push(ProjectInventory {
            project,
            zones,
            devices,
            plans,
            skipped,
        });
    }

    Ok(inventory)
}

/// Attach each spot to its device and zone
fn join_spots(
    project_id: &str,
    spots: BTreeMap<String, Spot>,
    devices: &BTreeMap<String, Device>,
) -> (Vec<SpotPlan>, Vec<SkippedSpot>) {
    let mut plans = Vec::with_capacity(spots.len());
    let mut skipped = Vec::new();

    for (pomid, spot) in spots {
        let joined = match spot.elementid.as_deref() {
            None => Err(SkipReason::NoDevice),
            Some(elementid) => match devices.get(elementid) {
                None => Err(SkipReason::UnknownDevice),
                Some(device) => device
                    .zoneid
                    .clone()
                    .map(|zone_id| (device.clone(), zone_id))
                    .ok_or(SkipReason::DeviceWithoutZone),
            },
        };

        match joined {
            Ok((device, zone_id)) => {
                debug!(pomid = %pomid, zone = %zone_id, "spot planned");
                plans.push(SpotPlan {
                    project_id: project_id.to_string(),
                    spot,
                    device,
                    zone_id,
                });
            }
            Err(reason) => {
                warn!(project = %project_id, pomid = %pomid, %reason, "spot skipped");
                observability::record_spot_skipped(reason.as_label());
                skipped.push(SkippedSpot {
                    project_id: project_id.to_string(),
                    pomid,
                    reason,
                });
            }
        }
    }

    (plans, skipped)
}

impl SkipReason {
    /// Metric label
    pub fn as_label(&self) -> &'static str {
        match self {
            SkipReason::NoDevice => "no_device",
            SkipReason::UnknownDevice => "unknown_device",
            SkipReason::DeviceWithoutZone => "device_without_zone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion::MockSensorApi;

    fn project() -> Project {
        Project {
            projectid: "P1".into(),
            name: "Centre".into(),
            description: String::new(),
            timezone: "Europe/Madrid".into(),
        }
    }

    fn zone(id: &str) -> Zone {
        Zone {
            zoneid: id.into(),
            description: format!("zone {id}"),
            lat_ne: 41.1,
            lat_sw: 41.0,
            long_ne: 2.1,
            long_sw: 2.0,
        }
    }

    fn spot(pomid: &str, elementid: Option<&str>) -> Spot {
        Spot {
            pomid: pomid.into(),
            name: format!("spot {pomid}"),
            latitude: 41.05,
            longitude: 2.05,
            elementid: elementid.map(str::to_string),
        }
    }

    fn device(elementid: &str) -> Device {
        Device {
            elementid: elementid.into(),
            zoneid: None,
        }
    }

    #[tokio::test]
    async fn test_spots_join_devices_across_zones() {
        let api = MockSensorApi::new()
            .with_project(project())
            .with_zone("P1", zone("Z1"))
            .with_zone("P1", zone("Z2"))
            .with_device("P1", "Z1", device("E1"))
            .with_device("P1", "Z2", device("E2"))
            .with_spot("P1", spot("1", Some("E1")))
            .with_spot("P1", spot("2", Some("E2")));

        let inventory = discover(&api).await.unwrap();
        assert_eq!(inventory.zone_count(), 2);
        let plans: Vec<_> = inventory.plans().collect();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].zone_id, "Z1");
        assert_eq!(plans[1].zone_id, "Z2");
        assert_eq!(inventory.projects[0].zone_members("Z2").len(), 1);
    }

    #[tokio::test]
    async fn test_spots_without_usable_device_are_skipped() {
        let api = MockSensorApi::new()
            .with_project(project())
            .with_zone("P1", zone("Z1"))
            .with_device("P1", "Z1", device("E1"))
            .with_spot("P1", spot("1", Some("E1")))
            .with_spot("P1", spot("2", None))
            .with_spot("P1", spot("3", Some("E404")));

        let inventory = discover(&api).await.unwrap();
        assert_eq!(inventory.spot_count(), 3);
        assert_eq!(inventory.skipped_count(), 2);

        let skipped = &inventory.projects[0].skipped;
        assert_eq!(skipped[0].pomid, "2");
        assert_eq!(skipped[0].reason, SkipReason::NoDevice);
        assert_eq!(skipped[1].pomid, "3");
        assert_eq!(skipped[1].reason, SkipReason::UnknownDevice);
    }

    #[test]
    fn test_device_without_zone_is_skipped() {
        let mut devices = BTreeMap::new();
        devices.insert("E1".to_string(), device("E1"));
        let spots = BTreeMap::from([("1".to_string(), spot("1", Some("E1")))]);

        let (plans, skipped) = join_spots("P1", spots, &devices);
        assert!(plans.is_empty());
        assert_eq!(skipped[0].reason, SkipReason::DeviceWithoutZone);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let api = MockSensorApi::new()
            .with_project(project())
            .failing_listing("zones");
        let err = discover(&api).await.unwrap_err();
        assert!(matches!(err, SyncError::Endpoint { .. }));
    }
}
