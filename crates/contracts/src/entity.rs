//! Context store wire shapes - Sync Engine output
//!
//! NGSI v2 entities: every attribute is wrapped as `{type, value}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ON_STREET_PARKING_TYPE, PARKING_SPOT_TYPE};

/// Typed NGSI attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute<T> {
    #[serde(rename = "type")]
    pub attr_type: String,
    pub value: T,
}

impl<T> Attribute<T> {
    pub fn new(attr_type: impl Into<String>, value: T) -> Self {
        Self {
            attr_type: attr_type.into(),
            value,
        }
    }
}

impl Attribute<DateTime<Utc>> {
    pub fn date_time(value: DateTime<Utc>) -> Self {
        Self::new("DateTime", value)
    }
}

impl Attribute<String> {
    pub fn text(value: impl Into<String>) -> Self {
        Self::new("Text", value.into())
    }
}

impl Attribute<GeoJson> {
    /// Indexed location attribute
    pub fn geo_json(value: GeoJson) -> Self {
        Self::new("geo:json", value)
    }

    /// Non-indexed geometry; the store indexes a single `geo:json` per entity
    pub fn geox_json(value: GeoJson) -> Self {
        Self::new("geox:json", value)
    }
}

/// GeoJSON geometry, coordinates in `[longitude, latitude]` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

/// Spot status derived from the occupancy code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkingStatus {
    Free,
    Occupied,
    Unknown,
}

impl ParkingStatus {
    pub fn from_occupancy(code: i64) -> Self {
        match code {
            0 => Self::Free,
            1 => Self::Occupied,
            _ => Self::Unknown,
        }
    }
}

/// Per-event patch of a `ParkingSpot` entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: String,

    #[serde(rename = "TimeInstant")]
    pub time_instant: Attribute<DateTime<Utc>>,

    /// Watermark field read back on the next run
    #[serde(rename = "occupancyModified")]
    pub occupancy_modified: Attribute<DateTime<Utc>>,

    pub name: Attribute<String>,

    pub status: Attribute<ParkingStatus>,

    #[serde(rename = "refOnStreetParking")]
    pub ref_on_street_parking: Attribute<String>,

    #[serde(rename = "refDevice")]
    pub ref_device: Attribute<String>,

    pub location: Attribute<GeoJson>,

    /// Raw occupancy code; `null` for erroneous (negative) readings
    pub occupied: Attribute<Option<i64>>,
}

/// Aggregated `OnStreetParking` entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneEntity {
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: String,

    #[serde(rename = "TimeInstant")]
    pub time_instant: Attribute<DateTime<Utc>>,

    pub name: Attribute<String>,

    pub location: Attribute<GeoJson>,

    /// Absent when the zone has no member spots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Attribute<GeoJson>>,

    #[serde(rename = "totalSpotNumber")]
    pub total_spot_number: Attribute<usize>,
}

/// Anything the syncer writes to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entity {
    Spot(EntityUpdate),
    Zone(ZoneEntity),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Spot(update) => &update.id,
            Entity::Zone(zone) => &zone.id,
        }
    }

    pub fn entity_type(&self) -> &str {
        match self {
            Entity::Spot(_) => PARKING_SPOT_TYPE,
            Entity::Zone(_) => ON_STREET_PARKING_TYPE,
        }
    }
}

impl From<EntityUpdate> for Entity {
    fn from(update: EntityUpdate) -> Self {
        Entity::Spot(update)
    }
}

impl From<ZoneEntity> for Entity {
    fn from(zone: ZoneEntity) -> Self {
        Entity::Zone(zone)
    }
}

/// Body of `POST /v2/op/update`
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a> {
    #[serde(rename = "actionType")]
    pub action_type: &'static str,
    pub entities: &'a [Entity],
}

impl<'a> BatchRequest<'a> {
    pub fn append(entities: &'a [Entity]) -> Self {
        Self {
            action_type: "append",
            entities,
        }
    }
}
