//! Vendor records - Ingestion output
//!
//! Raw project / zone / device / spot records and per-spot occupancy events
//! as served by the parking sensor API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity type of a per-spot update in the context store
pub const PARKING_SPOT_TYPE: &str = "ParkingSpot";

/// Entity type of an aggregated zone in the context store
pub const ON_STREET_PARKING_TYPE: &str = "OnStreetParking";

/// Project owning zones and spots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "lenient::string")]
    pub projectid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// IANA timezone name, informational only
    #[serde(default)]
    pub timezone: String,
}

/// On-street parking zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(deserialize_with = "lenient::string")]
    pub zoneid: String,

    #[serde(default)]
    pub description: String,

    /// North-east corner latitude
    #[serde(deserialize_with = "lenient::f64")]
    pub lat_ne: f64,

    /// South-west corner latitude
    #[serde(deserialize_with = "lenient::f64")]
    pub lat_sw: f64,

    /// North-east corner longitude
    #[serde(deserialize_with = "lenient::f64")]
    pub long_ne: f64,

    /// South-west corner longitude
    #[serde(deserialize_with = "lenient::f64")]
    pub long_sw: f64,
}

impl Zone {
    /// Context store entity id
    pub fn entity_id(&self) -> String {
        zone_entity_id(&self.zoneid)
    }

    /// Midpoint of the bounding corners as `(latitude, longitude)`
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.lat_ne + self.lat_sw) / 2.0,
            (self.long_ne + self.long_sw) / 2.0,
        )
    }
}

/// Physical element linking a spot to its zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(deserialize_with = "lenient::string")]
    pub elementid: String,

    /// Owning zone. Filled from the listing context when the API omits it.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub zoneid: Option<String>,
}

impl Device {
    /// Context store entity id
    pub fn entity_id(&self) -> String {
        format!("elementid:{}", self.elementid)
    }
}

/// Parking spot (POM)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    #[serde(deserialize_with = "lenient::string")]
    pub pomid: String,

    #[serde(default)]
    pub name: String,

    #[serde(deserialize_with = "lenient::f64")]
    pub latitude: f64,

    #[serde(deserialize_with = "lenient::f64")]
    pub longitude: f64,

    /// Associated device; a spot without one cannot be synchronized
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub elementid: Option<String>,
}

impl Spot {
    /// Context store entity id
    pub fn entity_id(&self) -> String {
        spot_entity_id(&self.pomid)
    }
}

/// Context store entity id for a spot
pub fn spot_entity_id(pomid: &str) -> String {
    format!("pomid:{pomid}")
}

/// Context store entity id for a zone
pub fn zone_entity_id(zoneid: &str) -> String {
    format!("zoneid:{zoneid}")
}

/// Timestamped occupancy reading of one spot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub pomid: String,
    pub timestamp: DateTime<Utc>,
    /// 0 = free, 1 = occupied, other non-negative = unknown, negative = erroneous
    pub value: i64,
}

/// `vehicle_ctrl` phenomenon record as returned by the events endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PhenomenonRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub pomid: String,

    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Single measurement inside a phenomenon record
#[derive(Debug, Clone, Deserialize)]
pub struct Measurement {
    /// Epoch milliseconds
    #[serde(deserialize_with = "lenient::i64")]
    pub lstamp: i64,

    #[serde(deserialize_with = "lenient::i64")]
    pub value: i64,
}

impl PhenomenonRecord {
    /// Flatten into events, truncating timestamps to whole seconds
    pub fn into_events(self) -> impl Iterator<Item = Event> {
        let pomid = self.pomid;
        self.measurements.into_iter().filter_map(move |m| {
            DateTime::from_timestamp(m.lstamp.div_euclid(1000), 0).map(|timestamp| Event {
                pomid: pomid.clone(),
                timestamp,
                value: m.value,
            })
        })
    }
}

/// Render a JSON scalar as a map key (strings verbatim, numbers in decimal)
pub fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The sensor API mixes strings and numbers for ids and coordinates.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Str(String),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Str(s) => s,
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
        Scalar::deserialize(de).map(Scalar::into_string)
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(de)?
            .map(Scalar::into_string)
            .filter(|s| !s.is_empty()))
    }

    pub fn f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        match Scalar::deserialize(de)? {
            Scalar::Int(i) => Ok(i as f64),
            Scalar::Float(f) => Ok(f),
            Scalar::Str(s) => s.trim().parse().map_err(D::Error::custom),
        }
    }

    pub fn i64<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
        match Scalar::deserialize(de)? {
            Scalar::Int(i) => Ok(i),
            Scalar::Float(f) => Ok(f.trunc() as i64),
            Scalar::Str(s) => s.trim().parse().map_err(D::Error::custom),
        }
    }
}
