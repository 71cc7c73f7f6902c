//! Vendor records → context store entities
//!
//! Pure functions. The sensor API stores coordinates as (latitude, longitude);
//! every emitted geometry is `[longitude, latitude]`.

use chrono::{DateTime, Utc};
use contracts::{
    zone_entity_id, Attribute, Device, Entity, EntityUpdate, Event, GeoJson, ParkingStatus, Spot,
    Zone, ZoneEntity, ON_STREET_PARKING_TYPE, PARKING_SPOT_TYPE,
};

use crate::geometry::coverage_rectangle;

/// Build the `ParkingSpot` patch for one occupancy event
pub fn to_entity_update(
    spot: &Spot,
    device: &Device,
    zone_id: &str,
    event: &Event,
) -> EntityUpdate {
    // negative codes are erroneous readings
    let occupied = (event.value >= 0).then_some(event.value);

    EntityUpdate {
        id: spot.entity_id(),
        entity_type: PARKING_SPOT_TYPE.to_string(),
        time_instant: Attribute::date_time(event.timestamp),
        occupancy_modified: Attribute::date_time(event.timestamp),
        name: Attribute::text(spot.name.clone()),
        status: Attribute::new("Text", ParkingStatus::from_occupancy(event.value)),
        ref_on_street_parking: Attribute::text(zone_entity_id(zone_id)),
        ref_device: Attribute::text(device.entity_id()),
        location: Attribute::geo_json(GeoJson::Point {
            coordinates: [spot.longitude, spot.latitude],
        }),
        occupied: Attribute::new("Number", occupied),
    }
}

/// Ordered updates of one spot, one per event
pub fn spot_updates(spot: &Spot, device: &Device, zone_id: &str, events: &[Event]) -> Vec<Entity> {
    events
        .iter()
        .map(|event| to_entity_update(spot, device, zone_id, event).into())
        .collect()
}

/// Build the aggregated `OnStreetParking` entity of a zone
pub fn to_zone_entity(zone: &Zone, members: &[&Spot], timestamp: DateTime<Utc>) -> ZoneEntity {
    let (lat, lon) = zone.centroid();
    let points: Vec<(f64, f64)> = members.iter().map(|s| (s.latitude, s.longitude)).collect();
    let polygon = coverage_rectangle(&points).map(|ring| {
        Attribute::geox_json(GeoJson::Polygon {
            coordinates: vec![ring],
        })
    });

    ZoneEntity {
        id: zone.entity_id(),
        entity_type: ON_STREET_PARKING_TYPE.to_string(),
        time_instant: Attribute::date_time(timestamp),
        name: Attribute::text(zone.description.clone()),
        location: Attribute::geo_json(GeoJson::Point {
            coordinates: [lon, lat],
        }),
        polygon,
        total_spot_number: Attribute::new("Number", members.len()),
    }
}
