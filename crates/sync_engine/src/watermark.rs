//! Per-spot watermark resolution

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::Value;

/// Start of the fetch window for a spot.
///
/// `occupancyModified.value` of the stored entity when present and parseable,
/// otherwise `now - lookback`.
pub fn resolve_watermark(
    entity: Option<&Value>,
    now: DateTime<Utc>,
    lookback: Duration,
) -> DateTime<Utc> {
    entity
        .and_then(|e| e.pointer("/occupancyModified/value"))
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now - lookback)
}

/// RFC 3339, or a naive ISO timestamp taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
