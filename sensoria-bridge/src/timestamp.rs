use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses a timestamp as emitted by the bridge.
///
/// The bridge stamps signals with its local wall-clock time and no offset (e.g.
/// `2025-01-01T12:00:00.123456`). Such values are interpreted in the local timezone. RFC 3339
/// values carrying an explicit offset are accepted as well.
///
/// Returns `None` if the value matches neither form, or if a naive value is ambiguous in the
/// local timezone.
pub fn parse_bridge_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, NAIVE_FORMAT).ok()?;

    Local
        .from_local_datetime(&naive)
        .single()
        .map(|time| time.with_timezone(&Utc))
}
