// Date and time handling
// Dates compare against numbers and strings via their epoch-millisecond value

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a date string into a UTC instant.
///
/// Accepts RFC 3339 / ISO 8601 first, then a few common date-only and
/// space-separated fallbacks (interpreted as UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Parse a date string to its linear time value in milliseconds since the
/// epoch; NaN when the string is not a recognizable date.
pub fn parse_millis(s: &str) -> f64 {
    parse_date(s)
        .map(|dt| dt.timestamp_millis() as f64)
        .unwrap_or(f64::NAN)
}

/// Milliseconds since the epoch for a UTC instant.
pub fn to_millis(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64
}

/// UTC instant for a millisecond epoch value, if representable.
pub fn from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Format a UTC instant as an ISO 8601 string with millisecond precision.
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
