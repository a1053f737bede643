//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text; everything in memory is `DateTime<Utc>`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fractional hours from `earlier` to `later` (negative if `later` is earlier)
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}

/// Storage form of a timestamp
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", text, e)))
}

/// Parse an optional stored timestamp
pub fn from_db_opt(text: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    text.map(from_db).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_hours_between_is_fractional_and_signed() {
        let t0 = now();
        assert_eq!(hours_between(t0, t0 + Duration::minutes(90)), 1.5);
        assert_eq!(hours_between(t0 + Duration::hours(2), t0), -2.0);
    }

    #[test]
    fn test_db_text_preserves_microseconds() {
        let ts = now();
        let parsed = from_db(&to_db(&ts)).unwrap();
        assert_eq!(parsed.timestamp_micros(), ts.timestamp_micros());
    }

    #[test]
    fn test_garbage_timestamp_is_error() {
        assert!(from_db("yesterday").is_err());
        assert_eq!(from_db_opt(None).unwrap(), None);
    }
}
