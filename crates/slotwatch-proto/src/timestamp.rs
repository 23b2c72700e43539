//! ISO-8601 timestamp handling.
//!
//! The monitor service formats times with Python's `datetime.isoformat()` on
//! naive UTC values, so most timestamps arrive without an offset
//! (`2024-01-01T12:00:00.123456`). Offset-qualified RFC 3339 values are also
//! accepted. Naive values are interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an ISO-8601 timestamp, with or without a UTC offset.
///
/// Returns `None` for anything else; callers decide on the fallback.
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).ok().map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde helper for optional lenient timestamps.
///
/// Unparseable strings become `None` instead of failing the whole record: a
/// bad `created_at` should not hide an otherwise valid monitor.
pub fn deserialize_opt<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_iso8601))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn parses_rfc3339_with_zulu() {
        let ts = parse_iso8601("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_iso8601("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn parses_naive_python_isoformat_as_utc() {
        let ts = parse_iso8601("2024-03-05T10:11:12.345678").unwrap();
        assert_eq!(ts.day(), 5);
        assert_eq!(ts.minute(), 11);
        assert_eq!(ts.nanosecond(), 345_678_000);
    }

    #[test]
    fn parses_naive_without_fraction() {
        let ts = parse_iso8601("2024-03-05T10:11:12").unwrap();
        assert_eq!(ts.second(), 12);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_iso8601("yesterday").is_none());
        assert!(parse_iso8601("").is_none());
    }
}
