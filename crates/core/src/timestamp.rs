//! Timestamp parsing for token expiry values
//!
//! RFC 3339 is canonical and always used when writing. Reading also accepts
//! the numeric-offset form `2999-01-01T00:00:00+0000` some backend versions
//! emit.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

const NUMERIC_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parse an expiry timestamp into UTC
pub fn parse(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, NUMERIC_OFFSET_FORMAT))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::invalid_timestamp(trimmed).with_source(e))
}

/// Format a timestamp in the canonical form
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serde adapter for `DateTime<Utc>` fields that arrive in either format
pub mod serde_lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse("2999-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_numeric_offset() {
        let parsed = parse("2024-06-01T12:00:00+0200").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("yesterday").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_format_is_canonical() {
        let value = Utc.with_ymd_and_hms(2030, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format(&value), "2030-03-04T05:06:07Z");
        assert_eq!(parse(&format(&value)).unwrap(), value);
    }

    proptest::proptest! {
        #[test]
        fn prop_canonical_form_reparses(secs in 0i64..32_503_680_000) {
            let value = Utc.timestamp_opt(secs, 0).unwrap();
            proptest::prop_assert_eq!(parse(&format(&value)).unwrap(), value);
        }
    }
}
