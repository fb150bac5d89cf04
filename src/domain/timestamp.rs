//! Fixed-pattern timestamps exchanged between backends
//!
//! Every backend reads and writes `updated_at`/`created_at` as
//! `YYYY-MM-DD HH:MM:SS` strings. [`SyncTimestamp`] is the parsed form and is
//! also the watermark cursor type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical timestamp pattern (`YYYY-MM-DD HH:MM:SS`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Same pattern in Postgres `TO_CHAR` syntax
pub const TIMESTAMP_FORMAT_PG: &str = "YYYY-MM-DD HH24:MI:SS";

/// Same pattern in Elasticsearch date-format syntax
pub const TIMESTAMP_FORMAT_ES: &str = "yyyy-MM-dd HH:mm:ss";

const ACCEPTED_NAIVE_FORMATS: [&str; 4] = [
    TIMESTAMP_FORMAT,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A second-precision timestamp in the shared exchange format
///
/// # Examples
///
/// ```
/// use reel::domain::SyncTimestamp;
/// use std::str::FromStr;
///
/// let ts = SyncTimestamp::from_str("2024-03-01 12:30:00").unwrap();
/// assert_eq!(ts.to_string(), "2024-03-01 12:30:00");
/// assert!(SyncTimestamp::min() < ts);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncTimestamp(NaiveDateTime);

impl SyncTimestamp {
    /// The minimum representable timestamp, `0001-01-01 00:00:00`.
    ///
    /// Used as the watermark when no marker has been committed yet.
    pub fn min() -> Self {
        let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
        Self(NaiveDateTime::new(date, NaiveTime::default()))
    }

    /// Wrap a naive datetime, truncating sub-second precision
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value.with_nanosecond(0).unwrap_or(value))
    }

    /// Parse a timestamp string
    ///
    /// Accepts the canonical pattern, ISO `T`-separated variants with optional
    /// fractional seconds, and RFC 3339 values with an offset (normalised to
    /// UTC).
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        for format in ACCEPTED_NAIVE_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Self::from_naive(parsed));
            }
        }
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self::from_naive(dt.naive_utc()))
            .map_err(|_| format!("Invalid timestamp '{value}', expected YYYY-MM-DD HH:MM:SS"))
    }

    /// Underlying naive datetime
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl Default for SyncTimestamp {
    fn default() -> Self {
        Self::min()
    }
}

impl fmt::Display for SyncTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for SyncTimestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SyncTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SyncTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_min_formats_like_python_datetime_min() {
        assert_eq!(SyncTimestamp::min().to_string(), "0001-01-01 00:00:00");
    }

    #[test_case("2024-01-02 03:04:05" ; "canonical")]
    #[test_case("2024-01-02 03:04:05.678" ; "fractional")]
    #[test_case("2024-01-02T03:04:05" ; "iso separator")]
    #[test_case("2024-01-02T03:04:05+00:00" ; "rfc3339")]
    fn test_parse_normalises(input: &str) {
        let ts = SyncTimestamp::parse(input).unwrap();
        assert_eq!(ts.to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_rfc3339_offset_converted_to_utc() {
        let ts = SyncTimestamp::parse("2024-01-02T05:04:05+02:00").unwrap();
        assert_eq!(ts.to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SyncTimestamp::parse("yesterday").is_err());
        assert!(SyncTimestamp::parse("").is_err());
    }

    #[test]
    fn test_ordering() {
        let a = SyncTimestamp::parse("2024-01-01 00:00:00").unwrap();
        let b = SyncTimestamp::parse("2024-01-01 00:00:01").unwrap();
        assert!(a < b);
        assert!(SyncTimestamp::min() < a);
    }

    #[test]
    fn test_serde_as_string() {
        let ts = SyncTimestamp::parse("2024-06-30 23:59:59").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-06-30 23:59:59\"");
        let back: SyncTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
