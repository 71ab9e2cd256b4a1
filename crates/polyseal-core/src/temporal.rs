//! # Temporal Types: UTC Second-Precision Timestamps
//!
//! Defines `Timestamp`, a UTC timestamp truncated to whole seconds and bounded
//! below by the Unix epoch. Execution times and last-execution times enter
//! the circuit as unsigned seconds, so pre-epoch instants are rejected at
//! construction rather than at witness time.
//!
//! Serialized as `YYYY-MM-DDTHH:MM:SSZ`. Deserialization additionally accepts
//! an integer number of Unix seconds and RFC 3339 strings with any offset.

use chrono::{DateTime, Timelike, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A UTC timestamp, truncated to seconds, not before 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Result<Self, ValidationError> {
        if dt.timestamp() < 0 {
            return Err(ValidationError::InvalidTimestamp(format!(
                "{dt} is before the Unix epoch"
            )));
        }
        Ok(Self(truncate_to_seconds(dt)))
    }

    pub fn from_unix_seconds(secs: u64) -> Result<Self, ValidationError> {
        let signed = i64::try_from(secs)
            .map_err(|_| ValidationError::InvalidTimestamp(format!("{secs} out of range")))?;
        DateTime::from_timestamp(signed, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp(format!("{secs} out of range")))
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s.trim()).map_err(|e| {
            ValidationError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Self::from_utc(dt.with_timezone(&Utc))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> u64 {
        u64::try_from(self.0.timestamp()).unwrap_or(0)
    }

    /// Hour of day in UTC, 0–23.
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Whole seconds elapsed since `earlier`, or `None` if `earlier` is later.
    pub fn seconds_since(&self, earlier: &Timestamp) -> Option<u64> {
        self.unix_seconds().checked_sub(earlier.unix_seconds())
    }

    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an RFC 3339 timestamp or unix seconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
        Timestamp::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
        Timestamp::from_unix_seconds(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
        let secs = u64::try_from(v).map_err(|_| E::custom(format!("{v} is before the Unix epoch")))?;
        Timestamp::from_unix_seconds(secs).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}
