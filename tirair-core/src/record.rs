//! Sensor record types
//!
//! A payload goes through two shapes on its way into the store:
//!
//! ```text
//! "Temperature: 28.5 C, ..."  ──parse──▶  Reading  ──stamp(now)──▶  SensorRecord
//!        (bus text)                    (no timestamp)              (persisted)
//! ```
//!
//! The timestamp is assigned at ingestion time, never taken from the sender,
//! and is truncated to microseconds so that what is written is exactly what
//! is read back.
//!
//! ## Persisted Layout
//!
//! ```json
//! {"timestamp":"2024-05-01T10:00:00.123456Z","temperature":28.5,"humidity":66.0,"raining":false,"valve":"Closed"}
//! ```

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;
use crate::time::truncate_to_micros;

/// Irrigation valve position as reported by the field controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Valve {
    /// Water flowing
    Open,
    /// Water stopped
    Closed,
}

impl Valve {
    /// Canonical persisted spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    /// Whether the valve is open
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for Valve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Valve {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("open") {
            Ok(Self::Open)
        } else if trimmed.eq_ignore_ascii_case("closed") || trimmed.eq_ignore_ascii_case("close") {
            Ok(Self::Closed)
        } else {
            Err(ParseError::InvalidValue {
                field: "valve",
                value: s.to_string(),
            })
        }
    }
}

/// Parse the textual rain flag used on the bus
///
/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, case-insensitively.
pub fn parse_rain_flag(value: &str) -> Result<bool, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ParseError::InvalidValue {
            field: "raining",
            value: value.to_string(),
        }),
    }
}

/// A fully parsed observation still lacking its ingestion timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Rain sensor state
    pub raining: bool,
    /// Valve position
    pub valve: Valve,
}

impl Reading {
    /// Attach the ingestion timestamp, producing a storable record
    pub fn stamp(self, timestamp: DateTime<Utc>) -> SensorRecord {
        SensorRecord {
            timestamp: truncate_to_micros(timestamp),
            temperature: self.temperature,
            humidity: self.humidity,
            raining: self.raining,
            valve: self.valve,
        }
    }
}

/// One stored observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorRecord {
    /// Ingestion instant (UTC, microsecond precision)
    #[serde(with = "iso_micros")]
    pub timestamp: DateTime<Utc>,
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Rain sensor state
    pub raining: bool,
    /// Valve position
    pub valve: Valve,
}

impl SensorRecord {
    /// Drop the timestamp, recovering the parsed reading
    pub fn reading(&self) -> Reading {
        Reading {
            temperature: self.temperature,
            humidity: self.humidity,
            raining: self.raining,
            valve: self.valve,
        }
    }
}

/// Identifier returned by a store insert
///
/// Sequential per store: the n-th record ever written gets id `n - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Serde adapter for ISO-8601 UTC timestamps with microsecond fractions
///
/// Writes `2024-05-01T10:00:00.123456Z`; reads any RFC 3339 timestamp and
/// normalizes it to UTC.
pub mod iso_micros {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as RFC 3339 with six fractional digits and a `Z` suffix
    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Deserialize any RFC 3339 timestamp into UTC
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
