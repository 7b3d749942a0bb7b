//! Feature derivation for irrigation forecasting
//!
//! The trainer learns "hours until the next event" from the spacing between
//! consecutive stored records. This module turns a timestamp-ordered record
//! sequence into that training target.
//!
//! ## Policies
//!
//! ### Leading gap
//!
//! The earliest record of a corpus has no predecessor, so it has no observed
//! interval. `LeadingGap` names what happens to it:
//! - `ZeroFill` (default): the record is kept with `time_diff_hours = 0`
//! - `Exclude`: the record is dropped from the feature set
//!
//! ### Negative intervals
//!
//! Clock adjustments and backfilled data can make a record older than its
//! predecessor. Negative durations are not meaningful waits, so every
//! interval is clamped at zero. The number of clamped rows is reported.

use chrono::{DateTime, Utc};

use crate::record::SensorRecord;
use crate::time::hours_between;

/// Treatment of the first record, which has no observed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadingGap {
    /// Keep the first record with an interval of zero hours
    #[default]
    ZeroFill,
    /// Drop the first record from the feature set
    Exclude,
}

/// One training row derived from a stored record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    /// Timestamp of the source record
    pub timestamp: DateTime<Utc>,
    /// Temperature of the source record (regression input)
    pub temperature: f64,
    /// Hours since the previous record, never negative (regression target)
    pub time_diff_hours: f64,
}

/// Output of a feature build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    /// Derived rows in input order
    pub rows: Vec<FeatureRecord>,
    /// Rows whose raw interval was negative and clamped to zero
    pub clamped: usize,
}

impl Features {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were derived
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Regression inputs
    pub fn temperatures(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.temperature).collect()
    }

    /// Regression targets
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time_diff_hours).collect()
    }
}

/// Derives interval features from an ordered record sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    leading_gap: LeadingGap,
}

impl FeatureBuilder {
    /// Builder with the default zero-fill policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose how the first record is treated
    pub fn with_leading_gap(mut self, policy: LeadingGap) -> Self {
        self.leading_gap = policy;
        self
    }

    /// Active leading-gap policy
    pub fn leading_gap(&self) -> LeadingGap {
        self.leading_gap
    }

    /// Derive one feature row per record (minus the first under `Exclude`)
    ///
    /// Input is expected in timestamp-ascending order, as returned by
    /// `RecordStore::query_all`; out-of-order pairs are clamped, not reordered.
    pub fn build(&self, records: &[SensorRecord]) -> Features {
        let mut features = Features {
            rows: Vec::with_capacity(records.len()),
            clamped: 0,
        };

        let Some(first) = records.first() else {
            return features;
        };

        if self.leading_gap == LeadingGap::ZeroFill {
            features.rows.push(FeatureRecord {
                timestamp: first.timestamp,
                temperature: first.temperature,
                time_diff_hours: 0.0,
            });
        }

        for pair in records.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            let raw = hours_between(previous.timestamp, current.timestamp);

            let time_diff_hours = if raw < 0.0 {
                features.clamped += 1;
                0.0
            } else {
                raw
            };

            features.rows.push(FeatureRecord {
                timestamp: current.timestamp,
                temperature: current.temperature,
                time_diff_hours,
            });
        }

        if features.clamped > 0 {
            log::debug!(
                "clamped {} negative interval(s) to zero while building features",
                features.clamped
            );
        }

        features
    }
}

/// Interval of each record since its predecessor, zero-filled and clamped
pub fn time_diff_hours(records: &[SensorRecord]) -> Vec<f64> {
    FeatureBuilder::new().build(records).targets()
}
