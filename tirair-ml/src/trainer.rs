//! Batch training over the full record corpus
//!
//! ## Pipeline
//!
//! ```text
//! query_all() ──► FeatureBuilder ──► StandardScaler::fit ──► LinearRegression::fit
//!                 (time_diff_hours)   (temperature)           (z → hours)
//!                                                                   │
//!                                           ArtifactStore::save ◄───┘
//! ```
//!
//! Every run is an independent full recompute from a snapshot of the store.
//! There is no incremental state, so identical corpora produce bit-identical
//! parameters. A run that fails at any stage writes nothing.

use chrono::{DateTime, Utc};
use tirair_core::{FeatureBuilder, LeadingGap, RecordStore, SensorRecord, TimeSource};

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::errors::{TrainError, TrainResult};
use crate::regression::LinearRegression;
use crate::scaler::StandardScaler;

/// Smallest corpus the trainer accepts
///
/// Applies to fitted rows as well: a leading-gap policy that drops rows
/// raises the record count needed.
pub const MIN_TRAINING_RECORDS: usize = 2;

/// Summary of a completed training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Records read from the store
    pub records: usize,
    /// Feature rows fitted
    pub samples: usize,
    /// Rows whose interval was clamped from negative to zero
    pub clamped: usize,
    /// The persisted estimator
    pub artifact: ModelArtifact,
}

/// Fits the irrigation interval estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct Trainer {
    features: FeatureBuilder,
}

impl Trainer {
    /// Trainer with the zero-fill leading-gap policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose how the earliest record is treated
    pub fn with_leading_gap(mut self, policy: LeadingGap) -> Self {
        self.features = self.features.with_leading_gap(policy);
        self
    }

    /// Active leading-gap policy
    pub fn leading_gap(&self) -> LeadingGap {
        self.features.leading_gap()
    }

    /// Fit on an ordered record sequence without persisting
    pub fn fit(
        &self,
        records: &[SensorRecord],
        trained_at: DateTime<Utc>,
    ) -> TrainResult<TrainingReport> {
        if records.len() < MIN_TRAINING_RECORDS {
            return Err(TrainError::InsufficientData {
                required: MIN_TRAINING_RECORDS,
                available: records.len(),
            });
        }

        let features = self.features.build(records);
        if features.len() < MIN_TRAINING_RECORDS {
            let dropped = records.len() - features.len();
            return Err(TrainError::InsufficientData {
                required: MIN_TRAINING_RECORDS + dropped,
                available: records.len(),
            });
        }
        let temperatures = features.temperatures();
        let targets = features.targets();

        let scaler = StandardScaler::fit(&temperatures).ok_or(TrainError::InsufficientData {
            required: MIN_TRAINING_RECORDS,
            available: records.len(),
        })?;
        if !scaler.is_valid() {
            return Err(TrainError::NumericFailure(format!(
                "temperature scaler is not finite (mean {}, scale {})",
                scaler.mean, scaler.scale
            )));
        }

        let standardized = scaler.transform_all(&temperatures);
        let regression = LinearRegression::fit(&standardized, &targets)
            .ok_or_else(|| TrainError::NumericFailure("empty feature set".into()))?;
        if !regression.is_valid() {
            return Err(TrainError::NumericFailure(format!(
                "regression is not finite (coefficient {}, intercept {})",
                regression.coefficient, regression.intercept
            )));
        }

        Ok(TrainingReport {
            records: records.len(),
            samples: features.len(),
            clamped: features.clamped,
            artifact: ModelArtifact::new(scaler, regression, trained_at, features.len()),
        })
    }

    /// Snapshot the store, fit, and atomically replace the artifact
    pub fn run<S>(
        &self,
        store: &S,
        artifacts: &ArtifactStore,
        clock: &dyn TimeSource,
    ) -> TrainResult<TrainingReport>
    where
        S: RecordStore + ?Sized,
    {
        let records = store.query_all()?;
        log::debug!("training on {} record(s)", records.len());

        let report = self.fit(&records, clock.now())?;
        artifacts.save(&report.artifact)?;

        log::info!(
            "trained on {} record(s): mean={:.4} scale={:.4} coefficient={:.6} intercept={:.6}",
            report.samples,
            report.artifact.scaler.mean,
            report.artifact.scaler.scale,
            report.artifact.regression.coefficient,
            report.artifact.regression.intercept
        );
        if report.clamped > 0 {
            log::warn!(
                "{} out-of-order record(s) had their interval clamped to zero",
                report.clamped
            );
        }

        Ok(report)
    }
}
