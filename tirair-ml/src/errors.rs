//! Error types for training, artifact persistence and prediction
//!
//! ## Operational Consequences
//!
//! - `TrainError`: the run is aborted, no artifact is written and any prior
//!   artifact stays in place. The operator sees a non-zero exit.
//! - `ArtifactError`: the artifact could not be read or written. A missing
//!   artifact is its own variant so callers can withhold a prediction
//!   without treating it as a fault.
//! - `PredictError`: no prediction is shown; current readings still are.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tirair_core::StorageError;

/// Result type for training
pub type TrainResult<T> = Result<T, TrainError>;

/// Result type for artifact I/O
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Result type for prediction
pub type PredictResult<T> = Result<T, PredictError>;

/// Training failures
#[derive(Error, Debug)]
pub enum TrainError {
    /// Fewer records than the estimator needs
    #[error("insufficient data: need at least {required} records, have {available}")]
    InsufficientData {
        /// Minimum corpus size
        required: usize,
        /// Records actually available
        available: usize,
    },

    /// Fitting produced a non-finite parameter
    #[error("numeric failure during fit: {0}")]
    NumericFailure(String),

    /// The record store could not be read
    #[error("failed to read training corpus: {0}")]
    Storage(#[from] StorageError),

    /// The fitted artifact could not be persisted
    #[error("failed to persist artifact: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Artifact load/save failures
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// No training run has ever persisted an artifact here
    #[error("no model artifact at {}", path.display())]
    NoArtifact {
        /// Expected artifact location
        path: PathBuf,
    },

    /// The document exists but cannot be trusted
    #[error("corrupt model artifact: {0}")]
    Corrupt(String),

    /// The document is of another format or schema version
    #[error("unsupported model artifact `{format}` version {version}")]
    UnsupportedVersion {
        /// Declared format tag
        format: String,
        /// Declared schema version
        version: u64,
    },

    /// Filesystem failure
    #[error("artifact I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Prediction failures
#[derive(Error, Debug)]
pub enum PredictError {
    /// Nothing was ever trained
    #[error("no trained model available")]
    NoArtifact,

    /// The store holds no reading to score
    #[error("no sensor readings available")]
    NoReadings,

    /// Input temperature was NaN or infinite
    #[error("temperature must be finite, got {0}")]
    InvalidInput(f64),

    /// The artifact exists but could not be used
    #[error(transparent)]
    Artifact(ArtifactError),

    /// The record store could not be read
    #[error("failed to read latest reading: {0}")]
    Storage(#[from] StorageError),
}

impl From<ArtifactError> for PredictError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NoArtifact { .. } => PredictError::NoArtifact,
            other => PredictError::Artifact(other),
        }
    }
}
