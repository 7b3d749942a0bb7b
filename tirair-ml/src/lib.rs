//! Irrigation interval estimation for TirAir
//!
//! ## Overview
//!
//! The estimator answers one question for the dashboard: given the current
//! temperature, how many hours until the next irrigation event? It is fitted
//! on the spacing between stored records.
//!
//! ## Model
//!
//! ```text
//! z = (temperature - mean) / scale          standardization (population std)
//! h = coefficient * z + intercept           one-variable OLS
//! exposed = max(h, 0)                       never a negative wait
//! ```
//!
//! Training is a batch job, separate from ingestion. It shares nothing with
//! the ingestion process except the record store and the artifact file.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tirair_core::{JsonLinesStore, SystemClock};
//! use tirair_ml::{ArtifactStore, Predictor, Trainer};
//!
//! let store = JsonLinesStore::open("data/sensor_data.jsonl")?;
//! let artifacts = ArtifactStore::new("data/sprinkler_model.json");
//!
//! let report = Trainer::new().run(&store, &artifacts, &SystemClock)?;
//! println!("fitted on {} samples", report.samples);
//!
//! let hours = Predictor::load(&artifacts)?.predict(30.0)?.hours;
//! println!("next activation in {:.2} hours", hours);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod errors;
pub mod predictor;
pub mod query;
pub mod regression;
pub mod scaler;
pub mod trainer;

pub use artifact::{ArtifactStore, ModelArtifact, ARTIFACT_FORMAT, ARTIFACT_VERSION};
pub use errors::{
    ArtifactError, ArtifactResult, PredictError, PredictResult, TrainError, TrainResult,
};
pub use predictor::{Prediction, Predictor};
pub use query::{QueryService, Snapshot};
pub use regression::LinearRegression;
pub use scaler::StandardScaler;
pub use trainer::{Trainer, TrainingReport, MIN_TRAINING_RECORDS};
