//! Clamped inference from a persisted artifact

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::errors::{PredictError, PredictResult};

/// One scored temperature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Input temperature in degrees Celsius
    pub temperature: f64,
    /// Model output before clamping (may be negative)
    pub raw_hours: f64,
    /// Hours until the next irrigation event, never negative
    pub hours: f64,
}

/// Scores temperatures with a loaded artifact
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: ModelArtifact,
}

impl Predictor {
    /// Use an already-validated artifact
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    /// Load the current artifact; `NoArtifact` if none was ever written
    pub fn load(artifacts: &ArtifactStore) -> PredictResult<Self> {
        Ok(Self::new(artifacts.load()?))
    }

    /// The artifact in use
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Hours until the next event at `temperature`
    pub fn predict(&self, temperature: f64) -> PredictResult<Prediction> {
        if !temperature.is_finite() {
            return Err(PredictError::InvalidInput(temperature));
        }

        let z = self.artifact.scaler.transform(temperature);
        let raw_hours = self.artifact.regression.predict(z);

        Ok(Prediction {
            temperature,
            raw_hours,
            // f64::max ignores a NaN operand, so the result is never NaN
            hours: raw_hours.max(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::LinearRegression;
    use crate::scaler::StandardScaler;
    use chrono::Utc;
    use tempfile::TempDir;

    fn predictor(coefficient: f64, intercept: f64) -> Predictor {
        Predictor::new(ModelArtifact::new(
            StandardScaler {
                mean: 25.0,
                scale: 5.0,
            },
            LinearRegression {
                coefficient,
                intercept,
            },
            Utc::now(),
            10,
        ))
    }

    #[test]
    fn test_linear_output() {
        let prediction = predictor(2.0, 1.0).predict(30.0).unwrap();
        assert_eq!(prediction.raw_hours, 3.0);
        assert_eq!(prediction.hours, 3.0);
    }

    #[test]
    fn test_negative_output_is_clamped() {
        let prediction = predictor(-2.0, 1.0).predict(35.0).unwrap();
        assert_eq!(prediction.raw_hours, -3.0);
        assert_eq!(prediction.hours, 0.0);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        assert!(matches!(
            predictor(1.0, 1.0).predict(f64::NAN),
            Err(PredictError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("sprinkler_model.json"));
        assert!(matches!(Predictor::load(&store), Err(PredictError::NoArtifact)));
    }
}
