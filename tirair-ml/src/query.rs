//! Read-side interface for the presentation layer
//!
//! Every call re-reads the store and the artifact, so a dashboard polling on
//! its own tick always sees the latest record and the latest trained model.

use std::fmt;

use tirair_core::{RecordStore, SensorRecord, StoreResult};

use crate::artifact::ArtifactStore;
use crate::errors::{PredictError, PredictResult};
use crate::predictor::{Prediction, Predictor};

/// Current readings plus the next-activation forecast
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Most recent stored record
    pub latest: Option<SensorRecord>,
    /// Forecast for the latest temperature; `None` when no model is usable
    pub prediction: Option<Prediction>,
}

impl Snapshot {
    /// `"Currently Raining"` or `"No Rain Detected"`
    pub fn rain_status(&self) -> Option<&'static str> {
        self.latest.as_ref().map(|record| {
            if record.raining {
                "Currently Raining"
            } else {
                "No Rain Detected"
            }
        })
    }

    /// `"In 1.17 hours"`
    pub fn next_activation(&self) -> Option<String> {
        self.prediction
            .map(|prediction| format!("In {:.2} hours", prediction.hours))
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(record) = &self.latest else {
            return write!(f, "No sensor readings yet");
        };

        writeln!(f, "Temperature:     {} °C", record.temperature)?;
        writeln!(f, "Humidity:        {} %", record.humidity)?;
        writeln!(f, "Rain:            {}", self.rain_status().unwrap_or_default())?;
        writeln!(f, "Valve:           {}", record.valve)?;
        match self.next_activation() {
            Some(text) => write!(f, "Next activation: {}", text),
            None => write!(f, "Next activation: unavailable (no trained model)"),
        }
    }
}

/// Store and artifact reader used by the dashboard
pub struct QueryService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    artifacts: &'a ArtifactStore,
}

impl<'a, S: RecordStore + ?Sized> QueryService<'a, S> {
    /// Read from `store` and `artifacts`
    pub fn new(store: &'a S, artifacts: &'a ArtifactStore) -> Self {
        Self { store, artifacts }
    }

    /// Full history, timestamp ascending
    pub fn query_all(&self) -> StoreResult<Vec<SensorRecord>> {
        self.store.query_all()
    }

    /// Most recent record
    pub fn latest(&self) -> StoreResult<Option<SensorRecord>> {
        self.store.latest()
    }

    /// Forecast for the most recent temperature
    pub fn predict_latest(&self) -> PredictResult<Prediction> {
        let latest = self.store.latest()?.ok_or(PredictError::NoReadings)?;
        Predictor::load(self.artifacts)?.predict(latest.temperature)
    }

    /// Latest readings with the forecast when one can be made
    ///
    /// Only store failures are errors. A missing or unusable artifact
    /// withholds the prediction and the readings are still returned.
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        let latest = self.store.latest()?;

        let prediction = match &latest {
            None => None,
            Some(record) => match Predictor::load(self.artifacts)
                .and_then(|predictor| predictor.predict(record.temperature))
            {
                Ok(prediction) => Some(prediction),
                Err(PredictError::NoArtifact) => {
                    log::debug!("no trained model; prediction withheld");
                    None
                }
                Err(e) => {
                    log::warn!("prediction withheld: {}", e);
                    None
                }
            },
        };

        Ok(Snapshot { latest, prediction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::Trainer;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use tirair_core::{MemoryStore, Reading, SystemClock, Valve};

    fn record(hours: i64, temperature: f64, raining: bool) -> SensorRecord {
        Reading {
            temperature,
            humidity: 70.0,
            raining,
            valve: Valve::Open,
        }
        .stamp(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(hours))
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("model.json"));
        let store = MemoryStore::new();
        let service = QueryService::new(&store, &artifacts);

        let snapshot = service.snapshot().unwrap();
        assert!(snapshot.latest.is_none());
        assert!(snapshot.rain_status().is_none());
        assert_eq!(snapshot.to_string(), "No sensor readings yet");
        assert!(matches!(service.predict_latest(), Err(PredictError::NoReadings)));
    }

    #[test]
    fn test_readings_without_model() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("model.json"));
        let store = MemoryStore::with_records([record(0, 24.0, true)]);
        let service = QueryService::new(&store, &artifacts);

        let snapshot = service.snapshot().unwrap();
        assert_eq!(snapshot.rain_status(), Some("Currently Raining"));
        assert!(snapshot.next_activation().is_none());
        assert!(matches!(service.predict_latest(), Err(PredictError::NoArtifact)));
    }

    #[test]
    fn test_snapshot_with_model() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("model.json"));
        let store = MemoryStore::with_records([
            record(0, 20.0, false),
            record(1, 25.0, false),
            record(2, 30.0, false),
        ]);
        Trainer::new().run(&store, &artifacts, &SystemClock).unwrap();

        let snapshot = QueryService::new(&store, &artifacts).snapshot().unwrap();
        assert_eq!(snapshot.rain_status(), Some("No Rain Detected"));
        assert_eq!(snapshot.next_activation().as_deref(), Some("In 1.17 hours"));
    }

    #[test]
    fn test_corrupt_model_withholds_prediction() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{").unwrap();
        let artifacts = ArtifactStore::new(path);
        let store = MemoryStore::with_records([record(0, 24.0, false)]);

        let snapshot = QueryService::new(&store, &artifacts).snapshot().unwrap();
        assert!(snapshot.latest.is_some());
        assert!(snapshot.prediction.is_none());
    }
}
