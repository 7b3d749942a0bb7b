//! Model artifact schema and atomic persistence
//!
//! ## Document Layout
//!
//! ```json
//! {
//!   "format": "tirair-model",
//!   "version": 1,
//!   "scaler": { "mean": 25.0, "scale": 4.08248290463863 },
//!   "regression": { "coefficient": 0.408248290463863, "intercept": 0.6666666666666666 },
//!   "trained_at": "2024-05-01T10:00:00.000000Z",
//!   "samples": 3
//! }
//! ```
//!
//! Decoding is strict. The format tag and version are checked before the
//! body, unknown or missing fields are rejected, and every parameter must be
//! finite with a positive scale. Anything else is `Corrupt`.
//!
//! ## Write Protocol
//!
//! 1. Serialize the whole document in memory
//! 2. Write it to a uniquely named temporary file beside the target
//! 3. `sync_all` the temporary file
//! 4. `rename` over the target
//!
//! A reader therefore sees either the previous artifact or the new one,
//! never a mixture, and a failed run leaves the previous artifact in place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tirair_core::record::iso_micros;

use crate::errors::{ArtifactError, ArtifactResult};
use crate::regression::LinearRegression;
use crate::scaler::StandardScaler;

/// Format tag written into every artifact
pub const ARTIFACT_FORMAT: &str = "tirair-model";

/// Current artifact schema version
pub const ARTIFACT_VERSION: u64 = 1;

/// A trained estimator: scaler plus regression, with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelArtifact {
    /// Always `tirair-model`
    pub format: String,
    /// Schema version
    pub version: u64,
    /// Temperature standardization
    pub scaler: StandardScaler,
    /// Standardized temperature to hours
    pub regression: LinearRegression,
    /// When the training run finished
    #[serde(with = "iso_micros")]
    pub trained_at: DateTime<Utc>,
    /// Feature rows the estimator was fitted on
    pub samples: usize,
}

impl ModelArtifact {
    /// Wrap fitted parameters in a current-version document
    pub fn new(
        scaler: StandardScaler,
        regression: LinearRegression,
        trained_at: DateTime<Utc>,
        samples: usize,
    ) -> Self {
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            version: ARTIFACT_VERSION,
            scaler,
            regression,
            trained_at,
            samples,
        }
    }

    /// Check format, version and parameter sanity
    pub fn validate(&self) -> ArtifactResult<()> {
        if self.format != ARTIFACT_FORMAT || self.version != ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                format: self.format.clone(),
                version: self.version,
            });
        }
        if !self.scaler.is_valid() {
            return Err(ArtifactError::Corrupt(format!(
                "invalid scaler parameters (mean {}, scale {})",
                self.scaler.mean, self.scaler.scale
            )));
        }
        if !self.regression.is_valid() {
            return Err(ArtifactError::Corrupt(format!(
                "invalid regression parameters (coefficient {}, intercept {})",
                self.regression.coefficient, self.regression.intercept
            )));
        }
        Ok(())
    }

    /// Strict decode
    pub fn from_json(text: &str) -> ArtifactResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ArtifactError::Corrupt(format!("invalid JSON: {}", e)))?;

        // Header first, so a future schema is reported as such rather than
        // as an unknown field
        let format = value
            .get("format")
            .and_then(Value::as_str)
            .ok_or_else(|| ArtifactError::Corrupt("missing `format` tag".into()))?;
        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| ArtifactError::Corrupt("missing `version`".into()))?;
        if format != ARTIFACT_FORMAT || version != ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                format: format.to_string(),
                version,
            });
        }

        let artifact: ModelArtifact =
            serde_json::from_value(value).map_err(|e| ArtifactError::Corrupt(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Pretty-printed document
    pub fn to_json(&self) -> ArtifactResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ArtifactError::Corrupt(e.to_string()))
    }
}

/// Single-file artifact location
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    /// Artifact kept at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an artifact has ever been written
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and validate the current artifact
    pub fn load(&self) -> ArtifactResult<ModelArtifact> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NoArtifact {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        ModelArtifact::from_json(&text)
    }

    /// Atomically replace the artifact
    ///
    /// The document is validated before anything touches the disk.
    pub fn save(&self, artifact: &ModelArtifact) -> ArtifactResult<()> {
        artifact.validate()?;
        let mut bytes = artifact.to_json()?.into_bytes();
        bytes.push(b'\n');

        let replacing = self.exists();
        self.write_atomic(&bytes)?;

        if replacing {
            log::info!("replaced model artifact {}", self.path.display());
        } else {
            log::info!("wrote model artifact {}", self.path.display());
        }
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // Unique per save, so overlapping runs never share a temporary file.
        // Dropping it on any error removes it.
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
