//! Standardization of the temperature feature
//!
//! `z = (x - mean) / scale`, where `scale` is the population (ddof = 0)
//! standard deviation of the training inputs. A corpus with no spread has a
//! standard deviation of zero; its scale is replaced by 1.0 so the transform
//! stays defined. The same convention applies at fit and at transform time.

use serde::{Deserialize, Serialize};

/// Fitted mean/scale pair for one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandardScaler {
    /// Mean of the training inputs
    pub mean: f64,
    /// Population standard deviation (1.0 when it was zero)
    pub scale: f64,
}

impl StandardScaler {
    /// Fit on `values`; `None` for an empty slice
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let scale = if std_dev == 0.0 { 1.0 } else { std_dev };
        Some(Self { mean, scale })
    }

    /// Standardize one value
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Standardize a slice
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&x| self.transform(x)).collect()
    }

    /// Finite parameters with a strictly positive scale
    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}
