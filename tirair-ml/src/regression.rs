//! Single-feature ordinary least squares

use serde::{Deserialize, Serialize};

/// `y = coefficient * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearRegression {
    /// Slope
    pub coefficient: f64,
    /// Value at `x = 0`
    pub intercept: f64,
}

impl LinearRegression {
    /// Closed-form fit
    ///
    /// Returns `None` when the slices are empty or differ in length. With no
    /// spread in `x` the slope is zero and the intercept is the mean target.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.is_empty() || xs.len() != ys.len() {
            return None;
        }

        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (&x, &y) in xs.iter().zip(ys) {
            let dx = x - x_mean;
            sxx += dx * dx;
            sxy += dx * (y - y_mean);
        }

        let coefficient = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        Some(Self {
            coefficient,
            intercept: y_mean - coefficient * x_mean,
        })
    }

    /// Unclamped model output
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficient * x + self.intercept
    }

    /// Both parameters finite
    pub fn is_valid(&self) -> bool {
        self.coefficient.is_finite() && self.intercept.is_finite()
    }
}
