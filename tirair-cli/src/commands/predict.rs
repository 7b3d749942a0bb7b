//! `tirair predict`

use std::io::Write;

use anyhow::{anyhow, Result};
use tirair_ml::{PredictError, Prediction, Predictor, QueryService};

use crate::context::AppContext;

/// Forecast for `temperature`, or for the latest stored reading
pub fn predict(ctx: &AppContext, temperature: Option<f64>) -> Result<Prediction> {
    let result = match temperature {
        Some(t) => Predictor::load(&ctx.artifacts).and_then(|predictor| predictor.predict(t)),
        None => {
            let store = ctx.open_store()?;
            QueryService::new(&store, &ctx.artifacts).predict_latest()
        }
    };

    result.map_err(|e| match e {
        PredictError::NoArtifact => anyhow!(
            "no trained model at {}; run `tirair train` first",
            ctx.artifacts.path().display()
        ),
        PredictError::NoReadings => anyhow!("no sensor readings stored yet"),
        other => anyhow::Error::new(other).context("prediction failed"),
    })
}

/// Print the forecast in the dashboard's wording
pub fn run<W: Write>(ctx: &AppContext, temperature: Option<f64>, out: &mut W) -> Result<()> {
    let prediction = predict(ctx, temperature)?;
    writeln!(
        out,
        "Next activation: In {:.2} hours (at {} °C)",
        prediction.hours, prediction.temperature
    )?;
    Ok(())
}
