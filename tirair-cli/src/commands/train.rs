//! `tirair train`: one-shot or periodic model fitting

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tirair_ml::{TrainError, Trainer, TrainingReport};

use super::interrupted;
use crate::cli::TrainArgs;
use crate::context::AppContext;

/// Fit on a fresh snapshot of the store and replace the artifact
pub fn train_once(ctx: &AppContext, trainer: &Trainer) -> Result<TrainingReport> {
    let store = ctx.open_store()?;
    trainer
        .run(&store, &ctx.artifacts, ctx.clock.as_ref())
        .context("training failed, previous model kept")
}

/// Human-readable training summary
pub fn write_report<W: Write>(out: &mut W, report: &TrainingReport, ctx: &AppContext) -> Result<()> {
    let artifact = &report.artifact;
    writeln!(
        out,
        "Trained on {} sample(s) from {} record(s)",
        report.samples, report.records
    )?;
    writeln!(
        out,
        "  scaler:     mean={:.4} scale={:.4}",
        artifact.scaler.mean, artifact.scaler.scale
    )?;
    writeln!(
        out,
        "  regression: coefficient={:.6} intercept={:.6}",
        artifact.regression.coefficient, artifact.regression.intercept
    )?;
    if report.clamped > 0 {
        writeln!(out, "  clamped:    {} negative interval(s)", report.clamped)?;
    }
    writeln!(out, "  artifact:   {}", ctx.artifacts.path().display())?;
    Ok(())
}

/// Run training once, or every `--every` seconds until interrupted
pub async fn run<W: Write>(ctx: &AppContext, args: &TrainArgs, out: &mut W) -> Result<()> {
    run_until(ctx, args, out, interrupted()).await
}

/// As `run`, with the schedule ended by `stop` instead of Ctrl-C
pub async fn run_until<W, F>(ctx: &AppContext, args: &TrainArgs, out: &mut W, stop: F) -> Result<()>
where
    W: Write,
    F: Future<Output = ()>,
{
    let trainer = Trainer::new().with_leading_gap(args.leading_gap.into());

    let Some(every) = args.every else {
        let report = train_once(ctx, &trainer)?;
        return write_report(out, &report, ctx);
    };

    tracing::info!("retraining every {}s", every);
    let mut ticker = tokio::time::interval(Duration::from_secs(every));
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Fit off the async workers so the stop signal stays responsive
                let job = {
                    let ctx = ctx.clone();
                    tokio::task::spawn_blocking(move || train_once(&ctx, &trainer))
                };

                tokio::select! {
                    joined = job => match joined {
                        // A failed run keeps the previous artifact; the schedule goes on
                        Ok(Ok(report)) => write_report(out, &report, ctx)?,
                        Ok(Err(e)) if insufficient(&e) => tracing::warn!("{:#}", e),
                        Ok(Err(e)) => tracing::error!("{:#}", e),
                        Err(e) => tracing::error!("training task failed: {}", e),
                    },
                    _ = &mut stop => {
                        tracing::info!("stopping; the fit in progress finishes in the background");
                        break;
                    }
                }
            }
            _ = &mut stop => break,
        }
    }
    Ok(())
}

fn insufficient(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<TrainError>(),
        Some(TrainError::InsufficientData { .. })
    )
}
