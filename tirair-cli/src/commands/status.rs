//! `tirair status`: the dashboard's text rendering

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use tirair_core::RecordStore;
use tirair_ml::{ArtifactError, QueryService};

use crate::context::AppContext;

/// Print current readings, forecast and model provenance
pub fn run<W: Write>(ctx: &AppContext, out: &mut W) -> Result<()> {
    let store = ctx.open_store()?;
    let snapshot = QueryService::new(&store, &ctx.artifacts)
        .snapshot()
        .context("cannot read record store")?;

    writeln!(out, "{}", snapshot)?;
    writeln!(out, "Records stored:  {}", store.len()?)?;

    match ctx.artifacts.load() {
        Ok(artifact) => writeln!(
            out,
            "Model trained:   {} ({} samples)",
            artifact.trained_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            artifact.samples
        )?,
        Err(ArtifactError::NoArtifact { .. }) => writeln!(out, "Model trained:   never")?,
        Err(e) => writeln!(out, "Model trained:   unusable ({})", e)?,
    }
    Ok(())
}
