//! `tirair history`

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use tirair_core::{RecordStore, SensorRecord};

use crate::context::AppContext;

/// The most recent `limit` records (all when `None`), oldest first
pub fn tail(records: &[SensorRecord], limit: Option<usize>) -> &[SensorRecord] {
    let start = limit.map_or(0, |n| records.len().saturating_sub(n));
    &records[start..]
}

/// Print stored readings as a table or as JSON lines
pub fn run<W: Write>(ctx: &AppContext, limit: Option<usize>, json: bool, out: &mut W) -> Result<()> {
    let store = ctx.open_store()?;
    let records = store.query_all().context("cannot read record store")?;

    for record in tail(&records, limit) {
        if json {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{}  {:>6.1} °C  {:>5.1} %  {:<8}  valve {}",
                record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                record.temperature,
                record.humidity,
                if record.raining { "raining" } else { "dry" },
                record.valve
            )?;
        }
    }
    Ok(())
}
