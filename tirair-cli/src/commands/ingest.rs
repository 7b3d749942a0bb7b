//! `tirair ingest`: the long-running telemetry consumer

use std::time::Duration;

use anyhow::{Context, Result};
use tirair_connectors::{IngestionHandler, MqttConfig, MqttSource};
use tokio::sync::watch;

use super::interrupted;
use crate::cli::IngestArgs;
use crate::context::AppContext;

/// Broker settings for ingestion: the context's, plus the ingest flags
pub fn ingest_config(ctx: &AppContext, args: &IngestArgs) -> MqttConfig {
    let config = ctx
        .mqtt
        .clone()
        .keep_alive_secs(args.keep_alive_secs)
        .backoff(
            Duration::from_millis(args.backoff_initial_ms),
            Duration::from_secs(args.backoff_max_secs),
        );

    match args.max_reconnects {
        Some(limit) => config.max_reconnect_attempts(limit),
        None => config,
    }
}

/// Consume telemetry until interrupted or the reconnect limit is hit
pub async fn run(ctx: &AppContext, args: &IngestArgs) -> Result<()> {
    let config = ingest_config(ctx, args);
    let mut source =
        MqttSource::new(config, ctx.telemetry_topic.as_str()).context("invalid broker settings")?;

    let store = ctx.open_store()?;
    tracing::info!(
        "storing readings from `{}` in {}",
        ctx.telemetry_topic,
        store.path().display()
    );
    let mut handler =
        IngestionHandler::new(store, ctx.clock.clone()).with_store_retries(args.store_retries);

    let (stop, shutdown) = watch::channel(false);
    let signal = tokio::spawn(async move {
        interrupted().await;
        let _ = stop.send(true);
        // Hold the sender so the driver sees `true` rather than a closed channel
        std::future::pending::<()>().await;
    });

    let result = source.run(&mut handler, shutdown).await;
    signal.abort();

    let stats = handler.stats();
    tracing::info!("ingestion summary: {}", stats);
    tracing::info!(
        "transport: {} message(s), {} reconnection(s)",
        source.stats().messages_received,
        source.stats().reconnections
    );

    result.context("ingestion stopped")
}
