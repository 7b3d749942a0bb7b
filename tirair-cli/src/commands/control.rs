//! `tirair control <command>`

use anyhow::{Context, Result};
use tirair_connectors::ControlPublisher;
use tirair_core::ControlCommand;

use crate::context::AppContext;

/// Publish one actuator command, fire-and-forget
pub async fn run(ctx: &AppContext, command: ControlCommand) -> Result<()> {
    let mut publisher = ControlPublisher::connect(&ctx.mqtt, ctx.control_topic.as_str())
        .await
        .with_context(|| format!("cannot reach broker {}", ctx.mqtt.broker()))?;

    publisher
        .send_command(command)
        .await
        .with_context(|| format!("failed to publish `{}`", command))?;

    if let Err(e) = publisher.disconnect().await {
        tracing::warn!("unclean disconnect after publishing: {}", e);
    }
    Ok(())
}
