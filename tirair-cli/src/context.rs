//! Process-wide wiring, built once at startup and passed to every command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tirair_connectors::MqttConfig;
use tirair_core::{JsonLinesStore, SystemClock, TimeSource};
use tirair_ml::ArtifactStore;

use crate::cli::Cli;

/// Record store file name inside the data directory
pub const STORE_FILE: &str = "sensor_data.jsonl";

/// Model artifact file name inside the data directory
pub const ARTIFACT_FILE: &str = "sprinkler_model.json";

/// Default telemetry topic
pub const DEFAULT_TELEMETRY_TOPIC: &str = "cpc357";

/// Default control topic
pub const DEFAULT_CONTROL_TOPIC: &str = "cpc357/control";

/// Everything a command needs: storage locations, clock and broker settings
#[derive(Clone)]
pub struct AppContext {
    data_dir: PathBuf,
    /// Trained model location
    pub artifacts: ArtifactStore,
    /// Source of ingestion and training timestamps
    pub clock: Arc<dyn TimeSource>,
    /// Broker connection settings
    pub mqtt: MqttConfig,
    /// Subscription topic for ingestion
    pub telemetry_topic: String,
    /// Publication topic for actuator commands
    pub control_topic: String,
}

impl AppContext {
    /// Context rooted at `data_dir` with the system clock and default topics
    pub fn new(data_dir: impl Into<PathBuf>, mqtt: MqttConfig) -> Self {
        let data_dir = data_dir.into();
        Self {
            artifacts: ArtifactStore::new(data_dir.join(ARTIFACT_FILE)),
            data_dir,
            clock: Arc::new(SystemClock),
            mqtt,
            telemetry_topic: DEFAULT_TELEMETRY_TOPIC.to_string(),
            control_topic: DEFAULT_CONTROL_TOPIC.to_string(),
        }
    }

    /// Build from parsed command line flags
    pub fn from_cli(cli: &Cli) -> Self {
        let mut mqtt = MqttConfig::new(cli.broker_host.clone(), cli.broker_port);
        if let Some(id) = &cli.client_id {
            mqtt = mqtt.client_id(id.clone());
        }

        Self::new(&cli.data_dir, mqtt).with_topics(&cli.telemetry_topic, &cli.control_topic)
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace both topics
    pub fn with_topics(mut self, telemetry: impl Into<String>, control: impl Into<String>) -> Self {
        self.telemetry_topic = telemetry.into();
        self.control_topic = control.into();
        self
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Record store path
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    /// Open the record store, creating the data directory if needed
    pub fn open_store(&self) -> Result<JsonLinesStore> {
        let path = self.store_path();
        JsonLinesStore::open(&path)
            .with_context(|| format!("cannot open record store {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn paths_live_under_data_dir() {
        let ctx = AppContext::new("/srv/tirair", MqttConfig::new("localhost", 1883));
        assert_eq!(ctx.store_path(), PathBuf::from("/srv/tirair/sensor_data.jsonl"));
        assert_eq!(
            ctx.artifacts.path(),
            Path::new("/srv/tirair/sprinkler_model.json")
        );
        assert_eq!(ctx.telemetry_topic, "cpc357");
        assert_eq!(ctx.control_topic, "cpc357/control");
    }

    #[test]
    fn flags_flow_into_context() {
        let cli = Cli::try_parse_from([
            "tirair",
            "--data-dir",
            "/tmp/tirair",
            "--broker-host",
            "mqtt.farm.lan",
            "--client-id",
            "greenhouse-1",
            "--telemetry-topic",
            "farm/telemetry",
            "status",
        ])
        .unwrap();
        let ctx = AppContext::from_cli(&cli);

        assert_eq!(ctx.data_dir(), Path::new("/tmp/tirair"));
        assert_eq!(ctx.mqtt.host, "mqtt.farm.lan");
        assert_eq!(ctx.mqtt.client_id, "greenhouse-1");
        assert_eq!(ctx.telemetry_topic, "farm/telemetry");
        assert!(ctx.clock.is_wall_clock());
    }
}
