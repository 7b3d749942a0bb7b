//! Bus Connectors for Telemetry Ingestion and Actuator Control
//!
//! ## Overview
//!
//! TirAir talks to the field over a single MQTT broker:
//!
//! ```text
//! sensor node ──publish──► [telemetry topic] ──► MqttSource ──► MessageHandler
//!                                                                (parse → store)
//! dashboard ──ControlPublisher──► [control topic] ──► actuator node
//! ```
//!
//! ### Ingestion
//!
//! `MqttSource` owns one long-lived connection. It hands each inbound
//! publish to a `MessageHandler` and waits for the handler to return before
//! polling the next message, so a slow store slows the consumer instead of
//! growing a queue. Delivery is QoS 0 end to end: at-most-once.
//!
//! ### Reconnection
//!
//! Exponential backoff, capped:
//! ```text
//! delay(attempt) = min(initial * 2^(attempt - 1), max)
//! ```
//! The subscription is re-issued on every `ConnAck`, so a broker restart or
//! a clean session never leaves the consumer silently unsubscribed.
//! Failures are logged as warnings at first, then as errors at attempts
//! 4, 8, 16, ... so a long outage does not flood the log.
//!
//! ### Control
//!
//! Commands are the four fixed `ControlCommand` strings, published at QoS 0
//! without retain. Nothing confirms that an actuator acted.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tirair_connectors::{IngestionHandler, MqttConfig, MqttSource};
//! use tirair_core::{JsonLinesStore, SystemClock};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MqttConfig::new("localhost", 1883)
//!     .client_id("tirair-ingest")
//!     .keep_alive_secs(60);
//!
//! let store = JsonLinesStore::open("data/sensor_data.jsonl")?;
//! let mut handler = IngestionHandler::new(store, SystemClock);
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! MqttSource::new(config, "cpc357")?
//!     .run(&mut handler, shutdown)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod ingest;
pub mod mqtt;

// Re-export common types
pub use ingest::{HandleOutcome, IngestStats, IngestionHandler, MessageHandler};
pub use mqtt::{Backoff, ControlPublisher, MqttConfig, MqttError, MqttSource, QoS};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Async send side of a connector
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    type Error;

    /// Publish one payload
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Publishes received from the broker
    pub messages_received: u64,
    /// Payload bytes received
    pub bytes_received: u64,
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Successful reconnections after a failure
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
