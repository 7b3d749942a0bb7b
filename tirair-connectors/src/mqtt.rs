//! MQTT transport: telemetry subscription driver and control publisher
//!
//! Both halves are thin layers over `rumqttc`'s `AsyncClient`/`EventLoop`
//! pair. The event loop is polled inline by its owner rather than spawned,
//! so message handling and network progress share one task and one order.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet,
};
use thiserror::Error;
use tirair_core::ControlCommand;
use tokio::sync::watch;

use crate::ingest::MessageHandler;
use crate::{AsyncConnector, ConnectionStats, ConnectorError};

pub use rumqttc::QoS;

/// Consecutive failures logged as warnings before escalation starts
const QUIET_ATTEMPTS: u32 = 3;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Request could not be queued to the event loop
    #[error("MQTT client error: {0}")]
    Client(#[from] ClientError),

    /// Network or protocol failure reported by the event loop
    #[error("MQTT connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The configured reconnect limit was reached
    #[error("gave up after {attempts} failed connection attempt(s): {last_error}")]
    ReconnectExhausted {
        /// Consecutive failed attempts
        attempts: u32,
        /// Error from the final attempt
        last_error: String,
    },

    /// Generic connector failure
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT client identifier
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Start every connection without broker-side session state
    pub clean_session: bool,
    /// Request channel capacity between client and event loop
    pub capacity: usize,
    /// First reconnect delay
    pub initial_backoff: Duration,
    /// Reconnect delay ceiling
    pub max_backoff: Duration,
    /// Give up after this many consecutive failures (`None` = never)
    pub max_reconnect_attempts: Option<u32>,
    /// Bound on connect/publish/disconnect round trips for the publisher
    pub operation_timeout: Duration,
}

impl MqttConfig {
    /// Settings for `host:port` with defaults for everything else
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: format!("tirair-{}", std::process::id()),
            keep_alive: Duration::from_secs(60),
            clean_session: true,
            capacity: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            max_reconnect_attempts: None,
            operation_timeout: Duration::from_secs(10),
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set reconnect backoff bounds
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Stop after `attempts` consecutive connection failures
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Set the publisher's round-trip timeout
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Check the settings before any socket is opened
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::ConfigError("broker host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConnectorError::ConfigError("broker port must be non-zero".into()));
        }
        if self.client_id.is_empty() {
            return Err(ConnectorError::ConfigError("client id is empty".into()));
        }
        if self.keep_alive < Duration::from_secs(5) {
            return Err(ConnectorError::ConfigError(
                "keep-alive must be at least 5 seconds".into(),
            ));
        }
        if self.capacity == 0 {
            return Err(ConnectorError::ConfigError("request capacity must be non-zero".into()));
        }
        if self.initial_backoff.is_zero() || self.initial_backoff > self.max_backoff {
            return Err(ConnectorError::ConfigError(format!(
                "invalid backoff bounds {:?}..{:?}",
                self.initial_backoff, self.max_backoff
            )));
        }
        Ok(())
    }

    /// `host:port`
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn to_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(self.clean_session);
        options
    }
}

/// Capped exponential reconnect delay
///
/// The n-th consecutive failure waits `min(initial * 2^(n-1), max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    /// Schedule between `initial` and `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            failures: 0,
        }
    }

    /// Schedule from broker settings
    pub fn from_config(config: &MqttConfig) -> Self {
        Self::new(config.initial_backoff, config.max_backoff)
    }

    /// Record a failure and return how long to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let exponent = (self.failures - 1).min(31);
        self.initial.saturating_mul(1u32 << exponent).min(self.max)
    }

    /// Consecutive failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Forget past failures after a successful connection
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Whether a failure at `attempt` is logged as an error
///
/// The first few failures are warnings. After that only attempts that are
/// powers of two are reported, so log volume shrinks as an outage drags on.
pub fn escalates(attempt: u32) -> bool {
    attempt > QUIET_ATTEMPTS && attempt.is_power_of_two()
}

/// Long-lived telemetry subscription
pub struct MqttSource {
    config: MqttConfig,
    topic: String,
    stats: ConnectionStats,
    connected: bool,
}

impl MqttSource {
    /// Subscriber for `topic`; fails on invalid settings
    pub fn new(config: MqttConfig, topic: impl Into<String>) -> Result<Self, MqttError> {
        config.validate()?;
        let topic = topic.into();
        if topic.is_empty() {
            return Err(ConnectorError::ConfigError("telemetry topic is empty".into()).into());
        }
        Ok(Self {
            config,
            topic,
            stats: ConnectionStats::default(),
            connected: false,
        })
    }

    /// Subscribed topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Transport statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Whether the last event loop result was a live connection
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drive the connection until `shutdown` turns true or its sender drops
    ///
    /// Each publish is passed to `handler` and fully handled before the
    /// event loop is polled again. Connection failures are retried with
    /// backoff; the subscription is renewed on every `ConnAck`. Returns
    /// `ReconnectExhausted` when a configured attempt limit is exceeded.
    pub async fn run<H>(
        &mut self,
        handler: &mut H,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MqttError>
    where
        H: MessageHandler + ?Sized,
    {
        let (client, mut eventloop) =
            AsyncClient::new(self.config.to_options(), self.config.capacity);
        let mut backoff = Backoff::from_config(&self.config);

        log::info!(
            "connecting to {} as {}",
            self.config.broker(),
            self.config.client_id
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                polled = eventloop.poll() => polled,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    if backoff.failures() > 0 {
                        self.stats.reconnections += 1;
                        log::info!(
                            "reconnected to {} after {} failed attempt(s)",
                            self.config.broker(),
                            backoff.failures()
                        );
                    } else {
                        log::info!("connected to {}", self.config.broker());
                    }
                    backoff.reset();
                    self.connected = true;
                    client.try_subscribe(self.topic.clone(), QoS::AtMostOnce)?;
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    log::info!("subscribed to {}", self.topic);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.stats.messages_received += 1;
                    self.stats.bytes_received += publish.payload.len() as u64;
                    handler.handle(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    self.connected = false;
                    let delay = backoff.next_delay();
                    let attempt = backoff.failures();
                    let message = e.to_string();

                    if let Some(limit) = self.config.max_reconnect_attempts {
                        if attempt > limit {
                            log::error!(
                                "giving up on {} after {} failed attempt(s): {}",
                                self.config.broker(),
                                attempt,
                                message
                            );
                            self.stats.last_error = Some(message.clone());
                            return Err(MqttError::ReconnectExhausted {
                                attempts: attempt,
                                last_error: message,
                            });
                        }
                    }

                    self.log_failure(attempt, delay, &message);
                    self.stats.last_error = Some(message);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        log::info!("ingestion from {} stopped", self.topic);
        if self.connected {
            // Best effort: tell the broker we are leaving
            let _ = client.try_disconnect();
            let _ = tokio::time::timeout(Duration::from_millis(500), eventloop.poll()).await;
            self.connected = false;
        }
        Ok(())
    }

    fn log_failure(&self, attempt: u32, delay: Duration, message: &str) {
        if attempt <= QUIET_ATTEMPTS {
            log::warn!(
                "connection to {} failed (attempt {}): {}; retrying in {:?}",
                self.config.broker(),
                attempt,
                message,
                delay
            );
        } else if escalates(attempt) {
            log::error!(
                "still unable to reach {} after {} attempts: {}",
                self.config.broker(),
                attempt,
                message
            );
        } else {
            log::debug!("connection attempt {} failed: {}", attempt, message);
        }
    }
}

/// Which event finishes a publisher round trip
#[derive(Debug, Clone, Copy)]
enum Awaiting {
    ConnAck,
    Published,
    Disconnected,
}

impl Awaiting {
    fn is_done(self, event: &Event) -> bool {
        match self {
            Awaiting::ConnAck => matches!(event, Event::Incoming(Packet::ConnAck(_))),
            Awaiting::Published => matches!(event, Event::Outgoing(Outgoing::Publish(_))),
            Awaiting::Disconnected => matches!(event, Event::Outgoing(Outgoing::Disconnect)),
        }
    }
}

/// Fire-and-forget publisher for actuator commands
///
/// Commands are sent at QoS 0 without retain. "Sent" means written to the
/// socket; nothing confirms that an actuator received or acted on it.
pub struct ControlPublisher {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    timeout: Duration,
    stats: ConnectionStats,
    connected: bool,
}

impl ControlPublisher {
    /// Connect and wait for the broker's `ConnAck`
    pub async fn connect(config: &MqttConfig, topic: impl Into<String>) -> Result<Self, MqttError> {
        config.validate()?;
        let (client, eventloop) = AsyncClient::new(config.to_options(), config.capacity);

        let mut publisher = Self {
            client,
            eventloop,
            topic: topic.into(),
            timeout: config.operation_timeout,
            stats: ConnectionStats::default(),
            connected: false,
        };
        publisher.drive(Awaiting::ConnAck).await?;
        publisher.connected = true;
        log::info!("control publisher connected to {}", config.broker());
        Ok(publisher)
    }

    /// Control topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one command on the control topic
    pub async fn send_command(&mut self, command: ControlCommand) -> Result<(), MqttError> {
        let topic = self.topic.clone();
        self.send(&topic, command.as_str().as_bytes()).await?;
        log::info!("sent `{}` to {}", command, topic);
        Ok(())
    }

    /// Close the connection cleanly
    pub async fn disconnect(mut self) -> Result<(), MqttError> {
        if !self.connected {
            return Ok(());
        }
        self.client.disconnect().await?;
        self.drive(Awaiting::Disconnected).await?;
        self.connected = false;
        Ok(())
    }

    /// Poll the event loop until `target` is observed or the timeout passes
    async fn drive(&mut self, target: Awaiting) -> Result<(), MqttError> {
        let eventloop = &mut self.eventloop;
        let round_trip = async {
            loop {
                let event = eventloop.poll().await?;
                if target.is_done(&event) {
                    return Ok::<(), MqttError>(());
                }
            }
        };

        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(ConnectorError::Timeout.into()),
        }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for ControlPublisher {
    type Error = MqttError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(ConnectorError::NotConnected.into());
        }

        self.client
            .publish(topic, QoS::AtMostOnce, false, data.to_vec())
            .await?;

        match self.drive(Awaiting::Published).await {
            Ok(()) => {
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += data.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.stats.messages_failed += 1;
                self.stats.last_error = Some(e.to_string());
                self.connected = false;
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
