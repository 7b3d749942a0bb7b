//! Command line definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tirair_core::{ControlCommand, LeadingGap, UnknownCommand};

#[derive(Debug, Parser)]
#[command(
    name = "tirair",
    about = "TirAir - telemetry ingestion and irrigation forecasting",
    version,
    after_help = "Run 'tirair <command> --help' for details on each command."
)]
pub struct Cli {
    /// Directory holding sensor_data.jsonl and sprinkler_model.json
    #[arg(long, env = "TIRAIR_DATA_DIR", default_value = "./data", global = true)]
    pub data_dir: PathBuf,

    /// MQTT broker host
    #[arg(long, env = "TIRAIR_BROKER_HOST", default_value = "localhost", global = true)]
    pub broker_host: String,

    /// MQTT broker port
    #[arg(long, env = "TIRAIR_BROKER_PORT", default_value_t = 1883, global = true)]
    pub broker_port: u16,

    /// Topic the sensor node publishes telemetry on
    #[arg(long, env = "TIRAIR_TELEMETRY_TOPIC", default_value = "cpc357", global = true)]
    pub telemetry_topic: String,

    /// Topic actuator commands are published on
    #[arg(
        long,
        env = "TIRAIR_CONTROL_TOPIC",
        default_value = "cpc357/control",
        global = true
    )]
    pub control_topic: String,

    /// MQTT client identifier (default: tirair-<pid>)
    #[arg(long, env = "TIRAIR_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Subscribe to telemetry and store every valid reading
    Ingest(IngestArgs),
    /// Fit the irrigation interval model on all stored readings
    Train(TrainArgs),
    /// Forecast hours until the next irrigation event
    Predict {
        /// Score this temperature instead of the latest reading
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,
    },
    /// List stored readings, oldest first
    History {
        /// Only the most recent N readings
        #[arg(long)]
        limit: Option<usize>,
        /// One JSON record per line
        #[arg(long)]
        json: bool,
    },
    /// Show current readings and the next-activation forecast
    Status,
    /// Publish an actuator command
    Control {
        /// open_sprinklers, close_sprinklers, open_lid or close_lid
        #[arg(value_parser = parse_control_command)]
        command: ControlCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    /// Give up after this many consecutive connection failures
    #[arg(long)]
    pub max_reconnects: Option<u32>,

    /// First reconnect delay in milliseconds
    #[arg(long, default_value_t = 500)]
    pub backoff_initial_ms: u64,

    /// Reconnect delay ceiling in seconds
    #[arg(long, default_value_t = 60)]
    pub backoff_max_secs: u64,

    /// MQTT keep-alive in seconds
    #[arg(long, default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Immediate re-attempts for a failed insert (0 = at-most-once)
    #[arg(long, default_value_t = 0)]
    pub store_retries: u32,
}

#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    /// Retrain every N seconds until interrupted
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub every: Option<u64>,

    /// Treatment of the earliest record, which has no observed interval
    #[arg(long, value_enum, default_value_t = GapPolicy::ZeroFill)]
    pub leading_gap: GapPolicy,
}

/// Command line spelling of `LeadingGap`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GapPolicy {
    /// Keep it with an interval of zero hours
    ZeroFill,
    /// Leave it out of the fit
    Exclude,
}

impl From<GapPolicy> for LeadingGap {
    fn from(policy: GapPolicy) -> Self {
        match policy {
            GapPolicy::ZeroFill => LeadingGap::ZeroFill,
            GapPolicy::Exclude => LeadingGap::Exclude,
        }
    }
}

fn parse_control_command(value: &str) -> Result<ControlCommand, UnknownCommand> {
    value.parse()
}
