//! TirAir command line application
//!
//! ```text
//! tirair ingest                   consume telemetry into the record store
//! tirair train [--every SECS]     fit the model on every stored reading
//! tirair predict [--temperature]  hours until the next irrigation event
//! tirair history [--limit N]      stored readings, oldest first
//! tirair status                   latest readings plus forecast
//! tirair control COMMAND          publish an actuator command
//! ```

pub mod cli;
pub mod commands;
pub mod context;

pub use cli::{Cli, Commands};
pub use context::AppContext;
