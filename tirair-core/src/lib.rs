//! Core telemetry model for TirAir
//!
//! Handles the leaf stages of the irrigation pipeline: turning raw bus
//! payloads into normalized records, persisting them append-only, and
//! deriving the time-between-events feature the trainer learns from.
//!
//! Key constraints:
//! - Parsing is total: every payload maps to a record or a `ParseError`
//! - Records are immutable once stored; insert is the only mutation
//! - Derived intervals are never negative
//!
//! ```no_run
//! use tirair_core::{parse_payload, JsonLinesStore, RecordStore, SystemClock, TimeSource};
//!
//! let mut store = JsonLinesStore::open("data/sensor_data.jsonl")?;
//! let clock = SystemClock;
//!
//! let reading = parse_payload("Temperature: 28.5 C, Humidity: 66 %, Raining: false, Valve: Closed")?;
//! let id = store.insert(&reading.stamp(clock.now()))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod control;
pub mod errors;
pub mod features;
pub mod parser;
pub mod record;
pub mod store;
pub mod time;

// Public API
pub use control::{ControlCommand, UnknownCommand};
pub use errors::{ParseError, ParseResult, StorageError, StoreResult};
pub use features::{FeatureBuilder, FeatureRecord, Features, LeadingGap};
pub use parser::{parse_bytes, parse_payload};
pub use record::{Reading, RecordId, SensorRecord, Valve};
pub use store::{JsonLinesStore, MemoryStore, RecordStore, StoreStats};
pub use time::{FixedClock, SystemClock, TimeSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
