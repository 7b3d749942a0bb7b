//! Append-only record storage
//!
//! This module provides the durable side of ingestion: one insert per
//! accepted message, and a full ordered scan for training and presentation.
//!
//! ## Module Organization
//!
//! - Core trait and statistics (this file)
//! - `memory` - In-process store for tests and embedding
//! - `file` - JSON Lines file store used by the deployed processes
//!
//! ## Contract
//!
//! - `insert` is the only mutation; records are never updated or deleted
//! - `query_all` returns every decodable record in timestamp-ascending order
//!   (stable for equal timestamps, i.e. insertion order breaks ties)
//! - Readers take an unsynchronized snapshot; a training run started while
//!   ingestion is writing may or may not see the newest record

pub mod file;
pub mod memory;

pub use file::{JsonLinesStore, ScanReport};
pub use memory::MemoryStore;

use crate::errors::StoreResult;
use crate::record::{RecordId, SensorRecord};

/// Durable, append-only repository of sensor records
pub trait RecordStore {
    /// Append one record
    ///
    /// A failure leaves the store exactly as it was: either the whole record
    /// was written or none of it was.
    fn insert(&mut self, record: &SensorRecord) -> StoreResult<RecordId>;

    /// Every record, timestamp ascending
    fn query_all(&self) -> StoreResult<Vec<SensorRecord>>;

    /// Most recent record, if any
    fn latest(&self) -> StoreResult<Option<SensorRecord>> {
        Ok(self.query_all()?.pop())
    }

    /// Number of stored records
    fn len(&self) -> StoreResult<usize> {
        Ok(self.query_all()?.len())
    }

    /// Whether the store holds no records
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Write statistics for a store instance
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Records appended successfully
    pub records_written: u64,
    /// Bytes appended successfully
    pub bytes_written: u64,
    /// Inserts that failed
    pub write_failures: u64,
}

/// Order records by timestamp, keeping insertion order for ties
pub(crate) fn sort_chronologically(records: &mut [SensorRecord]) {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}
