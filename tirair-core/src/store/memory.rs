//! Memory-based store for testing and embedding
//!
//! ## Use Cases
//!
//! 1. **Unit Testing**: Feed known record sequences to the trainer
//! 2. **Failure Injection**: Mark the store unavailable to exercise the
//!    ingestion loop's storage-error path
//! 3. **Embedding**: Short-lived pipelines that need no durability

use super::{sort_chronologically, RecordStore, StoreStats};
use crate::errors::{StorageError, StoreResult};
use crate::record::{RecordId, SensorRecord};

/// In-process record store
///
/// ## Example
///
/// ```rust
/// use tirair_core::{MemoryStore, RecordStore, Reading, Valve};
/// use chrono::Utc;
///
/// let mut store = MemoryStore::new();
/// let reading = Reading { temperature: 25.0, humidity: 60.0, raining: false, valve: Valve::Closed };
/// store.insert(&reading.stamp(Utc::now()))?;
/// assert_eq!(store.len()?, 1);
/// # Ok::<(), tirair_core::StorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Vec<SensorRecord>,
    available: bool,
    stats: StoreStats,
}

impl MemoryStore {
    /// Create an empty, available store
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            available: true,
            stats: StoreStats::default(),
        }
    }

    /// Create a store pre-loaded with records (in any order)
    pub fn with_records(records: impl IntoIterator<Item = SensorRecord>) -> Self {
        let mut store = Self::new();
        store.records.extend(records);
        store
    }

    /// Toggle availability; inserts fail while unavailable
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Write statistics
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Records in insertion order
    pub fn as_slice(&self) -> &[SensorRecord] {
        &self.records
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, record: &SensorRecord) -> StoreResult<RecordId> {
        if !self.available {
            self.stats.write_failures += 1;
            return Err(StorageError::Unavailable("memory store marked offline".into()));
        }

        let id = RecordId(self.records.len() as u64);
        self.records.push(record.clone());
        self.stats.records_written += 1;
        Ok(id)
    }

    fn query_all(&self) -> StoreResult<Vec<SensorRecord>> {
        let mut records = self.records.clone();
        sort_chronologically(&mut records);
        Ok(records)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }
}
