//! File-based record store
//!
//! Records are kept in a JSON Lines file, one record per line, in the order
//! they were accepted:
//!
//! ```json
//! {"timestamp":"2024-05-01T10:00:00.123456Z","temperature":28.5,"humidity":66.0,"raining":false,"valve":"Closed"}
//! {"timestamp":"2024-05-01T10:05:00.004211Z","temperature":28.9,"humidity":65.0,"raining":false,"valve":"Closed"}
//! ```
//!
//! ## Write Discipline
//!
//! Every insert acquires the file, appends one complete line with a single
//! write, syncs it and releases the handle. No handle is held between
//! messages, so a shutdown between inserts never leaves a write half-applied.
//! If a crash did leave a partial last line, the next insert terminates it
//! first, so the fragment stays on its own line and the new record survives.
//!
//! ## Read Tolerance
//!
//! A reader running concurrently with ingestion may observe a trailing line
//! that is still being written. Lines that do not decode are skipped, logged
//! and counted in the `ScanReport`; they never abort a scan.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{sort_chronologically, RecordStore, StoreStats};
use crate::errors::StoreResult;
use crate::record::{RecordId, SensorRecord};

/// Result of a full scan of the backing file
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Decoded records, timestamp ascending
    pub records: Vec<SensorRecord>,
    /// Lines that failed to decode
    pub skipped_lines: usize,
}

/// Append-only JSON Lines record store
///
/// ## Example
///
/// ```rust,no_run
/// use tirair_core::{JsonLinesStore, RecordStore};
///
/// let store = JsonLinesStore::open("data/sensor_data.jsonl")?;
/// for record in store.query_all()? {
///     println!("{} {:.1}°C", record.timestamp, record.temperature);
/// }
/// # Ok::<(), tirair_core::StorageError>(())
/// ```
#[derive(Debug)]
pub struct JsonLinesStore {
    /// Backing file
    path: PathBuf,
    /// Id handed to the next successful insert (readable records so far)
    next_id: u64,
    /// Statistics
    stats: StoreStats,
}

impl JsonLinesStore {
    /// Open (or prepare) a store at `path`
    ///
    /// Missing parent directories are created. The file itself is created on
    /// the first insert; a missing file reads as an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let next_id = count_records(&path)? as u64;
        log::debug!("opened record store {} ({} existing records)", path.display(), next_id);

        Ok(Self {
            path,
            next_id,
            stats: StoreStats::default(),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write statistics for this handle
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = StoreStats::default();
    }

    /// Read every record, reporting undecodable lines
    pub fn scan(&self) -> StoreResult<ScanReport> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ScanReport::default()),
            Err(e) => return Err(e.into()),
        };

        let mut report = ScanReport::default();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SensorRecord>(line) {
                Ok(record) => report.records.push(record),
                Err(e) => {
                    log::warn!(
                        "{}:{}: skipping undecodable record: {}",
                        self.path.display(),
                        index + 1,
                        e
                    );
                    report.skipped_lines += 1;
                }
            }
        }

        sort_chronologically(&mut report.records);
        Ok(report)
    }

    /// Acquire, append, sync, release
    ///
    /// Returns the number of bytes written, including a newline inserted to
    /// close off a torn trailing line.
    fn append_line(&self, line: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if ends_with_newline(&mut file)? {
            file.write_all(line)?;
            file.sync_data()?;
            return Ok(line.len());
        }

        log::warn!(
            "{}: terminating torn trailing line before append",
            self.path.display()
        );
        let mut repaired = Vec::with_capacity(line.len() + 1);
        repaired.push(b'\n');
        repaired.extend_from_slice(line);
        file.write_all(&repaired)?;
        file.sync_data()?;
        Ok(repaired.len())
    }
}

impl RecordStore for JsonLinesStore {
    fn insert(&mut self, record: &SensorRecord) -> StoreResult<RecordId> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let written = match self.append_line(&line) {
            Ok(written) => written,
            Err(e) => {
                self.stats.write_failures += 1;
                return Err(e.into());
            }
        };

        let id = RecordId(self.next_id);
        self.next_id += 1;
        self.stats.records_written += 1;
        self.stats.bytes_written += written as u64;
        Ok(id)
    }

    fn query_all(&self) -> StoreResult<Vec<SensorRecord>> {
        Ok(self.scan()?.records)
    }
}

/// Whether the file is empty or its last byte is a newline
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Count decodable records of an existing file (zero if absent)
fn count_records(path: &Path) -> io::Result<usize> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .filter(|line| serde_json::from_str::<SensorRecord>(line).is_ok())
            .count()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Reading, Valve};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn record(offset_min: i64, temperature: f64) -> SensorRecord {
        Reading {
            temperature,
            humidity: 60.0,
            raining: true,
            valve: Valve::Closed,
        }
        .stamp(Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap() + Duration::minutes(offset_min))
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesStore::open(dir.path().join("nested/records.jsonl")).unwrap();
        assert!(store.query_all().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn insert_then_read_back() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonLinesStore::open(dir.path().join("records.jsonl")).unwrap();

        let first = record(0, 20.0);
        let second = record(5, 21.0);
        assert_eq!(store.insert(&first).unwrap(), RecordId(0));
        assert_eq!(store.insert(&second).unwrap(), RecordId(1));

        assert_eq!(store.query_all().unwrap(), vec![first, second]);
        assert_eq!(store.stats().records_written, 2);
        assert!(store.stats().bytes_written > 0);
    }

    #[test]
    fn ids_continue_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut store = JsonLinesStore::open(&path).unwrap();
        store.insert(&record(0, 20.0)).unwrap();
        store.insert(&record(1, 20.5)).unwrap();
        drop(store);

        let mut reopened = JsonLinesStore::open(&path).unwrap();
        assert_eq!(reopened.insert(&record(2, 21.0)).unwrap(), RecordId(2));
        assert_eq!(reopened.len().unwrap(), 3);
    }

    #[test]
    fn torn_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut store = JsonLinesStore::open(&path).unwrap();
        store.insert(&record(0, 20.0)).unwrap();

        // Simulate a concurrent writer caught mid-line
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"timestamp\":\"2024-07-01T06:").unwrap();

        let report = store.scan().unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn insert_after_crash_mid_line_is_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut store = JsonLinesStore::open(&path).unwrap();
        store.insert(&record(0, 1.0)).unwrap();
        drop(store);

        // Crash left a fragment without a newline
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"timestamp\":\"2024").unwrap();
        drop(file);

        let mut reopened = JsonLinesStore::open(&path).unwrap();
        assert_eq!(reopened.insert(&record(1, 2.0)).unwrap(), RecordId(1));

        let report = reopened.scan().unwrap();
        let temps: Vec<f64> = report.records.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![1.0, 2.0]);
        assert_eq!(report.skipped_lines, 1);

        // The fragment is now isolated; later inserts need no repair
        let before = fs::metadata(&path).unwrap().len();
        reopened.insert(&record(2, 3.0)).unwrap();
        let line_len = serde_json::to_vec(&record(2, 3.0)).unwrap().len() as u64 + 1;
        assert_eq!(fs::metadata(&path).unwrap().len(), before + line_len);
        assert_eq!(reopened.len().unwrap(), 3);
    }

    #[test]
    fn scan_sorts_backfilled_records() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonLinesStore::open(dir.path().join("records.jsonl")).unwrap();
        store.insert(&record(10, 2.0)).unwrap();
        store.insert(&record(0, 1.0)).unwrap();

        let temps: Vec<f64> = store.query_all().unwrap().iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![1.0, 2.0]);
    }

    #[test]
    fn unwritable_location_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every append fail
        let path = dir.path().join("records.jsonl");
        fs::create_dir(&path).unwrap();

        let mut store = JsonLinesStore::open(&path).unwrap_or_else(|_| JsonLinesStore {
            path: path.clone(),
            next_id: 0,
            stats: StoreStats::default(),
        });
        assert!(store.insert(&record(0, 20.0)).is_err());
        assert_eq!(store.stats().write_failures, 1);
    }
}
