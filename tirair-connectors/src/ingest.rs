//! Per-message ingestion: parse, stamp, store
//!
//! ## Failure Policy
//!
//! | Failure            | Outcome    | Store      | Loop      |
//! |--------------------|------------|------------|-----------|
//! | payload unparsable | `Rejected` | untouched  | continues |
//! | insert failed      | `Failed`   | untouched  | continues |
//!
//! A failed insert loses the message. By default there is no retry, which
//! keeps delivery at-most-once. `with_store_retries(n)` re-attempts the same
//! record up to `n` more times before giving up; retries happen inline,
//! before the next message is polled.

use std::fmt;

use tirair_core::{
    parse_bytes, ParseError, RecordId, RecordStore, SensorRecord, StorageError, TimeSource,
};

/// Receives each inbound message from a transport driver
///
/// Called once per message, in arrival order. The driver does not poll the
/// next message until `handle` returns.
pub trait MessageHandler {
    /// Process one payload
    fn handle(&mut self, topic: &str, payload: &[u8]) -> HandleOutcome;
}

/// What happened to one message
#[derive(Debug)]
pub enum HandleOutcome {
    /// Parsed and persisted
    Stored(RecordId),
    /// Dropped: the payload did not parse
    Rejected(ParseError),
    /// Dropped: the store refused the record
    Failed(StorageError),
}

impl HandleOutcome {
    /// Whether the message reached the store
    pub fn is_stored(&self) -> bool {
        matches!(self, HandleOutcome::Stored(_))
    }
}

/// Running totals for an ingestion session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages handed to the handler
    pub received: u64,
    /// Records persisted
    pub stored: u64,
    /// Payloads that failed to parse
    pub rejected: u64,
    /// Records lost to storage errors
    pub failed: u64,
    /// Extra insert attempts made
    pub retries: u64,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} stored={} rejected={} failed={}",
            self.received, self.stored, self.rejected, self.failed
        )?;
        if self.retries > 0 {
            write!(f, " retries={}", self.retries)?;
        }
        Ok(())
    }
}

/// Parses telemetry payloads and appends them to a record store
pub struct IngestionHandler<S, C> {
    store: S,
    clock: C,
    store_retries: u32,
    stats: IngestStats,
}

impl<S, C> IngestionHandler<S, C>
where
    S: RecordStore,
    C: TimeSource,
{
    /// Handler stamping records with `clock` and writing to `store`
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            store_retries: 0,
            stats: IngestStats::default(),
        }
    }

    /// Re-attempt a failed insert up to `retries` more times
    pub fn with_store_retries(mut self, retries: u32) -> Self {
        self.store_retries = retries;
        self
    }

    /// Session totals
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the store
    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&mut self, topic: &str, record: &SensorRecord) -> HandleOutcome {
        let mut attempt = 0;
        loop {
            match self.store.insert(record) {
                Ok(id) => {
                    self.stats.stored += 1;
                    log::debug!("stored record {} from {}", id, topic);
                    return HandleOutcome::Stored(id);
                }
                Err(e) if attempt < self.store_retries => {
                    attempt += 1;
                    self.stats.retries += 1;
                    log::warn!(
                        "insert failed ({}), retry {}/{}",
                        e,
                        attempt,
                        self.store_retries
                    );
                }
                Err(e) => {
                    self.stats.failed += 1;
                    log::error!("record from {} lost: {}", topic, e);
                    return HandleOutcome::Failed(e);
                }
            }
        }
    }
}

impl<S, C> MessageHandler for IngestionHandler<S, C>
where
    S: RecordStore,
    C: TimeSource,
{
    fn handle(&mut self, topic: &str, payload: &[u8]) -> HandleOutcome {
        self.stats.received += 1;
        log::debug!("received {} byte(s) on {}", payload.len(), topic);

        let reading = match parse_bytes(payload) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.rejected += 1;
                log::warn!(
                    "dropping payload on {}: {} ({:?})",
                    topic,
                    e,
                    String::from_utf8_lossy(payload)
                );
                return HandleOutcome::Rejected(e);
            }
        };

        let record = reading.stamp(self.clock.now());
        self.persist(topic, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tirair_core::{FixedClock, MemoryStore, Valve};

    const GOOD: &[u8] = b"Temperature: 28.5 C, Humidity: 66 %, Raining: false, Valve: Closed";

    fn handler() -> (IngestionHandler<MemoryStore, FixedClock>, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        (IngestionHandler::new(MemoryStore::new(), clock.clone()), clock)
    }

    #[test]
    fn test_good_payload_is_stored() {
        let (mut handler, clock) = handler();
        let outcome = handler.handle("cpc357", GOOD);

        assert!(matches!(outcome, HandleOutcome::Stored(RecordId(0))));
        let stored = &handler.store().as_slice()[0];
        assert_eq!(stored.temperature, 28.5);
        assert_eq!(stored.humidity, 66.0);
        assert!(!stored.raining);
        assert_eq!(stored.valve, Valve::Closed);
        assert_eq!(stored.timestamp, clock.now());
    }

    #[test]
    fn test_timestamp_comes_from_clock() {
        let (mut handler, clock) = handler();
        handler.handle("cpc357", GOOD);
        clock.advance(Duration::minutes(5));
        handler.handle("cpc357", GOOD);

        let records = handler.store().as_slice();
        assert_eq!(records[1].timestamp - records[0].timestamp, Duration::minutes(5));
    }

    #[test]
    fn test_bad_payload_never_touches_store() {
        let (mut handler, _) = handler();
        let outcome = handler.handle("cpc357", b"Temperature: 28.5 C, Humidity: 66 %");

        assert!(matches!(
            outcome,
            HandleOutcome::Rejected(ParseError::MissingKey { key: "raining" })
        ));
        assert!(handler.store().as_slice().is_empty());
        assert_eq!(handler.stats().rejected, 1);
    }

    #[test]
    fn test_non_utf8_is_rejected() {
        let (mut handler, _) = handler();
        let outcome = handler.handle("cpc357", &[0xff, 0xfe, 0x00]);
        assert!(matches!(
            outcome,
            HandleOutcome::Rejected(ParseError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_storage_failure_drops_message_and_continues() {
        let (mut handler, _) = handler();
        handler.store_mut().set_available(false);
        let outcome = handler.handle("cpc357", GOOD);
        assert!(matches!(outcome, HandleOutcome::Failed(_)));

        handler.store_mut().set_available(true);
        assert!(handler.handle("cpc357", GOOD).is_stored());

        let stats = handler.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retries, 0);
        assert_eq!(handler.store().as_slice().len(), 1);
    }

    #[test]
    fn test_retries_are_bounded() {
        let (handler, _) = handler();
        let mut handler = handler.with_store_retries(2);
        handler.store_mut().set_available(false);

        assert!(matches!(handler.handle("cpc357", GOOD), HandleOutcome::Failed(_)));
        assert_eq!(handler.stats().retries, 2);
        assert_eq!(handler.store().stats().write_failures, 3);
    }

    #[test]
    fn test_stats_display() {
        let stats = IngestStats {
            received: 5,
            stored: 3,
            rejected: 1,
            failed: 1,
            retries: 0,
        };
        assert_eq!(stats.to_string(), "received=5 stored=3 rejected=1 failed=1");
    }
}
