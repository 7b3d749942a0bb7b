//! Time management for ingestion
//!
//! Provides a clock abstraction so that the ingestion handler can be driven
//! by the system clock in production and by a controllable clock in tests:
//! - `SystemClock`: wall clock time (may jump due to NTP)
//! - `FixedClock`: settable time shared between a test and the code under test

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Microseconds per hour
const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

/// Source of ingestion timestamps
///
/// ## Implementation Requirements
///
/// - `now()` must be callable from the transport driver's task
/// - Wall clock sources may go backwards; downstream consumers clamp
///   negative intervals rather than trusting monotonicity
pub trait TimeSource: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Check if this source provides wall clock time (vs a test clock)
    fn is_wall_clock(&self) -> bool {
        true
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed time source for testing
///
/// Clones share the same instant, so a test can keep one handle and advance
/// time while the code under test reads from another.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to an absolute instant (may go backwards)
    pub fn set(&self, timestamp: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = timestamp;
    }

    /// Move forward by `delta`
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + delta;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Drop sub-microsecond precision
pub fn truncate_to_micros(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}

/// Signed interval from `earlier` to `later` in fractional hours
///
/// Negative when the clock went backwards; callers decide how to clamp.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later.signed_duration_since(earlier);
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / MICROS_PER_HOUR,
        // Only reachable for spans of ~290k years
        None => delta.num_milliseconds() as f64 / 3_600_000.0,
    }
}
