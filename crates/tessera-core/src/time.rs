//! Wall-clock timestamps and the injectable clock seam.
//!
//! Reconciliation decisions (pruning cutoffs, migration cut-overs, staleness
//! windows) compare wall-clock instants read at a point in time. Components
//! never call the system clock directly; they hold a `Clock` so tests can
//! drive time manually.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A UTC wall-clock instant with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The Unix epoch.
    pub fn epoch() -> Self {
        Self(DateTime::UNIX_EPOCH)
    }

    /// Wrap a chrono instant.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Build a timestamp from microseconds since the Unix epoch.
    ///
    /// Values outside chrono's representable range are clamped to the epoch;
    /// inputs come from our own serialization, so out-of-range values only
    /// appear in corrupted data.
    pub fn from_micros(micros: i64) -> Self {
        Self(
            Utc.timestamp_micros(micros)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }

    /// Microseconds since the Unix epoch.
    pub fn as_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// This instant moved backwards by `duration`, saturating on overflow.
    pub fn minus(&self, duration: Duration) -> Self {
        let delta = ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX);
        Self(self.0.checked_sub_signed(delta).unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// This instant moved forwards by `duration`, saturating on overflow.
    pub fn plus(&self, duration: Duration) -> Self {
        let delta = ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX);
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// The underlying chrono instant.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Clock seam so components never read the system clock directly.
pub trait Clock: Send + Sync {
    /// The current wall-clock instant.
    fn now(&self) -> Timestamp;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(Utc::now())
    }
}
