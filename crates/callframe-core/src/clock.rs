//! Time source abstraction.
//!
//! Error entries and call lifecycle fields carry a [`Timestamp`]. Taking time
//! from a [`Clock`] instead of the system keeps premount-error filtering and
//! stale-error detection deterministic under simulation.

use std::{
    cell::Cell,
    time::{SystemTime, UNIX_EPOCH},
};

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const ZERO: Self = Self(0);

    /// Timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Timestamp `millis` later than this one (saturating).
    #[must_use]
    pub const fn plus_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

/// Source of timestamps.
///
/// # Invariants
///
/// - `now()` never goes backwards within one clock instance.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by [`SystemTime`].
///
/// Wall time can step backwards when the host clock is adjusted. Readings
/// are clamped to the latest one returned so far.
#[derive(Debug, Default)]
pub struct SystemClock {
    latest: Cell<u64>,
}

impl SystemClock {
    /// Create a clock with no prior reading.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Clocks set before 1970 collapse to the epoch rather than failing.
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        let millis = wall.max(self.latest.get());
        self.latest.set(millis);
        Timestamp(millis)
    }
}
