//! Manually advanced clock.

use std::{cell::Cell, rc::Rc};

use callframe_core::{Clock, Timestamp};

/// Start of simulated time: 2023-11-14T22:13:20Z.
const EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Clock that only moves when [`ManualClock::advance`] is called.
///
/// Clones share the same time, so a test can hand one clone to a store and
/// keep another to move time forward.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Rc<Cell<u64>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Clock at the start of simulated time.
    pub fn new() -> Self {
        Self::starting_at(Timestamp::from_millis(EPOCH_MILLIS))
    }

    /// Clock at the given time.
    pub fn starting_at(start: Timestamp) -> Self {
        Self { millis: Rc::new(Cell::new(start.as_millis())) }
    }

    /// Move time forward.
    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get().saturating_add(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.get())
    }
}
