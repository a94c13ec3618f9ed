//! Time sources for the lending engine.

use std::{cell::Cell, rc::Rc};

use chrono::{DateTime, TimeDelta, Utc};

/// Supplies the current time to the lending engine
pub trait Clock {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock
///
/// Clones share the same instant, so a test can keep one handle and move
/// time forward while the library owns another.
#[derive(Debug, Clone)]
pub struct FixedClock {
    /// Shared current instant
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Rc::new(Cell::new(now)) }
    }

    /// Move the clock forward (or backward, for a negative delta)
    ///
    /// Saturates at the representable range instead of overflowing.
    pub fn advance(&self, delta: TimeDelta) {
        let current = self.now.get();
        self.now.set(current.checked_add_signed(delta).unwrap_or(current));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
