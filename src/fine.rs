//! Loan period and late fine rules.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Days a book may be kept before it is late
pub const LOAN_PERIOD_DAYS: i64 = 15;

/// Fine charged for each day (or fraction of a day) a book is late
pub const FINE_PER_DAY: f64 = 1.0;

/// Milliseconds in one day
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Penalty for a late book
///
/// Informational only: fines are reported at the desk, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Fine {
    /// Fractional days past the due date, always positive
    pub days_late: f64,
    /// `days_late` times the per-day rate
    pub amount: f64,
}

/// How long loans last and what lateness costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinePolicy {
    /// Time between lending a book and its due date
    pub loan_period: TimeDelta,
    /// Fine per day late
    pub fine_per_day: f64,
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self { loan_period: TimeDelta::days(LOAN_PERIOD_DAYS), fine_per_day: FINE_PER_DAY }
    }
}

impl FinePolicy {
    /// Due date for a book lent at `lent_at`
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn due_date(&self, lent_at: DateTime<Utc>) -> DateTime<Utc> {
        lent_at + self.loan_period
    }

    /// Fractional days between `due` and `now`
    ///
    /// Negative while the book is not yet due.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn days_late(due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        now.signed_duration_since(due).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    /// The fine owed at `now` for a book due at `due`, if it is late at all
    #[must_use]
    pub fn fine_for(&self, due: DateTime<Utc>, now: DateTime<Utc>) -> Option<Fine> {
        let days_late = Self::days_late(due, now);
        (days_late > 0.0).then(|| Fine { days_late, amount: days_late * self.fine_per_day })
    }
}
