//! Wall-clock access.
//!
//! Streaks are counted in local calendar days while timestamps are stored in
//! UTC, so every mutation reads both through a [`Moment`].

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::cell::Cell;

/// A point in time paired with the local calendar day it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// UTC timestamp.
    pub at: DateTime<Utc>,
    /// Local calendar day.
    pub day: NaiveDate,
}

impl Moment {
    /// Build a moment from a local timestamp.
    pub fn from_local(local: DateTime<Local>) -> Self {
        Self {
            at: local.with_timezone(&Utc),
            day: local.date_naive(),
        }
    }
}

/// Source of the current time.
pub trait Clock {
    /// Current moment.
    fn now(&self) -> Moment;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().day
    }
}

/// The system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment::from_local(Local::now())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<Moment>,
}

impl ManualClock {
    /// Start at midday UTC on the given day.
    pub fn on(day: NaiveDate) -> Self {
        let at = day
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self {
            current: Cell::new(Moment { at, day }),
        }
    }

    /// Jump to another day.
    pub fn set_day(&self, day: NaiveDate) {
        let at = day
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(self.current.get().at);
        self.current.set(Moment { at, day });
    }

    /// Move forward by whole days.
    pub fn advance_days(&self, days: u64) {
        let current = self.current.get();
        let day = current
            .day
            .checked_add_days(chrono::Days::new(days))
            .unwrap_or(current.day);
        self.set_day(day);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        self.current.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_days() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let clock = ManualClock::on(start);
        assert_eq!(clock.today(), start);

        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_moment_from_local_keeps_local_day() {
        let local = Local::now();
        let moment = Moment::from_local(local);
        assert_eq!(moment.day, local.date_naive());
        assert_eq!(moment.at, local.with_timezone(&Utc));
    }
}
