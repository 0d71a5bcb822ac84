//! Consecutive-day study streaks.
//!
//! There is one transition, [`StreakState::record_study`]. The ledger applies
//! it on every review; the activity-log view replays it over the logged days,
//! so both always agree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Streak bookkeeping carried by the progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    /// Consecutive study days ending on `last_study_date`.
    pub streak_days: u32,
    /// Last local day with a review.
    pub last_study_date: Option<NaiveDate>,
}

impl StreakState {
    /// Apply a study session on `today`.
    pub fn record_study(self, today: NaiveDate) -> Self {
        let Some(last) = self.last_study_date else {
            return Self::started(today);
        };

        if last == today {
            return self;
        }

        if last > today {
            tracing::warn!(%last, %today, "study day is before last study date, keeping streak");
            return self;
        }

        if last.succ_opt() == Some(today) {
            Self {
                streak_days: self.streak_days.saturating_add(1),
                last_study_date: Some(today),
            }
        } else {
            Self::started(today)
        }
    }

    /// The streak as it should be shown on `today`: lapsed streaks read as 0.
    ///
    /// A last study day after `today` (the local day moved backwards) still
    /// counts as live.
    pub fn current_as_of(&self, today: NaiveDate) -> u32 {
        let Some(last) = self.last_study_date else {
            return 0;
        };
        let live = match today.pred_opt() {
            Some(yesterday) => last >= yesterday,
            None => true,
        };
        if live {
            self.streak_days
        } else {
            0
        }
    }

    fn started(today: NaiveDate) -> Self {
        Self {
            streak_days: 1,
            last_study_date: Some(today),
        }
    }
}

/// Replay the streak transition over a set of study days, oldest first.
pub fn replay(days: impl IntoIterator<Item = NaiveDate>) -> StreakState {
    let ordered: BTreeSet<NaiveDate> = days.into_iter().collect();
    ordered
        .into_iter()
        .fold(StreakState::default(), StreakState::record_study)
}

/// Current streak derived from an activity log.
///
/// Only activity today, yesterday or on a later day keeps a streak alive.
pub fn streak_from_activity(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    replay(days).current_as_of(today)
}

/// Longest run of consecutive days in the log.
pub fn longest_streak(days: impl IntoIterator<Item = NaiveDate>) -> u32 {
    let ordered: BTreeSet<NaiveDate> = days.into_iter().collect();
    let mut best = 0;
    let mut state = StreakState::default();
    for day in ordered {
        state = state.record_study(day);
        best = best.max(state.streak_days);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_first_study_starts_streak() {
        let state = StreakState::default().record_study(day(10));
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_study_date, Some(day(10)));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let state = StreakState::default().record_study(day(10));
        let again = state.record_study(day(10));
        assert_eq!(state, again);
    }

    #[test]
    fn test_consecutive_days_increment() {
        let state = StreakState::default()
            .record_study(day(10))
            .record_study(day(11))
            .record_study(day(12));
        assert_eq!(state.streak_days, 3);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let state = StreakState::default()
            .record_study(day(10))
            .record_study(day(11))
            .record_study(day(13));
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_study_date, Some(day(13)));
    }

    #[test]
    fn test_month_and_year_boundaries() {
        let dec31 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let state = StreakState::default().record_study(dec31).record_study(jan1);
        assert_eq!(state.streak_days, 2);

        let feb28 = NaiveDate::from_ymd_opt(2023, 2, 28).unwrap();
        let mar1 = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let state = StreakState::default().record_study(feb28).record_study(mar1);
        assert_eq!(state.streak_days, 2);
    }

    #[test]
    fn test_clock_moving_backwards_keeps_state() {
        let state = StreakState::default()
            .record_study(day(10))
            .record_study(day(11));
        assert_eq!(state.record_study(day(9)), state);
    }

    #[test]
    fn test_revisiting_an_earlier_day_agrees_with_log() {
        let mut ledger = StreakState::default();
        let mut log = Vec::new();
        for d in [day(1), day(2), day(3), day(2)] {
            ledger = ledger.record_study(d);
            log.push(d);
            assert_eq!(ledger.current_as_of(d), streak_from_activity(log.clone(), d));
        }
        assert_eq!(ledger.current_as_of(day(2)), 3);
        assert_eq!(ledger.current_as_of(day(4)), 3);
        assert_eq!(ledger.current_as_of(day(5)), 0);
    }

    #[test]
    fn test_current_as_of_lapses() {
        let state = StreakState::default()
            .record_study(day(10))
            .record_study(day(11));
        assert_eq!(state.current_as_of(day(11)), 2);
        assert_eq!(state.current_as_of(day(12)), 2);
        assert_eq!(state.current_as_of(day(13)), 0);
        assert_eq!(StreakState::default().current_as_of(day(13)), 0);
    }

    #[test]
    fn test_activity_streak_starts_today_or_yesterday() {
        let log = [day(8), day(9), day(10)];
        assert_eq!(streak_from_activity(log, day(10)), 3);
        assert_eq!(streak_from_activity(log, day(11)), 3);
        assert_eq!(streak_from_activity(log, day(12)), 0);
    }

    #[test]
    fn test_activity_streak_stops_at_first_gap() {
        let log = [day(3), day(4), day(6), day(7)];
        assert_eq!(streak_from_activity(log, day(7)), 2);
    }

    #[test]
    fn test_activity_streak_ignores_order_and_duplicates() {
        let log = [day(7), day(5), day(6), day(6)];
        assert_eq!(streak_from_activity(log, day(7)), 3);
        assert_eq!(streak_from_activity(Vec::new(), day(7)), 0);
    }

    #[test]
    fn test_longest_streak() {
        let log = [day(1), day(2), day(3), day(5), day(6)];
        assert_eq!(longest_streak(log), 3);
        assert_eq!(longest_streak(Vec::new()), 0);
    }

    proptest! {
        #[test]
        fn prop_ledger_and_log_agree(offsets in prop::collection::btree_set(0u64..40, 0..25)) {
            let start = day(1);
            let days: Vec<NaiveDate> = offsets
                .iter()
                .map(|o| start.checked_add_days(chrono::Days::new(*o)).unwrap())
                .collect();
            let today = start.checked_add_days(chrono::Days::new(40)).unwrap();

            let mut ledger = StreakState::default();
            for d in &days {
                ledger = ledger.record_study(*d);
            }

            prop_assert_eq!(ledger.current_as_of(today), streak_from_activity(days.clone(), today));
            if let Some(last) = days.last() {
                prop_assert_eq!(ledger.streak_days, streak_from_activity(days.clone(), *last));
            }
        }

        #[test]
        fn prop_agree_after_local_day_moves_back(
            offsets in prop::collection::btree_set(0u64..30, 1..20),
            back in 0usize..20,
        ) {
            let start = day(1);
            let mut days: Vec<NaiveDate> = offsets
                .iter()
                .map(|o| start.checked_add_days(chrono::Days::new(*o)).unwrap())
                .collect();
            let revisit = days[back % days.len()];
            days.push(revisit);

            let mut ledger = StreakState::default();
            for d in &days {
                ledger = ledger.record_study(*d);
            }

            prop_assert_eq!(ledger.current_as_of(revisit), streak_from_activity(days.clone(), revisit));
        }
    }
}
