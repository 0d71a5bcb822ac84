//! The progress record and its pure update functions.
//!
//! Every update takes the old record by reference and returns a
//! [`ProgressTransition`] holding the new one, so the ledger's behavior is a
//! function of `(old state, event)` and can be replayed in tests.

use crate::badges::{self, Badge, BadgeId, BadgeMetrics};
use crate::clock::Moment;
use crate::streak::StreakState;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// XP for a review marked known.
pub const XP_KNOWN: u64 = 10;
/// XP for a review marked unknown.
pub const XP_UNKNOWN: u64 = 5;
/// XP needed to leave level 1.
pub const BASE_LEVEL_XP: f64 = 100.0;
/// Growth of the level threshold per level.
pub const LEVEL_GROWTH: f64 = 1.5;

/// XP needed to advance from `level` to the next one.
///
/// `floor(100 * 1.5^(level - 1))`, saturating at `u64::MAX`.
pub fn xp_to_next_level(level: u32) -> u64 {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    // f64 -> u64 casts saturate.
    (BASE_LEVEL_XP * LEVEL_GROWTH.powi(exponent)).floor() as u64
}

/// XP granted for one review.
pub fn review_xp(known: bool) -> u64 {
    if known {
        XP_KNOWN
    } else {
        XP_UNKNOWN
    }
}

/// Cumulative learner progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Current level, starting at 1.
    pub level: u32,
    /// XP into the current level.
    pub xp: u64,
    /// XP needed to reach the next level.
    pub xp_to_next_level: u64,
    /// XP earned over the record's lifetime.
    pub total_xp_earned: u64,
    /// Consecutive study days.
    pub streak_days: u32,
    /// Last local day with a review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_study_date: Option<NaiveDate>,
    /// Reviews recorded.
    pub cards_reviewed: u64,
    /// Reviews marked known.
    pub cards_known: u64,
    /// Badge catalog with earned state.
    pub badges: Vec<Badge>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_to_next_level: xp_to_next_level(1),
            total_xp_earned: 0,
            streak_days: 0,
            last_study_date: None,
            cards_reviewed: 0,
            cards_known: 0,
            badges: badges::catalog(),
        }
    }
}

/// Why the record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// XP granted directly.
    XpGranted(u64),
    /// A card was reviewed.
    CardReviewed { known: bool },
    /// The record was reset to defaults.
    Reset,
}

/// Outcome of applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTransition {
    /// The new record.
    pub progress: UserProgress,
    /// Levels gained.
    pub level_ups: u32,
    /// Badges earned.
    pub new_badges: Vec<BadgeId>,
}

impl UserProgress {
    /// Apply an event.
    pub fn apply(&self, event: ProgressEvent, moment: Moment) -> ProgressTransition {
        match event {
            ProgressEvent::XpGranted(amount) => self.add_xp(amount, moment.at),
            ProgressEvent::CardReviewed { known } => self.record_card_review(known, moment),
            ProgressEvent::Reset => self.reset(),
        }
    }

    /// The default record, every badge unearned.
    pub fn reset(&self) -> ProgressTransition {
        ProgressTransition {
            progress: Self::default(),
            level_ups: 0,
            new_badges: Vec::new(),
        }
    }

    /// Grant XP, applying every level-up it pays for, then evaluate badges.
    pub fn add_xp(&self, amount: u64, now: DateTime<Utc>) -> ProgressTransition {
        let (leveled, level_ups) = self.with_xp(amount);
        leveled.finish(level_ups, now)
    }

    /// Count a review, grant its XP, advance the streak, then evaluate badges.
    pub fn record_card_review(&self, known: bool, moment: Moment) -> ProgressTransition {
        let mut next = self.clone();
        next.cards_reviewed = next.cards_reviewed.saturating_add(1);
        if known {
            next.cards_known = next.cards_known.saturating_add(1);
        }

        let (mut next, level_ups) = next.with_xp(review_xp(known));

        let streak = next.streak().record_study(moment.day);
        next.streak_days = streak.streak_days;
        next.last_study_date = streak.last_study_date;

        next.finish(level_ups, moment.at)
    }

    /// Streak fields as a [`StreakState`].
    pub fn streak(&self) -> StreakState {
        StreakState {
            streak_days: self.streak_days,
            last_study_date: self.last_study_date,
        }
    }

    /// Streak to display on `today`.
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        self.streak().current_as_of(today)
    }

    /// Progress through the current level, 0..=100.
    pub fn level_percent(&self) -> u8 {
        if self.xp_to_next_level == 0 {
            return 100;
        }
        let percent = (u128::from(self.xp) * 100) / u128::from(self.xp_to_next_level);
        percent.min(100) as u8
    }

    /// Share of reviews marked known, 0.0..=1.0.
    pub fn accuracy(&self) -> f64 {
        if self.cards_reviewed == 0 {
            0.0
        } else {
            self.cards_known as f64 / self.cards_reviewed as f64
        }
    }

    /// Number of earned badges.
    pub fn earned_badge_count(&self) -> usize {
        self.badges.iter().filter(|b| b.earned).count()
    }

    /// Whether a badge has been earned.
    pub fn has_badge(&self, id: BadgeId) -> bool {
        self.badges.iter().any(|b| b.id == id && b.earned)
    }

    /// Repair a record read from storage.
    ///
    /// Returns `None` when the record cannot be trusted at all.
    pub fn normalized(mut self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }

        self.xp_to_next_level = xp_to_next_level(self.level);
        let (mut fixed, _) = self.with_xp(0);
        fixed.cards_known = fixed.cards_known.min(fixed.cards_reviewed);
        fixed.badges = badges::reconcile(&fixed.badges);
        Some(fixed)
    }

    fn metrics(&self) -> BadgeMetrics {
        BadgeMetrics {
            cards_reviewed: self.cards_reviewed,
            streak_days: self.streak_days,
            level: self.level,
        }
    }

    fn with_xp(&self, amount: u64) -> (Self, u32) {
        let mut next = self.clone();
        next.xp = next.xp.saturating_add(amount);
        next.total_xp_earned = next.total_xp_earned.saturating_add(amount);

        let mut level_ups = 0;
        let mut threshold = xp_to_next_level(next.level);
        while next.xp >= threshold {
            next.xp -= threshold;
            next.level = next.level.saturating_add(1);
            level_ups += 1;
            threshold = xp_to_next_level(next.level);
        }
        next.xp_to_next_level = threshold;

        (next, level_ups)
    }

    fn finish(self, level_ups: u32, now: DateTime<Utc>) -> ProgressTransition {
        let evaluation = badges::evaluate(&self.badges, &self.metrics(), now);
        ProgressTransition {
            progress: Self {
                badges: evaluation.badges,
                ..self
            },
            level_ups,
            new_badges: evaluation.newly_earned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use proptest::prelude::*;

    fn clock() -> ManualClock {
        ManualClock::on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(xp_to_next_level(1), 100);
        assert_eq!(xp_to_next_level(2), 150);
        assert_eq!(xp_to_next_level(3), 225);
        assert_eq!(xp_to_next_level(4), 337);
        assert_eq!(xp_to_next_level(5), 506);
        assert_eq!(xp_to_next_level(500), u64::MAX);
    }

    #[test]
    fn test_default_record() {
        let progress = UserProgress::default();
        assert_eq!(progress.level, 1);
        assert_eq!(progress.xp, 0);
        assert_eq!(progress.xp_to_next_level, 100);
        assert_eq!(progress.streak_days, 0);
        assert!(progress.last_study_date.is_none());
        assert_eq!(progress.badges.len(), 8);
        assert_eq!(progress.earned_badge_count(), 0);
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let now = clock().now().at;
        let result = UserProgress::default().add_xp(99, now);
        assert_eq!(result.progress.level, 1);
        assert_eq!(result.progress.xp, 99);

        let result = result.progress.add_xp(1, now);
        assert_eq!(result.progress.level, 2);
        assert_eq!(result.progress.xp, 0);
        assert_eq!(result.progress.xp_to_next_level, 150);
        assert_eq!(result.level_ups, 1);
    }

    #[test]
    fn test_multi_level_rollover() {
        let now = clock().now().at;
        let grant = xp_to_next_level(1) + xp_to_next_level(2);
        let result = UserProgress::default().add_xp(grant, now);
        assert_eq!(result.progress.level, 3);
        assert_eq!(result.progress.xp, 0);
        assert_eq!(result.progress.total_xp_earned, 250);
        assert_eq!(result.level_ups, 2);
    }

    #[test]
    fn test_large_grant_unlocks_level_badges() {
        let now = clock().now().at;
        let grant: u64 = (1..10).map(xp_to_next_level).sum();
        let result = UserProgress::default().add_xp(grant, now);
        assert_eq!(result.progress.level, 10);
        assert!(result.new_badges.contains(&BadgeId::Level5));
        assert!(result.new_badges.contains(&BadgeId::Level10));
        assert!(!result.new_badges.contains(&BadgeId::FirstReview));
    }

    #[test]
    fn test_record_reviews() {
        let clock = clock();
        let first = UserProgress::default().record_card_review(true, clock.now());
        assert_eq!(first.new_badges, vec![BadgeId::FirstReview]);

        let second = first.progress.record_card_review(false, clock.now());
        let progress = second.progress;
        assert_eq!(progress.cards_reviewed, 2);
        assert_eq!(progress.cards_known, 1);
        assert_eq!(progress.xp, 15);
        assert_eq!(progress.total_xp_earned, 15);
        assert_eq!(progress.accuracy(), 0.5);
        assert_eq!(UserProgress::default().accuracy(), 0.0);
        assert!(progress.has_badge(BadgeId::FirstReview));
        assert!(second.new_badges.is_empty());
    }

    #[test]
    fn test_review_updates_streak_by_calendar_day() {
        let clock = clock();
        let mut progress = UserProgress::default();

        progress = progress.record_card_review(true, clock.now()).progress;
        progress = progress.record_card_review(true, clock.now()).progress;
        assert_eq!(progress.streak_days, 1);

        clock.advance_days(1);
        progress = progress.record_card_review(true, clock.now()).progress;
        assert_eq!(progress.streak_days, 2);

        clock.advance_days(1);
        let result = progress.record_card_review(false, clock.now());
        assert_eq!(result.progress.streak_days, 3);
        assert!(result.new_badges.contains(&BadgeId::ThreeDayStreak));
        progress = result.progress;

        clock.advance_days(2);
        progress = progress.record_card_review(true, clock.now()).progress;
        assert_eq!(progress.streak_days, 1);
        assert_eq!(progress.last_study_date, Some(clock.today()));
        assert!(progress.has_badge(BadgeId::ThreeDayStreak));
    }

    #[test]
    fn test_reset_clears_everything() {
        let clock = clock();
        let progress = UserProgress::default()
            .record_card_review(true, clock.now())
            .progress;
        assert!(progress.has_badge(BadgeId::FirstReview));

        let reset = progress.apply(ProgressEvent::Reset, clock.now()).progress;
        assert_eq!(reset, UserProgress::default());
        assert!(!reset.has_badge(BadgeId::FirstReview));
    }

    #[test]
    fn test_apply_dispatches_events() {
        let clock = clock();
        let granted = UserProgress::default().apply(ProgressEvent::XpGranted(40), clock.now());
        assert_eq!(granted.progress.xp, 40);
        assert_eq!(granted.progress.cards_reviewed, 0);

        let reviewed = granted
            .progress
            .apply(ProgressEvent::CardReviewed { known: false }, clock.now());
        assert_eq!(reviewed.progress.xp, 45);
        assert_eq!(reviewed.progress.cards_reviewed, 1);
    }

    #[test]
    fn test_level_percent() {
        let progress = UserProgress {
            xp: 75,
            ..UserProgress::default()
        };
        assert_eq!(progress.level_percent(), 75);
        assert_eq!(UserProgress::default().level_percent(), 0);
    }

    #[test]
    fn test_normalized_repairs_drift() {
        let drifted = UserProgress {
            xp: 260,
            xp_to_next_level: 1,
            cards_reviewed: 2,
            cards_known: 9,
            badges: Vec::new(),
            ..UserProgress::default()
        };
        let fixed = drifted.normalized().unwrap();
        assert_eq!(fixed.level, 3);
        assert_eq!(fixed.xp, 10);
        assert_eq!(fixed.xp_to_next_level, 225);
        assert_eq!(fixed.cards_known, 2);
        assert_eq!(fixed.badges.len(), 8);

        let broken = UserProgress {
            level: 0,
            ..UserProgress::default()
        };
        assert!(broken.normalized().is_none());
    }

    #[test]
    fn test_json_uses_camel_case_field_names() {
        let json = serde_json::to_value(UserProgress::default()).unwrap();
        assert_eq!(json["xpToNextLevel"], 100);
        assert_eq!(json["totalXpEarned"], 0);
        assert_eq!(json["badges"][0]["id"], "first-review");
        assert!(json.get("lastStudyDate").is_none());
    }

    proptest! {
        #[test]
        fn prop_add_xp_drains_fully(start in 0u64..5_000, grant in 0u64..1_000_000) {
            let now = Utc::now();
            let base = UserProgress::default().add_xp(start, now).progress;
            let result = base.add_xp(grant, now);
            let p = &result.progress;

            prop_assert!(p.xp < xp_to_next_level(p.level));
            prop_assert_eq!(p.xp_to_next_level, xp_to_next_level(p.level));
            prop_assert_eq!(p.total_xp_earned, start + grant);
            prop_assert!(p.level >= base.level);
        }

        #[test]
        fn prop_known_never_exceeds_reviewed(answers in prop::collection::vec(any::<bool>(), 0..60)) {
            let clock = clock();
            let mut progress = UserProgress::default();
            for known in &answers {
                progress = progress.record_card_review(*known, clock.now()).progress;
            }
            prop_assert_eq!(progress.cards_reviewed, answers.len() as u64);
            prop_assert!(progress.cards_known <= progress.cards_reviewed);
            let expected_xp: u64 = answers.iter().map(|k| review_xp(*k)).sum();
            prop_assert_eq!(progress.total_xp_earned, expected_xp);
        }
    }
}
