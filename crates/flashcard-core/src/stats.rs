//! Dashboard statistics derived from cards and the activity log.

use crate::models::{CardId, CardStatus, DailyActivity, Flashcard};
use crate::streak;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Default heatmap span in days.
pub const DEFAULT_HEATMAP_DAYS: u32 = 90;

/// Aggregates shown on the statistics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StudyStats {
    pub total_cards: usize,
    pub known: usize,
    pub unknown: usize,
    pub new: usize,
    /// Distinct cards reviewed today.
    pub reviewed_today: u32,
    /// Today's cards whose current status is known.
    pub known_today: u32,
    /// Today's cards whose current status is unknown.
    pub unknown_today: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Days with any activity.
    pub active_days: usize,
}

impl StudyStats {
    pub fn compute(cards: &[Flashcard], activity: &[DailyActivity], today: NaiveDate) -> Self {
        let mut stats = Self {
            total_cards: cards.len(),
            ..Self::default()
        };

        for card in cards {
            match card.status {
                CardStatus::Known => stats.known += 1,
                CardStatus::Unknown => stats.unknown += 1,
                CardStatus::New => stats.new += 1,
            }
        }

        let statuses: HashMap<CardId, CardStatus> = cards.iter().map(|c| (c.id, c.status)).collect();
        if let Some(entry) = activity.iter().find(|a| a.date == today) {
            stats.reviewed_today = entry.cards_reviewed;
            for id in &entry.flashcard_ids_reviewed {
                match statuses.get(id) {
                    Some(CardStatus::Known) => stats.known_today += 1,
                    Some(CardStatus::Unknown) => stats.unknown_today += 1,
                    _ => {}
                }
            }
        }

        let days = active_days(activity);
        stats.active_days = days.len();
        stats.current_streak = streak::streak_from_activity(days.iter().copied(), today);
        stats.longest_streak = streak::longest_streak(days);
        stats
    }

    /// Today's known share as a whole percent.
    pub fn accuracy_today(&self) -> u32 {
        let total = self.known_today + self.unknown_today;
        if total == 0 {
            0
        } else {
            (self.known_today * 100 + total / 2) / total
        }
    }
}

fn active_days(activity: &[DailyActivity]) -> Vec<NaiveDate> {
    activity
        .iter()
        .filter(|a| a.cards_reviewed > 0)
        .map(|a| a.date)
        .collect()
}

/// Review counts for the `days` days ending on `today`, oldest first.
pub fn heatmap(activity: &[DailyActivity], today: NaiveDate, days: u32) -> Vec<(NaiveDate, u32)> {
    let counts: BTreeMap<NaiveDate, u32> = activity.iter().map(|a| (a.date, a.cards_reviewed)).collect();

    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(chrono::Days::new(u64::from(back))))
        .map(|date| (date, counts.get(&date).copied().unwrap_or(0)))
        .collect()
}

/// Heatmap shade for a day's review count, 0..=4.
pub fn intensity(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn activity(date: NaiveDate, ids: &[CardId]) -> DailyActivity {
        let mut entry = DailyActivity::new(date);
        for id in ids {
            entry.record(*id);
        }
        entry
    }

    #[test]
    fn test_compute() {
        let set_id = Uuid::new_v4();
        let mut cards: Vec<Flashcard> = (0..4).map(|i| Flashcard::new(set_id, format!("{}", i), "")).collect();
        cards[0].status = CardStatus::Known;
        cards[1].status = CardStatus::Known;
        cards[2].status = CardStatus::Unknown;

        let log = vec![
            activity(day(1), &[cards[3].id]),
            activity(day(3), &[cards[0].id]),
            activity(day(4), &[cards[0].id, cards[1].id, cards[2].id]),
        ];

        let stats = StudyStats::compute(&cards, &log, day(4));
        assert_eq!(stats.total_cards, 4);
        assert_eq!((stats.known, stats.unknown, stats.new), (2, 1, 1));
        assert_eq!(stats.reviewed_today, 3);
        assert_eq!(stats.known_today, 2);
        assert_eq!(stats.unknown_today, 1);
        assert_eq!(stats.accuracy_today(), 67);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.active_days, 3);
    }

    #[test]
    fn test_compute_with_no_activity() {
        let stats = StudyStats::compute(&[], &[], day(4));
        assert_eq!(stats, StudyStats::default());
        assert_eq!(stats.accuracy_today(), 0);
    }

    #[test]
    fn test_heatmap_window() {
        let id = Uuid::new_v4();
        let log = vec![activity(day(2), &[id]), activity(day(10), &[id])];
        let cells = heatmap(&log, day(10), 5);

        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], (day(6), 0));
        assert_eq!(cells[4], (day(10), 1));
        assert!(cells.iter().all(|(d, _)| *d != day(2)));
    }

    #[test]
    fn test_intensity_buckets() {
        let expected = [(0, 0), (1, 1), (2, 1), (3, 2), (5, 2), (6, 3), (10, 3), (11, 4), (400, 4)];
        for (count, shade) in expected {
            assert_eq!(intensity(count), shade, "count {}", count);
        }
    }
}
