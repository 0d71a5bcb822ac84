//! Study modes and the ordering strategies behind them.

use crate::models::{CardStatus, Flashcard};
use crate::storage::StatusLookup;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How cards are picked and ordered for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyMode {
    #[default]
    Sequential,
    Shuffle,
    ReviewUnknown,
    SpacedRepetition,
}

impl StudyMode {
    pub const ALL: [StudyMode; 4] = [
        Self::Sequential,
        Self::Shuffle,
        Self::ReviewUnknown,
        Self::SpacedRepetition,
    ];

    /// Stable key used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Shuffle => "shuffle",
            Self::ReviewUnknown => "review-unknown",
            Self::SpacedRepetition => "spaced-repetition",
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::Shuffle => "Shuffle",
            Self::ReviewUnknown => "Review Unknown",
            Self::SpacedRepetition => "Spaced Repetition",
        }
    }

    /// The mode after this one, wrapping.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown study mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for StudyMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// An ordered deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckPlan {
    pub cards: Vec<Flashcard>,
    /// The mode's filter matched nothing and the full set was used instead.
    pub fell_back: bool,
}

impl DeckPlan {
    fn ordered(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            fell_back: false,
        }
    }
}

/// Trait for deck ordering strategies.
pub trait ModeStrategy {
    /// Strategy name.
    fn name(&self) -> &str;

    /// Build a deck from `cards`.
    ///
    /// `live_status` reports the stored status of a card, which may be newer
    /// than the snapshot in `cards`.
    fn order(
        &self,
        cards: &[Flashcard],
        live_status: StatusLookup<'_>,
        rng: &mut dyn RngCore,
    ) -> DeckPlan;
}

/// Creation order.
pub struct Sequential;

impl ModeStrategy for Sequential {
    fn name(&self) -> &str {
        "Sequential"
    }

    fn order(&self, cards: &[Flashcard], _: StatusLookup<'_>, _: &mut dyn RngCore) -> DeckPlan {
        let mut deck = cards.to_vec();
        deck.sort_by_key(|c| c.created_at);
        DeckPlan::ordered(deck)
    }
}

/// Uniform random order.
pub struct Shuffle;

impl ModeStrategy for Shuffle {
    fn name(&self) -> &str {
        "Shuffle"
    }

    fn order(&self, cards: &[Flashcard], _: StatusLookup<'_>, rng: &mut dyn RngCore) -> DeckPlan {
        let mut deck = cards.to_vec();
        deck.shuffle(rng);
        DeckPlan::ordered(deck)
    }
}

/// Only cards not yet known, shuffled.
pub struct ReviewUnknown;

impl ModeStrategy for ReviewUnknown {
    fn name(&self) -> &str {
        "Review Unknown"
    }

    fn order(
        &self,
        cards: &[Flashcard],
        live_status: StatusLookup<'_>,
        rng: &mut dyn RngCore,
    ) -> DeckPlan {
        let mut deck: Vec<Flashcard> = cards
            .iter()
            .filter(|c| current_status(c, live_status).needs_review())
            .cloned()
            .collect();

        if deck.is_empty() {
            return DeckPlan {
                cards: cards.to_vec(),
                fell_back: true,
            };
        }

        deck.shuffle(rng);
        DeckPlan::ordered(deck)
    }
}

/// Weakest cards first.
///
/// Unknown cards come first, then new, then known. Within a group the card
/// reviewed longest ago leads and never-reviewed cards lead all of them.
/// Ties fall back to creation order.
pub struct SpacedRepetition;

impl SpacedRepetition {
    fn rank(status: CardStatus) -> u8 {
        match status {
            CardStatus::Unknown => 0,
            CardStatus::New => 1,
            CardStatus::Known => 2,
        }
    }
}

impl ModeStrategy for SpacedRepetition {
    fn name(&self) -> &str {
        "Spaced Repetition"
    }

    fn order(
        &self,
        cards: &[Flashcard],
        live_status: StatusLookup<'_>,
        _: &mut dyn RngCore,
    ) -> DeckPlan {
        let mut deck = cards.to_vec();
        // None sorts before Some, so unreviewed cards lead their group.
        deck.sort_by_key(|c| {
            (
                Self::rank(current_status(c, live_status)),
                c.last_reviewed,
                c.created_at,
            )
        });
        DeckPlan::ordered(deck)
    }
}

fn current_status(card: &Flashcard, live_status: StatusLookup<'_>) -> CardStatus {
    live_status(card.id).unwrap_or(card.status)
}

/// Get the strategy for a mode.
pub fn strategy_for(mode: StudyMode) -> Box<dyn ModeStrategy> {
    match mode {
        StudyMode::Sequential => Box::new(Sequential),
        StudyMode::Shuffle => Box::new(Shuffle),
        StudyMode::ReviewUnknown => Box::new(ReviewUnknown),
        StudyMode::SpacedRepetition => Box::new(SpacedRepetition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardId;
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn deck(n: usize) -> Vec<Flashcard> {
        let set_id = Uuid::new_v4();
        let base = Utc::now();
        (0..n)
            .map(|i| {
                Flashcard::new(set_id, format!("Q{}", i), format!("A{}", i))
                    .created(base + Duration::seconds(i as i64))
            })
            .collect()
    }

    fn snapshot(_: CardId) -> Option<CardStatus> {
        None
    }

    fn fronts(plan: &DeckPlan) -> Vec<&str> {
        plan.cards.iter().map(|c| c.front.as_str()).collect()
    }

    #[test]
    fn test_mode_keys() {
        for mode in StudyMode::ALL {
            assert_eq!(mode.as_str().parse::<StudyMode>(), Ok(mode));
            assert_eq!(mode.to_string(), mode.as_str());
        }
        assert_eq!("Review-Unknown".parse::<StudyMode>(), Ok(StudyMode::ReviewUnknown));
        assert!("sm2".parse::<StudyMode>().is_err());
        assert_eq!(StudyMode::SpacedRepetition.next(), StudyMode::Sequential);
    }

    #[test]
    fn test_sequential_orders_by_creation() {
        let mut cards = deck(4);
        cards.reverse();
        let mut rng = StdRng::seed_from_u64(1);
        let plan = strategy_for(StudyMode::Sequential).order(&cards, &snapshot, &mut rng);
        assert_eq!(fronts(&plan), vec!["Q0", "Q1", "Q2", "Q3"]);
        assert!(!plan.fell_back);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let cards = deck(20);
        let mut rng = StdRng::seed_from_u64(7);
        let plan = strategy_for(StudyMode::Shuffle).order(&cards, &snapshot, &mut rng);

        assert_eq!(plan.cards.len(), 20);
        let mut ids: Vec<_> = plan.cards.iter().map(|c| c.id).collect();
        let mut expected: Vec<_> = cards.iter().map(|c| c.id).collect();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_seed() {
        let cards = deck(10);
        let a = Shuffle.order(&cards, &snapshot, &mut StdRng::seed_from_u64(3));
        let b = Shuffle.order(&cards, &snapshot, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_review_unknown_filters_by_live_status() {
        let cards = deck(3);
        let known = cards[1].id;
        let live = move |id: CardId| (id == known).then_some(CardStatus::Known);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = ReviewUnknown.order(&cards, &live, &mut rng);
        assert_eq!(plan.cards.len(), 2);
        assert!(plan.cards.iter().all(|c| c.id != known));
        assert!(!plan.fell_back);
    }

    #[test]
    fn test_review_unknown_falls_back_when_all_known() {
        let cards = deck(3);
        let live = |_: CardId| Some(CardStatus::Known);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = ReviewUnknown.order(&cards, &live, &mut rng);
        assert!(plan.fell_back);
        assert_eq!(plan.cards, cards);
    }

    #[test]
    fn test_spaced_repetition_priority() {
        let mut cards = deck(5);
        let now = Utc::now();
        cards[0].status = CardStatus::Known;
        cards[0].last_reviewed = Some(now - Duration::days(9));
        cards[1].status = CardStatus::Unknown;
        cards[1].last_reviewed = Some(now);
        cards[2].status = CardStatus::Unknown;
        cards[2].last_reviewed = Some(now - Duration::hours(2));
        cards[4].status = CardStatus::Known;
        cards[4].last_reviewed = Some(now - Duration::days(20));

        let statuses: HashMap<CardId, CardStatus> =
            cards.iter().map(|c| (c.id, c.status)).collect();
        let live = move |id: CardId| statuses.get(&id).copied();
        let mut rng = StdRng::seed_from_u64(1);

        let plan = SpacedRepetition.order(&cards, &live, &mut rng);
        assert_eq!(fronts(&plan), vec!["Q2", "Q1", "Q3", "Q4", "Q0"]);
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        for mode in StudyMode::ALL {
            let plan = strategy_for(mode).order(&[], &snapshot, &mut rng);
            assert!(plan.cards.is_empty());
        }
    }
}
