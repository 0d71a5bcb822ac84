//! Badge catalog and unlock rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog badge identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeId {
    FirstReview,
    TenCards,
    FiftyCards,
    HundredCards,
    ThreeDayStreak,
    SevenDayStreak,
    #[serde(rename = "level-5")]
    Level5,
    #[serde(rename = "level-10")]
    Level10,
}

impl BadgeId {
    /// Every badge, in catalog order.
    pub const ALL: [BadgeId; 8] = [
        Self::FirstReview,
        Self::TenCards,
        Self::FiftyCards,
        Self::HundredCards,
        Self::ThreeDayStreak,
        Self::SevenDayStreak,
        Self::Level5,
        Self::Level10,
    ];

    /// Stable string id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstReview => "first-review",
            Self::TenCards => "ten-cards",
            Self::FiftyCards => "fifty-cards",
            Self::HundredCards => "hundred-cards",
            Self::ThreeDayStreak => "three-day-streak",
            Self::SevenDayStreak => "seven-day-streak",
            Self::Level5 => "level-5",
            Self::Level10 => "level-10",
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstReview => "First Steps",
            Self::TenCards => "Getting Started",
            Self::FiftyCards => "Dedicated Learner",
            Self::HundredCards => "Knowledge Master",
            Self::ThreeDayStreak => "Consistent",
            Self::SevenDayStreak => "Dedicated",
            Self::Level5 => "Rising Star",
            Self::Level10 => "Learning Expert",
        }
    }

    /// What earns the badge.
    pub fn description(&self) -> &'static str {
        match self {
            Self::FirstReview => "Review your first flashcard",
            Self::TenCards => "Review 10 flashcards",
            Self::FiftyCards => "Review 50 flashcards",
            Self::HundredCards => "Review 100 flashcards",
            Self::ThreeDayStreak => "Maintain a 3-day study streak",
            Self::SevenDayStreak => "Maintain a 7-day study streak",
            Self::Level5 => "Reach level 5",
            Self::Level10 => "Reach level 10",
        }
    }

    /// Icon glyph.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::FirstReview => "🎯",
            Self::TenCards => "🔟",
            Self::FiftyCards => "🧠",
            Self::HundredCards => "🏆",
            Self::ThreeDayStreak => "🔥",
            Self::SevenDayStreak => "⚡",
            Self::Level5 => "⭐",
            Self::Level10 => "🌟",
        }
    }

    /// Unlock rule.
    pub fn is_satisfied(&self, metrics: &BadgeMetrics) -> bool {
        match self {
            Self::FirstReview => metrics.cards_reviewed >= 1,
            Self::TenCards => metrics.cards_reviewed >= 10,
            Self::FiftyCards => metrics.cards_reviewed >= 50,
            Self::HundredCards => metrics.cards_reviewed >= 100,
            Self::ThreeDayStreak => metrics.streak_days >= 3,
            Self::SevenDayStreak => metrics.streak_days >= 7,
            Self::Level5 => metrics.level >= 5,
            Self::Level10 => metrics.level >= 10,
        }
    }
}

/// The progress figures badge rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BadgeMetrics {
    pub cards_reviewed: u64,
    pub streak_days: u32,
    pub level: u32,
}

/// A badge and whether it has been earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// Catalog id.
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// What earns it.
    pub description: String,
    /// Icon glyph.
    pub icon: String,
    /// Whether it has been earned.
    pub earned: bool,
    /// When it was earned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

impl Badge {
    /// An unearned badge from the catalog.
    pub fn unearned(id: BadgeId) -> Self {
        Self {
            id,
            name: id.name().to_string(),
            description: id.description().to_string(),
            icon: id.icon().to_string(),
            earned: false,
            earned_at: None,
        }
    }

    fn mark_earned(&self, at: DateTime<Utc>) -> Self {
        Self {
            earned: true,
            earned_at: Some(at),
            ..self.clone()
        }
    }
}

/// The full catalog, nothing earned.
pub fn catalog() -> Vec<Badge> {
    BadgeId::ALL.into_iter().map(Badge::unearned).collect()
}

/// Rebuild a stored badge list against the catalog.
///
/// Keeps earned state, adds badges missing from the stored list and restores
/// catalog order and text.
pub fn reconcile(stored: &[Badge]) -> Vec<Badge> {
    BadgeId::ALL
        .into_iter()
        .map(|id| {
            let fresh = Badge::unearned(id);
            match stored.iter().find(|b| b.id == id && b.earned) {
                Some(prev) => Badge {
                    earned: true,
                    earned_at: prev.earned_at,
                    ..fresh
                },
                None => fresh,
            }
        })
        .collect()
}

/// Result of a badge evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The new badge list.
    pub badges: Vec<Badge>,
    /// Badges earned by this pass.
    pub newly_earned: Vec<BadgeId>,
}

/// Earn every unearned badge whose rule now holds.
///
/// Earned badges pass through untouched.
pub fn evaluate(badges: &[Badge], metrics: &BadgeMetrics, now: DateTime<Utc>) -> Evaluation {
    let mut newly_earned = Vec::new();
    let badges = badges
        .iter()
        .map(|badge| {
            if !badge.earned && badge.id.is_satisfied(metrics) {
                newly_earned.push(badge.id);
                badge.mark_earned(now)
            } else {
                badge.clone()
            }
        })
        .collect();

    Evaluation {
        badges,
        newly_earned,
    }
}
