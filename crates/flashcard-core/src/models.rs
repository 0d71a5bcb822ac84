//! Data models for flashcards, sets and daily activity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifiers.
pub type SetId = Uuid;
pub type CardId = Uuid;

/// A flashcard set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    /// Unique identifier.
    pub id: SetId,
    /// Set name.
    pub name: String,
    /// When the set was created.
    pub created_at: DateTime<Utc>,
}

impl FlashcardSet {
    /// Create a new set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Learning status of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    /// Never reviewed.
    #[default]
    New,
    /// Last review was marked as known.
    Known,
    /// Last review was marked as unknown.
    Unknown,
}

impl CardStatus {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Known => "Known",
            Self::Unknown => "Unknown",
        }
    }

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Known => "known",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a storage key. Unrecognised values read as `New`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "known" => Self::Known,
            "unknown" => Self::Unknown,
            _ => Self::New,
        }
    }

    /// Whether review-unknown mode should still show this card.
    pub fn needs_review(&self) -> bool {
        matches!(self, Self::New | Self::Unknown)
    }
}

/// Outcome of reviewing a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The learner knew the answer.
    Known,
    /// The learner did not know the answer.
    Unknown,
}

impl ReviewOutcome {
    /// Whether this counts as a known answer.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known)
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Known => "Known",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<ReviewOutcome> for CardStatus {
    fn from(outcome: ReviewOutcome) -> Self {
        match outcome {
            ReviewOutcome::Known => Self::Known,
            ReviewOutcome::Unknown => Self::Unknown,
        }
    }
}

/// A flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    /// Unique identifier.
    pub id: CardId,
    /// Front content.
    pub front: String,
    /// Back content.
    pub back: String,
    /// Owning set.
    pub set_id: SetId,
    /// Learning status.
    pub status: CardStatus,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last reviewed.
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// Create a new card. Cards always start as `New`.
    pub fn new(set_id: SetId, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            front: front.into(),
            back: back.into(),
            set_id,
            status: CardStatus::New,
            created_at: Utc::now(),
            last_reviewed: None,
        }
    }

    /// Override the creation time.
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

/// Input for creating a card; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    /// Front content.
    pub front: String,
    /// Back content.
    pub back: String,
    /// Owning set.
    pub set_id: SetId,
}

impl NewFlashcard {
    /// Create a card from this input.
    pub fn into_card(self) -> Flashcard {
        Flashcard::new(self.set_id, self.front, self.back)
    }
}

/// Study activity for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    /// Local calendar day (YYYY-MM-DD).
    pub date: NaiveDate,
    /// Distinct cards reviewed that day.
    pub cards_reviewed: u32,
    /// Ids reviewed that day.
    pub flashcard_ids_reviewed: BTreeSet<CardId>,
}

impl DailyActivity {
    /// Create an empty entry for a day.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            cards_reviewed: 0,
            flashcard_ids_reviewed: BTreeSet::new(),
        }
    }

    /// Record a review. Returns false when the card was already counted today.
    pub fn record(&mut self, card_id: CardId) -> bool {
        if !self.flashcard_ids_reviewed.insert(card_id) {
            return false;
        }
        self.cards_reviewed += 1;
        true
    }
}

/// Local calendar day as stored and displayed.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
