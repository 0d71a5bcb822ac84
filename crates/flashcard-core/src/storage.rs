//! Storage collaborators.
//!
//! The core never talks to a database directly. Cards, statuses and the
//! activity log go through [`CardStore`]; the serialized progress record goes
//! through [`KeyValueStore`].

use crate::models::{CardId, CardStatus, DailyActivity, Flashcard, SetId};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flashcards and the study activity log.
pub trait CardStore {
    /// Fetch one card.
    fn get_card(&self, id: CardId) -> StoreResult<Option<Flashcard>>;

    /// Cards in a set, oldest first.
    fn list_cards_by_set(&self, set_id: SetId) -> StoreResult<Vec<Flashcard>>;

    /// Record the outcome of a review.
    fn update_card_status(
        &mut self,
        id: CardId,
        status: CardStatus,
        reviewed_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Count a review of `card_id` on `date`, once per card per day.
    fn append_or_update_daily_activity(
        &mut self,
        date: NaiveDate,
        card_id: CardId,
    ) -> StoreResult<()>;

    /// The activity log, oldest day first.
    fn daily_activity(&self) -> StoreResult<Vec<DailyActivity>>;
}

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// Live lookup of a card's current status.
pub type StatusLookup<'a> = &'a dyn Fn(CardId) -> Option<CardStatus>;

/// Current status of a card, logging lookup failures.
pub fn live_status<S: CardStore + ?Sized>(store: &S, id: CardId) -> Option<CardStatus> {
    match store.get_card(id) {
        Ok(card) => card.map(|c| c.status),
        Err(e) => {
            tracing::warn!(%id, error = %e, "status lookup failed");
            None
        }
    }
}

/// In-memory card store.
#[derive(Debug, Default, Clone)]
pub struct MemoryCardStore {
    cards: Vec<Flashcard>,
    activity: BTreeMap<NaiveDate, DailyActivity>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `cards`.
    pub fn with_cards(cards: impl IntoIterator<Item = Flashcard>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
            activity: BTreeMap::new(),
        }
    }
}

impl CardStore for MemoryCardStore {
    fn get_card(&self, id: CardId) -> StoreResult<Option<Flashcard>> {
        Ok(self.cards.iter().find(|c| c.id == id).cloned())
    }

    fn list_cards_by_set(&self, set_id: SetId) -> StoreResult<Vec<Flashcard>> {
        let mut cards: Vec<Flashcard> = self
            .cards
            .iter()
            .filter(|c| c.set_id == set_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }

    fn update_card_status(
        &mut self,
        id: CardId,
        status: CardStatus,
        reviewed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("card {}", id)))?;
        card.status = status;
        card.last_reviewed = Some(reviewed_at);
        Ok(())
    }

    fn append_or_update_daily_activity(
        &mut self,
        date: NaiveDate,
        card_id: CardId,
    ) -> StoreResult<()> {
        self.activity
            .entry(date)
            .or_insert_with(|| DailyActivity::new(date))
            .record(card_id);
        Ok(())
    }

    fn daily_activity(&self) -> StoreResult<Vec<DailyActivity>> {
        Ok(self.activity.values().cloned().collect())
    }
}

/// In-memory key-value store.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_update_status() {
        let set_id = Uuid::new_v4();
        let card = Flashcard::new(set_id, "Q", "A");
        let id = card.id;
        let mut store = MemoryCardStore::with_cards([card]);

        let now = Utc::now();
        store
            .update_card_status(id, CardStatus::Known, now)
            .unwrap();
        let card = store.get_card(id).unwrap().unwrap();
        assert_eq!(card.status, CardStatus::Known);
        assert_eq!(card.last_reviewed, Some(now));

        let missing = store.update_card_status(Uuid::new_v4(), CardStatus::Known, now);
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_by_set_is_oldest_first() {
        let set_id = Uuid::new_v4();
        let now = Utc::now();
        let newer = Flashcard::new(set_id, "2", "2").created(now);
        let older = Flashcard::new(set_id, "1", "1").created(now - chrono::Duration::minutes(5));
        let other = Flashcard::new(Uuid::new_v4(), "x", "x");
        let store = MemoryCardStore::with_cards([newer, older, other]);

        let cards = store.list_cards_by_set(set_id).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "1");
    }

    #[test]
    fn test_daily_activity_dedup() {
        let mut store = MemoryCardStore::new();
        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 4, 3).unwrap();
        let a = Uuid::new_v4();

        store.append_or_update_daily_activity(day, a).unwrap();
        store.append_or_update_daily_activity(day, a).unwrap();
        store.append_or_update_daily_activity(next, a).unwrap();

        let log = store.daily_activity().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].date, day);
        assert_eq!(log[0].cards_reviewed, 1);
        assert_eq!(log[1].cards_reviewed, 1);
    }

    #[test]
    fn test_key_value_store() {
        let mut store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_live_status() {
        let card = Flashcard::new(Uuid::new_v4(), "Q", "A");
        let id = card.id;
        let store = MemoryCardStore::with_cards([card]);

        assert_eq!(live_status(&store, id), Some(CardStatus::New));
        assert_eq!(live_status(&store, Uuid::new_v4()), None);
    }
}
