//! The progress service.
//!
//! [`ProgressLedger`] owns the current [`UserProgress`], applies the pure
//! transforms from [`crate::progress`], persists every new record and tells
//! subscribers what changed.

use crate::badges::BadgeId;
use crate::clock::Clock;
use crate::progress::{ProgressEvent, ProgressTransition, UserProgress};
use crate::storage::KeyValueStore;
use std::rc::Rc;

/// Storage key of the serialized progress record.
pub const PROGRESS_KEY: &str = "mindflip-progress";

/// Handle returned by [`ProgressLedger::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Notification sent to subscribers after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressChange {
    pub progress: UserProgress,
    pub new_badges: Vec<BadgeId>,
    pub level_ups: u32,
    pub cause: ProgressEvent,
}

type Listener = Box<dyn FnMut(&ProgressChange)>;

/// Owns and persists the learner's progress.
pub struct ProgressLedger {
    progress: UserProgress,
    store: Box<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl ProgressLedger {
    /// Load the record from `store`, falling back to defaults.
    pub fn load(store: Box<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        let progress = match store.get(PROGRESS_KEY) {
            Ok(Some(json)) => parse_progress(&json),
            Ok(None) => UserProgress::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read progress, starting fresh");
                UserProgress::default()
            }
        };
        tracing::debug!(level = progress.level, xp = progress.xp, "progress loaded");

        Self {
            progress,
            store,
            clock,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Current record.
    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    /// Displayed streak for today.
    pub fn current_streak(&self) -> u32 {
        self.progress.current_streak(self.clock.today())
    }

    /// Register a listener called after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&ProgressChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Grant XP directly.
    pub fn add_xp(&mut self, amount: u64) -> ProgressTransition {
        self.apply(ProgressEvent::XpGranted(amount))
    }

    /// Record a card review.
    pub fn record_card_review(&mut self, known: bool) -> ProgressTransition {
        self.apply(ProgressEvent::CardReviewed { known })
    }

    /// Wipe all progress. Cannot be undone.
    pub fn reset_progress(&mut self) -> ProgressTransition {
        self.apply(ProgressEvent::Reset)
    }

    fn apply(&mut self, event: ProgressEvent) -> ProgressTransition {
        let transition = self.progress.apply(event, self.clock.now());
        self.progress = transition.progress.clone();

        match event {
            ProgressEvent::Reset => tracing::info!("progress reset"),
            _ if transition.level_ups > 0 => {
                tracing::info!(level = self.progress.level, gained = transition.level_ups, "level up")
            }
            _ => tracing::debug!(?event, xp = self.progress.xp, "progress updated"),
        }
        for badge in &transition.new_badges {
            tracing::info!(badge = badge.as_str(), "badge earned");
        }

        self.persist();

        let change = ProgressChange {
            progress: transition.progress.clone(),
            new_badges: transition.new_badges.clone(),
            level_ups: transition.level_ups,
            cause: event,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }

        transition
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.progress) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize progress");
                return;
            }
        };
        if let Err(e) = self.store.set(PROGRESS_KEY, &json) {
            tracing::warn!(error = %e, "failed to save progress");
        }
    }
}

/// Parse a stored record, repairing drift and rejecting garbage.
pub fn parse_progress(json: &str) -> UserProgress {
    match serde_json::from_str::<UserProgress>(json) {
        Ok(stored) => stored.normalized().unwrap_or_else(|| {
            tracing::warn!("stored progress has an invalid level, starting fresh");
            UserProgress::default()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "stored progress is corrupt, starting fresh");
            UserProgress::default()
        }
    }
}
