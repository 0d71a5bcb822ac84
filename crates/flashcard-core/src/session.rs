//! Study session state machine.
//!
//! A session holds a snapshot of one set's cards, the deck built from it by
//! the current [`StudyMode`], and the per-session tallies. Reviews write
//! through to the card store and the progress ledger, then leave the card on
//! screen with feedback until the deferred advance fires from [`StudySession::poll`].

use crate::badges::BadgeId;
use crate::clock::Clock;
use crate::ledger::ProgressLedger;
use crate::mode::{strategy_for, StudyMode};
use crate::models::{CardId, CardStatus, Flashcard, ReviewOutcome};
use crate::scheduler::Scheduler;
use crate::storage::{CardStore, StatusLookup};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Delay between a review and the automatic advance.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(500);

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No deck: not built yet, or the set has no cards.
    Empty,
    /// Showing a card.
    Ready,
    /// Showing feedback for a review.
    Reviewing,
}

/// One-off messages for the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    /// The set is empty.
    NothingToStudy,
    /// The mode's filter matched nothing; showing every card.
    NoMatchingCards,
    /// Every card needing review is now known; showing every card.
    ReviewComplete,
}

impl SessionNotice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NothingToStudy => "This set is empty.",
            Self::NoMatchingCards => "No cards match this mode. Showing all cards.",
            Self::ReviewComplete => "Review complete. Showing all cards.",
        }
    }
}

/// Manual navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    /// Reviews marked known.
    pub known: u32,
    /// Reviews marked unknown.
    pub unknown: u32,
    /// Distinct cards reviewed.
    pub reviewed_count: u32,
}

impl Tally {
    /// Share of reviews marked known, as a whole percent.
    pub fn accuracy_percent(&self) -> u32 {
        let total = self.known + self.unknown;
        if total == 0 {
            0
        } else {
            (self.known * 100 + total / 2) / total
        }
    }
}

/// What a review did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReceipt {
    pub card_id: CardId,
    pub outcome: ReviewOutcome,
    pub new_badges: Vec<BadgeId>,
    pub level_ups: u32,
    pub tally: Tally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Advance { remove: Option<CardId> },
}

/// A study session over one set.
pub struct StudySession {
    source: Vec<Flashcard>,
    deck: Vec<Flashcard>,
    cursor: usize,
    is_flipped: bool,
    mode: StudyMode,
    feedback: Option<ReviewOutcome>,
    reviewed_ids: HashSet<CardId>,
    tally: Tally,
    notice: Option<SessionNotice>,
    closed: bool,
    scheduler: Scheduler<Deferred>,
    feedback_delay: Duration,
    clock: Rc<dyn Clock>,
    rng: Box<dyn RngCore>,
}

impl StudySession {
    /// Open a session. It stays `Empty` until [`Self::build_deck`].
    pub fn new(clock: Rc<dyn Clock>, mode: StudyMode) -> Self {
        Self::with_rng(clock, mode, Box::new(StdRng::from_entropy()))
    }

    /// Open a session with a given random source.
    pub fn with_rng(clock: Rc<dyn Clock>, mode: StudyMode, rng: Box<dyn RngCore>) -> Self {
        Self {
            source: Vec::new(),
            deck: Vec::new(),
            cursor: 0,
            is_flipped: false,
            mode,
            feedback: None,
            reviewed_ids: HashSet::new(),
            tally: Tally::default(),
            notice: None,
            closed: false,
            scheduler: Scheduler::new(),
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            clock,
            rng,
        }
    }

    /// Set the delay before the automatic advance.
    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    /// Load `source` and build the deck for `mode`, starting over.
    pub fn build_deck(&mut self, source: Vec<Flashcard>, mode: StudyMode, live_status: StatusLookup<'_>) {
        self.scheduler.cancel();
        self.source = source;
        self.mode = mode;
        self.closed = false;
        self.cursor = 0;
        self.is_flipped = false;
        self.feedback = None;
        self.reviewed_ids.clear();
        self.tally = Tally::default();
        self.notice = None;

        if self.source.is_empty() {
            self.deck.clear();
            self.notice = Some(SessionNotice::NothingToStudy);
            tracing::debug!("study set is empty");
            return;
        }

        let plan = strategy_for(mode).order(&self.source, live_status, self.rng.as_mut());
        if plan.fell_back {
            self.notice = Some(SessionNotice::NoMatchingCards);
        }
        self.deck = plan.cards;
        tracing::debug!(mode = mode.as_str(), cards = self.deck.len(), "deck built");
    }

    /// Rebuild the deck from the loaded set under another mode.
    pub fn change_mode(&mut self, mode: StudyMode, live_status: StatusLookup<'_>) {
        let source = std::mem::take(&mut self.source);
        self.build_deck(source, mode, live_status);
    }

    /// Flip the current card. Ignored while feedback is showing.
    pub fn flip(&mut self) {
        if self.feedback.is_some() || self.current_card().is_none() {
            return;
        }
        self.is_flipped = !self.is_flipped;
    }

    /// Move one card, wrapping at either end. Returns true if it wrapped.
    pub fn advance(&mut self, direction: Direction) -> bool {
        self.settle_pending();
        self.is_flipped = false;
        self.feedback = None;

        let len = self.deck.len();
        if len == 0 {
            return false;
        }

        match direction {
            Direction::Forward if self.cursor + 1 >= len => {
                self.cursor = 0;
                true
            }
            Direction::Forward => {
                self.cursor += 1;
                false
            }
            Direction::Backward if self.cursor == 0 => {
                self.cursor = len - 1;
                true
            }
            Direction::Backward => {
                self.cursor -= 1;
                false
            }
        }
    }

    /// Review the current card.
    ///
    /// Returns `None` when there is no card or feedback is already showing.
    pub fn review(
        &mut self,
        outcome: ReviewOutcome,
        store: &mut dyn CardStore,
        ledger: &mut ProgressLedger,
        now: Instant,
    ) -> Option<ReviewReceipt> {
        if self.closed || self.feedback.is_some() {
            return None;
        }
        let card_id = self.current_card()?.id;
        let moment = self.clock.now();

        self.feedback = Some(outcome);
        match outcome {
            ReviewOutcome::Known => self.tally.known += 1,
            ReviewOutcome::Unknown => self.tally.unknown += 1,
        }
        if self.reviewed_ids.insert(card_id) {
            self.tally.reviewed_count += 1;
        }

        let status = CardStatus::from(outcome);
        if let Err(e) = store.update_card_status(card_id, status, moment.at) {
            tracing::warn!(%card_id, error = %e, "failed to save card status");
        }
        if let Err(e) = store.append_or_update_daily_activity(moment.day, card_id) {
            tracing::warn!(%card_id, error = %e, "failed to record daily activity");
        }
        self.apply_status(card_id, status, moment.at);

        let transition = ledger.record_card_review(outcome.is_known());

        let remove = (self.mode == StudyMode::ReviewUnknown && outcome.is_known()).then_some(card_id);
        self.scheduler
            .schedule(Deferred::Advance { remove }, self.feedback_delay, now);

        tracing::debug!(%card_id, outcome = outcome.name(), "card reviewed");

        Some(ReviewReceipt {
            card_id,
            outcome,
            new_badges: transition.new_badges,
            level_ups: transition.level_ups,
            tally: self.tally,
        })
    }

    /// Run the deferred advance if it is due. Returns true if it ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.closed {
            return false;
        }
        match self.scheduler.take_due(now) {
            Some(action) => {
                self.run(action);
                true
            }
            None => false,
        }
    }

    /// End the session. Pending actions are dropped.
    pub fn close(&mut self) {
        self.scheduler.cancel();
        self.closed = true;
        self.feedback = None;
    }

    /// Take the pending notice.
    pub fn take_notice(&mut self) -> Option<SessionNotice> {
        self.notice.take()
    }

    pub fn state(&self) -> SessionState {
        if self.deck.is_empty() {
            SessionState::Empty
        } else if self.feedback.is_some() {
            SessionState::Reviewing
        } else {
            SessionState::Ready
        }
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.deck.get(self.cursor)
    }

    pub fn deck(&self) -> &[Flashcard] {
        &self.deck
    }

    /// Every card in the loaded set.
    pub fn source(&self) -> &[Flashcard] {
        &self.source
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn feedback(&self) -> Option<ReviewOutcome> {
        self.feedback
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Whether a deferred advance is waiting.
    pub fn has_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Apply a pending removal now and drop the pending advance.
    fn settle_pending(&mut self) {
        if let Some(Deferred::Advance {
            remove: Some(card_id),
        }) = self.scheduler.take_now()
        {
            self.remove_card(card_id);
        }
        self.scheduler.cancel();
    }

    fn run(&mut self, action: Deferred) {
        self.feedback = None;
        self.is_flipped = false;

        let Deferred::Advance { remove } = action;
        match remove {
            Some(card_id) => self.remove_card(card_id),
            None if !self.deck.is_empty() => {
                self.cursor = (self.cursor + 1) % self.deck.len();
            }
            None => {}
        }
    }

    /// Drop a card from the deck. The following card takes its place.
    fn remove_card(&mut self, card_id: CardId) {
        let Some(index) = self.deck.iter().position(|c| c.id == card_id) else {
            return;
        };
        self.deck.remove(index);

        if self.deck.is_empty() {
            self.deck = self.source.clone();
            self.cursor = 0;
            self.notice = Some(SessionNotice::ReviewComplete);
            tracing::info!(cards = self.deck.len(), "review complete, showing all cards");
            return;
        }

        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.deck.len() {
            self.cursor = 0;
        }
    }

    fn apply_status(&mut self, card_id: CardId, status: CardStatus, at: chrono::DateTime<chrono::Utc>) {
        for card in self
            .deck
            .iter_mut()
            .chain(self.source.iter_mut())
            .filter(|c| c.id == card_id)
        {
            card.status = status;
            card.last_reviewed = Some(at);
        }
    }
}

impl Drop for StudySession {
    fn drop(&mut self) {
        self.close();
    }
}
