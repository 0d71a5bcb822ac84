//! Study engine for the flashcard trainer.
//!
//! This crate holds everything the trainer does that is not drawing or
//! storage: study sessions, deck ordering, XP and levels, streaks, badges
//! and statistics. Storage is reached through the [`CardStore`] and
//! [`KeyValueStore`] traits so front ends can bring their own backend.
//!
//! # Features
//!
//! - **Study Sessions**: Flip, review and navigate with a cancellable feedback delay
//! - **Study Modes**: Sequential, shuffle, review-unknown and spaced repetition
//! - **Progress Ledger**: XP, levels and badges persisted as JSON
//! - **Streaks**: Calendar-day streaks shared by the ledger and the activity log
//! - **Statistics**: Status totals, daily activity and heatmap data

pub mod badges;
pub mod clock;
pub mod ledger;
pub mod mode;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod storage;
pub mod streak;

// Re-exports
pub use badges::{Badge, BadgeId};
pub use clock::{Clock, ManualClock, Moment, SystemClock};
pub use ledger::{ProgressChange, ProgressLedger, SubscriptionId, PROGRESS_KEY};
pub use mode::{strategy_for, DeckPlan, ModeStrategy, StudyMode};
pub use models::{
    CardId, CardStatus, DailyActivity, Flashcard, FlashcardSet, NewFlashcard, ReviewOutcome, SetId,
};
pub use progress::{ProgressEvent, ProgressTransition, UserProgress};
pub use scheduler::Scheduler;
pub use session::{Direction, ReviewReceipt, SessionNotice, SessionState, StudySession, Tally};
pub use stats::StudyStats;
pub use storage::{
    CardStore, KeyValueStore, MemoryCardStore, MemoryKeyValueStore, StatusLookup, StoreError,
    StoreResult,
};
pub use streak::StreakState;
