//! Cancellable delayed actions.
//!
//! The host event loop calls [`Scheduler::take_due`] on every tick. Each
//! `schedule` or `cancel` bumps the generation, so an action scheduled
//! before a cancel can never fire.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending<A> {
    action: A,
    due: Instant,
    generation: u64,
}

/// Holds at most one pending action.
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    pending: Option<Pending<A>>,
    generation: u64,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            pending: None,
            generation: 0,
        }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to run `delay` after `now`, replacing any pending one.
    pub fn schedule(&mut self, action: A, delay: Duration, now: Instant) {
        self.generation += 1;
        self.pending = Some(Pending {
            action,
            due: now + delay,
            generation: self.generation,
        });
    }

    /// Drop the pending action.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    /// Take the pending action if it is due.
    pub fn take_due(&mut self, now: Instant) -> Option<A> {
        let ready = matches!(
            &self.pending,
            Some(p) if p.generation == self.generation && now >= p.due
        );
        if !ready {
            return None;
        }
        self.pending.take().map(|p| p.action)
    }

    /// Take the pending action regardless of its due time.
    pub fn take_now(&mut self) -> Option<A> {
        let pending = self.pending.take()?;
        self.generation += 1;
        (pending.generation + 1 == self.generation).then_some(pending.action)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
