//! Application state and logic.

use crate::config::Config;
use crate::db::{Database, DbResult};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use flashcard_core::storage::live_status;
use flashcard_core::{
    stats, CardId, Clock, Direction, FlashcardSet, NewFlashcard, ProgressChange, ProgressLedger,
    ReviewOutcome, SetId, StudyMode, StudySession, StudyStats, SystemClock,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Instant;

pub struct App {
    pub db: Database,
    pub config: Config,
    pub clock: Rc<dyn Clock>,
    pub ledger: ProgressLedger,
    pub view: View,
    pub sets: Vec<FlashcardSet>,
    pub card_counts: BTreeMap<SetId, usize>,
    pub selected_set: usize,
    pub session: Option<StudySession>,
    pub stats: StudyStats,
    pub heatmap: Vec<(NaiveDate, u32)>,
    pub editing: bool,
    pub input_buffer: String,
    pub input_field: InputField,
    pub draft: Draft,
    pub confirm: Option<Confirm>,
    pub message: Option<String>,
    pub show_help: bool,
    announcements: Rc<RefCell<VecDeque<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    SetList,
    Study,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    SetName,
    CardFront,
    CardBack,
}

/// Actions waiting for a `y` from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    DeleteSet(SetId),
    DeleteCard(CardId),
    ResetProgress,
}

impl Confirm {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::DeleteSet(_) => "Delete this set and all its cards? (y/n)",
            Self::DeleteCard(_) => "Delete this card? (y/n)",
            Self::ResetProgress => "Reset all XP, levels, streaks and badges? (y/n)",
        }
    }
}

/// Cards being typed in before they are saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Set created from the set-name prompt, saved with its cards.
    pub new_set: Option<FlashcardSet>,
    /// Set an added card goes to.
    pub target: Option<SetId>,
    pub front: Option<String>,
    pub cards: Vec<NewFlashcard>,
}

impl App {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        let db_path = Config::db_path().unwrap_or_else(|| "flashcards.db".into());
        let db = Database::open(&db_path)?;
        Ok(Self::with_parts(db, config, Rc::new(SystemClock))?)
    }

    pub fn with_parts(db: Database, config: Config, clock: Rc<dyn Clock>) -> DbResult<Self> {
        let mut ledger = ProgressLedger::load(Box::new(db.clone()), clock.clone());

        let announcements: Rc<RefCell<VecDeque<String>>> = Rc::default();
        let sink = announcements.clone();
        ledger.subscribe(move |change: &ProgressChange| {
            let mut queue = sink.borrow_mut();
            if change.level_ups > 0 {
                queue.push_back(format!("Level up! You are now level {}", change.progress.level));
            }
            for badge in &change.new_badges {
                queue.push_back(format!("Badge earned: {} {}", badge.icon(), badge.name()));
            }
        });

        let mut app = Self {
            db,
            config,
            clock,
            ledger,
            view: View::SetList,
            sets: Vec::new(),
            card_counts: BTreeMap::new(),
            selected_set: 0,
            session: None,
            stats: StudyStats::default(),
            heatmap: Vec::new(),
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            draft: Draft::default(),
            confirm: None,
            message: None,
            show_help: false,
            announcements,
        };

        app.refresh_sets()?;
        Ok(app)
    }

    pub fn refresh_sets(&mut self) -> DbResult<()> {
        self.sets = self.db.list_sets()?;
        self.card_counts = self.db.card_counts()?;
        if self.selected_set >= self.sets.len() && !self.sets.is_empty() {
            self.selected_set = self.sets.len() - 1;
        }
        Ok(())
    }

    pub fn can_quit(&self) -> bool {
        self.view == View::SetList && !self.editing && self.session.is_none() && self.confirm.is_none()
    }

    pub fn selected_set(&self) -> Option<&FlashcardSet> {
        self.sets.get(self.selected_set)
    }

    /// Run the deferred session work and surface queued messages.
    pub fn tick(&mut self, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            session.poll(now);
        }
        self.collect_messages();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        if let Some(confirm) = self.confirm.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.run_confirmed(confirm);
            } else {
                self.message = Some("Cancelled".to_string());
            }
            return;
        }

        self.message = None;

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        match self.view {
            View::SetList => self.handle_set_list_key(key),
            View::Study => self.handle_study_key(key),
            View::Stats => self.handle_stats_key(key),
        }
        self.collect_messages();
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_set_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.sets.is_empty() {
                    self.selected_set = (self.selected_set + 1).min(self.sets.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_set = self.selected_set.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.start_study(),
            KeyCode::Char('a') => self.begin_input(InputField::SetName),
            KeyCode::Char('c') => {
                if let Some(id) = self.selected_set().map(|s| s.id) {
                    self.draft.target = Some(id);
                    self.begin_input(InputField::CardFront);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_set().map(|s| s.id) {
                    self.confirm = Some(Confirm::DeleteSet(id));
                }
            }
            KeyCode::Char('m') => {
                let mode = self.config.study.default_mode.next();
                self.config.study.default_mode = mode;
                self.message = Some(format!("Study mode: {}", mode.name()));
            }
            KeyCode::Char('R') => self.confirm = Some(Confirm::ResetProgress),
            KeyCode::Char('s') => self.open_stats(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_study_key(&mut self, key: KeyEvent) {
        let Some(session) = self.session.as_mut() else {
            self.view = View::SetList;
            return;
        };

        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => session.flip(),
            KeyCode::Right | KeyCode::Char('l') => {
                if session.advance(Direction::Forward) {
                    self.message = Some("End of deck. Starting from the beginning.".to_string());
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                if session.advance(Direction::Backward) {
                    self.message = Some("Beginning of deck. Going to the end.".to_string());
                }
            }
            KeyCode::Char('y') => self.review(ReviewOutcome::Known),
            KeyCode::Char('n') => self.review(ReviewOutcome::Unknown),
            KeyCode::Char('m') => {
                let mode = session.mode().next();
                self.change_mode(mode);
            }
            KeyCode::Char('r') => {
                let mode = session.mode();
                self.change_mode(mode);
                self.message = Some("Deck restarted".to_string());
            }
            KeyCode::Char('x') => {
                if let Some(card) = session.current_card() {
                    self.confirm = Some(Confirm::DeleteCard(card.id));
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.end_session(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_stats_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::SetList,
            KeyCode::Char('R') => self.confirm = Some(Confirm::ResetProgress),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn begin_input(&mut self, field: InputField) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer.clear();
    }

    fn cancel_editing(&mut self) {
        // Esc on the front prompt of a new set saves what was typed so far.
        if self.input_field == InputField::CardFront && self.draft.new_set.is_some() {
            self.save_draft_set();
        }
        self.editing = false;
        self.input_buffer.clear();
        self.input_field = InputField::None;
        self.draft = Draft::default();
    }

    fn finish_editing(&mut self) {
        let text = self.input_buffer.trim().to_string();
        self.input_buffer.clear();

        match self.input_field {
            InputField::SetName => {
                if text.is_empty() {
                    self.cancel_editing();
                    return;
                }
                let set = FlashcardSet::new(text);
                self.draft.target = Some(set.id);
                self.draft.new_set = Some(set);
                self.input_field = InputField::CardFront;
                self.message = Some("Add cards. Enter an empty front to finish.".to_string());
            }
            InputField::CardFront => {
                if text.is_empty() {
                    self.cancel_editing();
                    return;
                }
                self.draft.front = Some(text);
                self.input_field = InputField::CardBack;
            }
            InputField::CardBack => {
                let (Some(front), Some(set_id)) = (self.draft.front.take(), self.draft.target) else {
                    self.cancel_editing();
                    return;
                };
                let card = NewFlashcard {
                    front,
                    back: text,
                    set_id,
                };

                if self.draft.new_set.is_some() {
                    self.draft.cards.push(card);
                    self.input_field = InputField::CardFront;
                    return;
                }

                match self.db.insert_card(card) {
                    Ok(_) => self.message = Some("Card created".to_string()),
                    Err(e) => self.report("Failed to save card", &e),
                }
                self.editing = false;
                self.input_field = InputField::None;
                self.draft = Draft::default();
                self.refresh_or_report();
            }
            InputField::None => {
                self.editing = false;
            }
        }
    }

    fn save_draft_set(&mut self) {
        let Some(set) = self.draft.new_set.take() else {
            return;
        };
        let cards = std::mem::take(&mut self.draft.cards);
        let count = cards.len();

        let saved = self
            .db
            .insert_set(&set)
            .and_then(|_| self.db.insert_cards(cards));
        match saved {
            Ok(_) => {
                tracing::info!(set = %set.name, cards = count, "set created");
                self.message = Some(format!("Created \"{}\" with {} cards", set.name, count));
            }
            Err(e) => self.report("Failed to save set", &e),
        }
        self.refresh_or_report();
        if let Some(idx) = self.sets.iter().position(|s| s.id == set.id) {
            self.selected_set = idx;
        }
    }

    fn run_confirmed(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::DeleteSet(id) => {
                match self.db.delete_set(id) {
                    Ok(()) => self.message = Some("Set deleted".to_string()),
                    Err(e) => self.report("Failed to delete set", &e),
                }
                self.refresh_or_report();
            }
            Confirm::DeleteCard(id) => {
                if let Err(e) = self.db.delete_card(id) {
                    self.report("Failed to delete card", &e);
                    return;
                }
                if let Some(session) = self.session.as_mut() {
                    let remaining = session.source().iter().filter(|c| c.id != id).cloned().collect();
                    let mode = session.mode();
                    let db = &self.db;
                    let lookup = |card: CardId| live_status(db, card);
                    session.build_deck(remaining, mode, &lookup);
                }
                self.message = Some("Card deleted".to_string());
                self.collect_messages();
            }
            Confirm::ResetProgress => {
                self.ledger.reset_progress();
                self.message = Some("Progress reset".to_string());
                if self.view == View::Stats {
                    self.open_stats();
                }
            }
        }
    }

    fn start_study(&mut self) {
        let Some(set) = self.selected_set().cloned() else {
            return;
        };

        let cards = match self.db.cards_in_set(set.id) {
            Ok(cards) => cards,
            Err(e) => {
                self.report("Failed to load cards", &e);
                return;
            }
        };

        let mode = self.config.study.default_mode;
        let mut session = StudySession::new(self.clock.clone(), mode)
            .with_feedback_delay(self.config.study.feedback_delay());
        let db = &self.db;
        let lookup = |id: CardId| live_status(db, id);
        session.build_deck(cards, mode, &lookup);

        tracing::info!(set = %set.name, mode = mode.as_str(), "study session started");
        self.session = Some(session);
        self.view = View::Study;
        self.collect_messages();
    }

    fn review(&mut self, outcome: ReviewOutcome) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.review(outcome, &mut self.db, &mut self.ledger, Instant::now());
    }

    fn change_mode(&mut self, mode: StudyMode) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let db = &self.db;
        let lookup = |id: CardId| live_status(db, id);
        session.change_mode(mode, &lookup);
        self.message = Some(format!("Study mode: {}", mode.name()));
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            let tally = session.tally();
            session.close();
            if tally.reviewed_count > 0 {
                self.message = Some(format!(
                    "Session: {} cards, {} known, {} unknown ({}%)",
                    tally.reviewed_count,
                    tally.known,
                    tally.unknown,
                    tally.accuracy_percent()
                ));
            }
        }
        self.view = View::SetList;
        self.refresh_or_report();
    }

    fn open_stats(&mut self) {
        let today = self.clock.today();
        let loaded = self
            .db
            .all_cards()
            .and_then(|cards| Ok((cards, self.db.activity_log()?)));
        match loaded {
            Ok((cards, activity)) => {
                self.stats = StudyStats::compute(&cards, &activity, today);
                self.heatmap = stats::heatmap(&activity, today, self.config.display.heatmap_days);
                self.view = View::Stats;
            }
            Err(e) => self.report("Failed to load statistics", &e),
        }
    }

    /// Fold the session notice and every queued announcement into one status line.
    fn collect_messages(&mut self) {
        let mut parts = Vec::new();
        if let Some(notice) = self.session.as_mut().and_then(|s| s.take_notice()) {
            parts.push(notice.message().to_string());
        }
        parts.extend(self.announcements.borrow_mut().drain(..));
        if !parts.is_empty() {
            self.message = Some(parts.join("  |  "));
        }
    }

    fn refresh_or_report(&mut self) {
        if let Err(e) = self.refresh_sets() {
            self.report("Failed to load sets", &e);
        }
    }

    fn report(&mut self, what: &str, err: &dyn std::error::Error) {
        tracing::warn!(error = %err, "{}", what);
        self.message = Some(format!("{}: {}", what, err));
    }
}
