//! Children's Catechism trainer: one deck, flip to see the answer, and
//! everything read aloud by default.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::deck::{Deck, validate_range};
use crate::error::RangeError;
use crate::input::{Action, FormOutcome, RangeForm};
use crate::questions::{Question, QuestionBank};
use crate::save_data::SaveStore;
use crate::speech::Speaker;

const RANGE_KEY: &str = "childrenCatechismRange";
const INDEX_KEY: &str = "childrenCatechismIndex";
const AUTO_SPEAK_KEY: &str = "childrenAutoSpeak";

/// A milestone every this many questions.
const MILESTONE_EVERY: usize = 10;
const CELEBRATION_LENGTH: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedRange {
    from: u32,
    to: u32,
}

pub struct ChildrenTrainer {
    bank: QuestionBank,
    deck: Deck,
    flipped: bool,
    auto_speak: bool,
    celebration: Option<Instant>,
    range_form: Option<RangeForm>,
    speaker: Box<dyn Speaker>,
    save: SaveStore,
}

impl ChildrenTrainer {
    pub fn new(bank: QuestionBank, save: SaveStore, speaker: Box<dyn Speaker>) -> Self {
        let auto_speak = save.get_bool(AUTO_SPEAK_KEY).unwrap_or(true);
        let mut trainer = Self {
            deck: Deck::new(bank.all_ids()),
            bank,
            flipped: false,
            auto_speak,
            celebration: None,
            range_form: None,
            speaker,
            save,
        };
        trainer.restore();
        trainer.display();
        trainer
    }

    fn restore(&mut self) {
        let saved_range = self
            .save
            .get(RANGE_KEY)
            .and_then(|raw| serde_json::from_str::<SavedRange>(raw).ok());
        if let Some(range) = saved_range {
            if let Ok((from, to)) = validate_range(range.from, range.to, self.max_id()) {
                self.deck.replace(self.bank.ids_in_range(from, to));
            } else {
                debug!(?range, "ignoring saved range outside the question list");
            }
        }

        if let Some(index) = self.save.get_parsed::<usize>(INDEX_KEY) {
            if index < self.deck.len() {
                self.deck.set_index(index);
            }
        }
    }

    fn max_id(&self) -> u32 {
        self.bank.max_id()
    }

    // MARK: queries used by the renderer

    pub fn current(&self) -> Option<&Question> {
        self.deck.current_id().and_then(|id| self.bank.get(id))
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn auto_speak(&self) -> bool {
        self.auto_speak
    }

    pub fn range_form(&self) -> Option<&RangeForm> {
        self.range_form.as_ref()
    }

    pub fn is_celebrating(&self, now: Instant) -> bool {
        self.celebration
            .is_some_and(|started| now.duration_since(started) < CELEBRATION_LENGTH)
    }

    /// "Question 12 (3 of 10)"
    pub fn progress_label(&self) -> String {
        let (position, total) = self.deck.position();
        match self.current() {
            Some(q) => format!("Question {} ({position} of {total})", q.id),
            None => String::from("Question 0 of 0"),
        }
    }

    // MARK: transitions

    /// Show the current card: unflipped, read aloud, position remembered.
    fn display(&mut self) {
        let Some(question) = self.current().map(|q| q.question.clone()) else {
            return;
        };

        if self.flipped {
            self.flip_silently();
        }
        if self.auto_speak {
            self.speaker.speak(&question);
        }
        self.save.set(INDEX_KEY, self.deck.index().to_string());

        let index = self.deck.index();
        if index > 0 && (index + 1) % MILESTONE_EVERY == 0 {
            info!(reached = index + 1, "milestone");
            self.celebration = Some(Instant::now());
        }
    }

    fn flip_silently(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn flip(&mut self) {
        self.flip_silently();
        if !self.auto_speak {
            return;
        }
        let text = match self.current() {
            Some(q) if self.flipped => q.answer.clone(),
            Some(q) => q.question.clone(),
            None => return,
        };
        self.speaker.speak(&text);
    }

    pub fn next(&mut self) {
        self.speaker.stop();
        self.deck.next();
        self.display();
    }

    pub fn prev(&mut self) {
        self.speaker.stop();
        self.deck.prev();
        self.display();
    }

    pub fn random(&mut self) {
        self.speaker.stop();
        self.deck.random(&mut rand::rng());
        self.display();
    }

    pub fn restart(&mut self) {
        self.speaker.stop();
        self.deck.restart();
        self.display();
    }

    pub fn toggle_sound(&mut self) {
        self.auto_speak = !self.auto_speak;
        self.save.set(AUTO_SPEAK_KEY, self.auto_speak.to_string());
        if !self.auto_speak {
            self.speaker.stop();
        }
    }

    pub fn select_all(&mut self) {
        self.deck.replace(self.bank.all_ids());
        self.save.remove(RANGE_KEY);
        self.display();
    }

    /// Study only questions `from..=to`.
    pub fn apply_range(&mut self, from: u32, to: u32) -> Result<(), RangeError> {
        let (from, to) = validate_range(from, to, self.max_id())?;
        self.deck.replace(self.bank.ids_in_range(from, to));
        if let Ok(json) = serde_json::to_string(&SavedRange { from, to }) {
            self.save.set(RANGE_KEY, json);
        }
        self.range_form = None;
        self.display();
        Ok(())
    }

    pub fn open_range_form(&mut self) {
        self.range_form = Some(RangeForm::new(self.max_id()));
    }

    /// Route a key to the range dialog. Returns `false` when no dialog is open.
    pub fn handle_form_key(&mut self, key: &crossterm::event::KeyEvent) -> bool {
        let Some(form) = self.range_form.as_mut() else {
            return false;
        };
        match form.handle_key(key) {
            FormOutcome::Editing => {}
            FormOutcome::Cancel => self.range_form = None,
            FormOutcome::Submit { from, to } => {
                if let Err(err) = self.apply_range(from, to) {
                    if let Some(form) = self.range_form.as_mut() {
                        form.error = Some(err.to_string());
                    }
                }
            }
        }
        true
    }

    /// Apply a mapped action. Returns `false` for `Quit`.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::Next => self.next(),
            Action::Prev => self.prev(),
            Action::Flip => self.flip(),
            Action::Random => self.random(),
            Action::Restart => self.restart(),
            Action::SelectAll => self.select_all(),
            Action::OpenRange => self.open_range_form(),
            Action::ToggleSound => self.toggle_sound(),
            _ => {}
        }
        true
    }

    pub fn stop_speech(&mut self) {
        self.speaker.stop();
    }
}
