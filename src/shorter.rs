//! Westminster Shorter Catechism trainer.
//!
//! Flashcard mode drills a hand-picked selection of questions; learning mode
//! walks the whole catechism with searchable questions and expandable proof
//! texts.

use tracing::{debug, info};

use crate::deck::{Deck, validate_range};
use crate::error::RangeError;
use crate::expander::{RefSlot, ReferenceExpander, Toggle};
use crate::input::{Action, FormOutcome, RangeForm};
use crate::questions::{Question, QuestionBank};
use crate::save_data::SaveStore;
use crate::speech::Speaker;

const MODE_KEY: &str = "shorterCatechismMode";
const SELECTED_KEY: &str = "shorterCatechismSelectedQuestions";
const FLASHCARD_INDEX_KEY: &str = "shorterCatechismFlashcardIndex";
const LEARNING_ID_KEY: &str = "shorterCatechismLearningQuestionId";
const SOUND_KEY: &str = "shorterCatechismSoundEnabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Flashcard,
    Learning,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Flashcard => "flashcard",
            Mode::Learning => "learning",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "flashcard" => Some(Mode::Flashcard),
            "learning" => Some(Mode::Learning),
            _ => None,
        }
    }

    fn other(self) -> Self {
        match self {
            Mode::Flashcard => Mode::Learning,
            Mode::Learning => Mode::Flashcard,
        }
    }
}

/// Learning-mode search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Search {
    pub query: String,
    pub focused: bool,
}

pub struct ShorterTrainer {
    bank: QuestionBank,
    mode: Mode,
    deck: Deck,
    flipped: bool,
    learning_id: u32,
    sound_enabled: bool,
    search: Search,
    sidebar_visible: bool,
    range_form: Option<RangeForm>,
    expander: ReferenceExpander,
    speaker: Box<dyn Speaker>,
    save: SaveStore,
}

impl ShorterTrainer {
    pub fn new(
        bank: QuestionBank,
        save: SaveStore,
        speaker: Box<dyn Speaker>,
        expander: ReferenceExpander,
    ) -> Self {
        let first_id = bank.first_id();
        let mut trainer = Self {
            bank,
            mode: Mode::Flashcard,
            deck: Deck::default(),
            flipped: false,
            learning_id: first_id,
            sound_enabled: false,
            search: Search::default(),
            sidebar_visible: true,
            range_form: None,
            expander,
            speaker,
            save,
        };
        trainer.restore();
        if !trainer.deck.is_empty() {
            trainer.display_flashcard();
        }
        trainer.show_question(trainer.learning_id);
        trainer.switch_mode(trainer.mode);
        trainer
    }

    fn restore(&mut self) {
        if let Some(mode) = self.save.get(MODE_KEY).and_then(Mode::parse) {
            self.mode = mode;
        }

        let selected = self
            .save
            .get(SELECTED_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<u32>>(raw).ok());
        if let Some(ids) = selected {
            let known: Vec<u32> = ids.into_iter().filter(|id| self.bank.contains(*id)).collect();
            self.deck.replace(known);
        }

        if let Some(index) = self.save.get_parsed::<usize>(FLASHCARD_INDEX_KEY) {
            self.deck.set_index(index);
        }

        if let Some(id) = self.save.get_parsed::<u32>(LEARNING_ID_KEY) {
            if self.bank.contains(id) {
                self.learning_id = id;
            }
        }

        if let Some(enabled) = self.save.get_bool(SOUND_KEY) {
            self.sound_enabled = enabled;
        }
    }

    fn save_state(&mut self) {
        self.save.set(MODE_KEY, self.mode.as_str());
        let selected = serde_json::to_string(self.deck.ids()).unwrap_or_else(|_| "[]".into());
        self.save.set(SELECTED_KEY, selected);
        self.save.set(FLASHCARD_INDEX_KEY, self.deck.index().to_string());
        self.save.set(LEARNING_ID_KEY, self.learning_id.to_string());
    }

    /// Speak only when the sound toggle is on.
    fn speak(&mut self, text: &str) {
        if self.sound_enabled {
            self.speaker.speak(text);
        }
    }

    // MARK: queries used by the renderer

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn search(&self) -> &Search {
        &self.search
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn range_form(&self) -> Option<&RangeForm> {
        self.range_form.as_ref()
    }

    pub fn expander(&self) -> &ReferenceExpander {
        &self.expander
    }

    pub fn flashcard(&self) -> Option<&Question> {
        self.deck.current_id().and_then(|id| self.bank.get(id))
    }

    pub fn learning_question(&self) -> Option<&Question> {
        self.bank.get(self.learning_id)
    }

    pub fn learning_id(&self) -> u32 {
        self.learning_id
    }

    /// Questions listed in the learning sidebar under the current search.
    pub fn listed_questions(&self) -> Vec<&Question> {
        self.bank.search(&self.search.query)
    }

    /// "3 questions selected"
    pub fn selected_label(&self) -> String {
        let count = self.deck.len();
        format!("{count} question{} selected", if count == 1 { "" } else { "s" })
    }

    /// "Question 2 of 10"
    pub fn progress_label(&self) -> String {
        let (position, total) = self.deck.position();
        format!("Question {position} of {total}")
    }

    // MARK: modes

    pub fn switch_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(mode = mode.as_str(), "switching mode");
        }
        self.mode = mode;
        self.save_state();
    }

    // MARK: flashcard mode

    pub fn select_all(&mut self) {
        self.deck.replace(self.bank.all_ids());
        self.display_flashcard();
    }

    pub fn clear_all(&mut self) {
        self.deck.clear();
        self.flipped = false;
        self.save_state();
    }

    pub fn apply_range(&mut self, from: u32, to: u32) -> Result<(), RangeError> {
        let (from, to) = validate_range(from, to, self.bank.max_id())?;
        self.deck.replace((from..=to).collect());
        self.range_form = None;
        self.display_flashcard();
        Ok(())
    }

    pub fn open_range_form(&mut self) {
        self.range_form = Some(RangeForm::new(self.bank.max_id()));
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

    fn display_flashcard(&mut self) {
        if !self.deck.is_empty() {
            // An out-of-range restored index lands back on the first card.
            self.deck.set_index(self.deck.index());
            self.flipped = false;
        }
        self.save_state();
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) {
        self.speaker.stop();
        self.deck.next();
        self.display_flashcard();
    }

    pub fn prev(&mut self) {
        self.speaker.stop();
        self.deck.prev();
        self.display_flashcard();
    }

    pub fn random(&mut self) {
        self.speaker.stop();
        if self.deck.is_empty() {
            return;
        }
        self.deck.random(&mut rand::rng());
        self.display_flashcard();
    }

    pub fn shuffle(&mut self) {
        self.speaker.stop();
        if self.deck.is_empty() {
            return;
        }
        self.deck.shuffle(&mut rand::rng());
        self.display_flashcard();
    }

    pub fn restart(&mut self) {
        self.speaker.stop();
        self.deck.restart();
        self.display_flashcard();
    }

    /// Read the card's question regardless of the sound toggle.
    pub fn play_question(&mut self) {
        if let Some(text) = self.flashcard().map(|q| q.question.clone()) {
            self.speaker.speak(&text);
        }
    }

    /// Read the card's answer regardless of the sound toggle.
    pub fn play_answer(&mut self) {
        if let Some(text) = self.flashcard().map(|q| q.answer.clone()) {
            self.speaker.speak(&text);
        }
    }

    // MARK: learning mode

    /// Show question `id`; unknown ids are ignored.
    pub fn show_question(&mut self, id: u32) {
        let Some(text) = self.bank.get(id).map(|q| q.question.clone()) else {
            debug!(id, "no such question");
            return;
        };
        self.learning_id = id;
        self.expander.collapse_all();
        if self.mode == Mode::Learning {
            self.speak(&text);
        }
        self.save_state();
    }

    pub fn learning_next(&mut self) {
        let next = (self.learning_id + 1).min(self.bank.max_id());
        self.show_question(next);
    }

    pub fn learning_prev(&mut self) {
        let prev = self.learning_id.saturating_sub(1).max(1);
        self.show_question(prev);
    }

    /// Expand or collapse the `n`th (0-based) reference of the shown question.
    pub fn toggle_reference(&mut self, n: usize) -> Option<Toggle> {
        let reference = self
            .learning_question()
            .and_then(|q| q.references.get(n))
            .map(|r| r.text.clone())?;
        let slot = RefSlot::new(self.learning_id, n);
        Some(self.expander.toggle(slot, &reference))
    }

    pub fn focus_search(&mut self) {
        self.search.focused = true;
    }

    /// Route a key to the focused search box. Returns `false` when it is not focused.
    pub fn handle_search_key(&mut self, key: &crossterm::event::KeyEvent) -> bool {
        use crossterm::event::KeyCode;

        if !self.search.focused {
            return false;
        }
        match key.code {
            KeyCode::Esc => self.search.focused = false,
            KeyCode::Enter => {
                self.search.focused = false;
                if let Some(id) = self.listed_questions().first().map(|q| q.id) {
                    self.show_question(id);
                }
            }
            KeyCode::Backspace => {
                self.search.query.pop();
            }
            KeyCode::Char(c) => self.search.query.push(c),
            _ => {}
        }
        true
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
    }

    // MARK: shared

    pub fn toggle_sound(&mut self) {
        self.sound_enabled = !self.sound_enabled;
        self.save.set(SOUND_KEY, self.sound_enabled.to_string());
        if !self.sound_enabled {
            self.speaker.stop();
        }
    }

    /// Pick up finished scripture lookups.
    pub fn poll(&mut self) -> usize {
        self.expander.poll()
    }

    pub fn stop_speech(&mut self) {
        self.speaker.stop();
    }

    /// Apply a mapped action. Returns `false` for `Quit`.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::SwitchMode => self.switch_mode(self.mode.other()),
            Action::ToggleSound => self.toggle_sound(),
            Action::Next => self.next(),
            Action::Prev => self.prev(),
            Action::Flip => self.flip(),
            Action::Random => self.random(),
            Action::Shuffle => self.shuffle(),
            Action::Restart => self.restart(),
            Action::SelectAll => self.select_all(),
            Action::ClearAll => self.clear_all(),
            Action::OpenRange => self.open_range_form(),
            Action::PlayQuestion => self.play_question(),
            Action::PlayAnswer => self.play_answer(),
            Action::LearningNext => self.learning_next(),
            Action::LearningPrev => self.learning_prev(),
            Action::FocusSearch => self.focus_search(),
            Action::ToggleSidebar => self.toggle_sidebar(),
            Action::ToggleReference(n) => {
                self.toggle_reference(n);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tokio::runtime::Handle;

    use super::*;
    use crate::expander::Passage;
    use crate::expander::testing::FakeSource;
    use crate::questions::sample_bank;
    use crate::speech::testing::{RecordingSpeaker, Spoken};

    struct Harness {
        trainer: ShorterTrainer,
        speaker: RecordingSpeaker,
        source: Arc<FakeSource>,
    }

    fn harness(save: SaveStore) -> Harness {
        let speaker = RecordingSpeaker::default();
        let source = Arc::new(FakeSource::with("Genesis 1:1", "[1:1] In the beginning"));
        let expander = ReferenceExpander::new(source.clone(), Handle::current());
        let trainer = ShorterTrainer::new(sample_bank(12), save, Box::new(speaker.clone()), expander);
        Harness {
            trainer,
            speaker,
            source,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn starts_empty_in_flashcard_mode() {
        let h = harness(SaveStore::in_memory());
        assert_eq!(h.trainer.mode(), Mode::Flashcard);
        assert!(h.trainer.flashcard().is_none());
        assert_eq!(h.trainer.selected_label(), "0 questions selected");
        assert_eq!(h.trainer.progress_label(), "Question 0 of 0");
        assert!(!h.trainer.sound_enabled());
        assert!(h.speaker.said().is_empty());
    }

    #[tokio::test]
    async fn range_selection_and_navigation() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.apply_range(3, 5).unwrap();
        assert_eq!(h.trainer.deck().ids(), &[3, 4, 5]);
        assert_eq!(h.trainer.selected_label(), "3 questions selected");
        h.trainer.flip();
        h.trainer.prev();
        assert_eq!(h.trainer.flashcard().unwrap().id, 5);
        assert!(!h.trainer.is_flipped());
        assert_eq!(h.trainer.progress_label(), "Question 3 of 3");

        assert!(h.trainer.apply_range(0, 3).is_err());
        assert_eq!(h.trainer.apply_range(2, 13).unwrap_err().to_string(), "Please enter a valid range (1-12)");
    }

    #[tokio::test]
    async fn play_buttons_ignore_sound_toggle() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.apply_range(1, 1).unwrap();
        assert_eq!(h.trainer.selected_label(), "1 question selected");
        h.trainer.play_question();
        h.trainer.play_answer();
        assert_eq!(
            h.speaker.said(),
            vec!["Question 1?".to_string(), "Answer 1.".to_string()]
        );
    }

    #[tokio::test]
    async fn clear_all_empties_selection() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.select_all();
        assert_eq!(h.trainer.deck().len(), 12);
        h.trainer.clear_all();
        assert!(h.trainer.flashcard().is_none());
        h.trainer.shuffle();
        h.trainer.random();
        assert!(h.trainer.deck().is_empty());
    }

    #[tokio::test]
    async fn state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut h = harness(SaveStore::open(dir.path()));
            h.trainer.apply_range(4, 9).unwrap();
            h.trainer.next();
            h.trainer.switch_mode(Mode::Learning);
            h.trainer.show_question(7);
            h.trainer.toggle_sound();
        }
        let h = harness(SaveStore::open(dir.path()));
        assert_eq!(h.trainer.mode(), Mode::Learning);
        assert_eq!(h.trainer.deck().ids(), &[4, 5, 6, 7, 8, 9]);
        assert_eq!(h.trainer.flashcard().unwrap().id, 5);
        assert_eq!(h.trainer.learning_id(), 7);
        assert!(h.trainer.sound_enabled());
        // learning mode with sound on reads the restored question
        assert_eq!(h.speaker.said(), vec!["Question 7?".to_string()]);
    }

    #[tokio::test]
    async fn malformed_saved_state_is_ignored() {
        let mut save = SaveStore::in_memory();
        save.set(MODE_KEY, "karaoke");
        save.set(SELECTED_KEY, "[1, 2,");
        save.set(LEARNING_ID_KEY, "500");
        let h = harness(save);
        assert_eq!(h.trainer.mode(), Mode::Flashcard);
        assert!(h.trainer.deck().is_empty());
        assert_eq!(h.trainer.learning_id(), 1);
    }

    #[tokio::test]
    async fn learning_navigation_is_clamped() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.switch_mode(Mode::Learning);
        h.trainer.learning_prev();
        assert_eq!(h.trainer.learning_id(), 1);
        h.trainer.show_question(12);
        h.trainer.learning_next();
        assert_eq!(h.trainer.learning_id(), 12);
        h.trainer.show_question(99);
        assert_eq!(h.trainer.learning_id(), 12);
    }

    #[tokio::test]
    async fn learning_mode_speaks_only_with_sound_on() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.switch_mode(Mode::Learning);
        h.trainer.learning_next();
        assert!(h.speaker.said().is_empty());
        h.trainer.toggle_sound();
        h.trainer.learning_next();
        assert_eq!(h.speaker.said(), vec!["Question 3?".to_string()]);
        h.trainer.toggle_sound();
        assert_eq!(h.speaker.log().last(), Some(&Spoken::Stopped));
    }

    #[tokio::test]
    async fn search_filters_and_jumps_to_first_match() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.switch_mode(Mode::Learning);
        h.trainer.focus_search();
        for c in "answer 1".chars() {
            h.trainer.handle_search_key(&key(KeyCode::Char(c)));
        }
        let listed: Vec<u32> = h.trainer.listed_questions().iter().map(|q| q.id).collect();
        assert_eq!(listed, vec![1, 10, 11, 12]);
        h.trainer.handle_search_key(&key(KeyCode::Enter));
        assert!(!h.trainer.search().focused);
        assert!(!h.trainer.handle_search_key(&key(KeyCode::Char('q'))));
        assert_eq!(h.trainer.learning_id(), 1);
    }

    #[tokio::test]
    async fn references_expand_through_the_expander() {
        let mut h = harness(SaveStore::in_memory());
        h.trainer.switch_mode(Mode::Learning);
        assert_eq!(h.trainer.toggle_reference(0), Some(Toggle::Fetching));
        assert_eq!(h.trainer.toggle_reference(5), None);
        h.trainer.expander.settle().await;
        assert!(matches!(
            h.trainer.expander().passage("Genesis 1:1"),
            Some(Passage::Text { text, .. }) if text == "In the beginning"
        ));

        // moving away collapses; coming back reuses the cached text
        h.trainer.learning_next();
        h.trainer.learning_prev();
        assert!(!h.trainer.expander().is_expanded(RefSlot::new(1, 0)));
        assert_eq!(h.trainer.toggle_reference(0), Some(Toggle::Expanded));
        assert_eq!(h.source.calls(), 1);
    }
}
