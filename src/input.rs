//! Keyboard and mouse handling, kept free of trainer state so the bindings
//! can be tested on their own.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Horizontal drag distance (in cells) that counts as a swipe.
pub const SWIPE_THRESHOLD: u16 = 6;

/// Everything a key press can ask a trainer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Next,
    Prev,
    Flip,
    Random,
    Shuffle,
    Restart,
    SelectAll,
    ClearAll,
    OpenRange,
    ToggleSound,
    SwitchMode,
    PlayQuestion,
    PlayAnswer,
    LearningNext,
    LearningPrev,
    FocusSearch,
    ToggleSidebar,
    /// 0-based index into the shown question's references.
    ToggleReference(usize),
}

fn common_action(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::ToggleSound),
        _ => None,
    }
}

/// Bindings for the Children's Catechism trainer.
pub fn children_action(key: &KeyEvent) -> Option<Action> {
    common_action(key).or(match key.code {
        KeyCode::Right => Some(Action::Next),
        KeyCode::Left => Some(Action::Prev),
        KeyCode::Char(' ') | KeyCode::Char('f') | KeyCode::Char('F') => Some(Action::Flip),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Random),
        KeyCode::Home => Some(Action::Restart),
        KeyCode::Char('a') => Some(Action::SelectAll),
        KeyCode::Char('g') => Some(Action::OpenRange),
        _ => None,
    })
}

/// Bindings for Shorter Catechism flashcard mode.
pub fn flashcard_action(key: &KeyEvent) -> Option<Action> {
    common_action(key).or(match key.code {
        KeyCode::Right => Some(Action::Next),
        KeyCode::Left => Some(Action::Prev),
        KeyCode::Char(' ') | KeyCode::Char('f') | KeyCode::Char('F') => Some(Action::Flip),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Random),
        KeyCode::Char('x') => Some(Action::Shuffle),
        KeyCode::Home => Some(Action::Restart),
        KeyCode::Char('a') => Some(Action::SelectAll),
        KeyCode::Char('c') => Some(Action::ClearAll),
        KeyCode::Char('g') => Some(Action::OpenRange),
        KeyCode::Char('p') => Some(Action::PlayQuestion),
        KeyCode::Char('P') => Some(Action::PlayAnswer),
        KeyCode::Char('m') => Some(Action::SwitchMode),
        _ => None,
    })
}

/// Bindings for Shorter Catechism learning mode.
pub fn learning_action(key: &KeyEvent) -> Option<Action> {
    common_action(key).or(match key.code {
        KeyCode::Down => Some(Action::LearningNext),
        KeyCode::Up => Some(Action::LearningPrev),
        KeyCode::Char('/') => Some(Action::FocusSearch),
        KeyCode::Tab => Some(Action::ToggleSidebar),
        KeyCode::Char('m') => Some(Action::SwitchMode),
        KeyCode::Char(c @ '1'..='9') => Some(Action::ToggleReference(c as usize - '1' as usize)),
        _ => None,
    })
}

/// Turns a left-button drag into next/prev, like a touch swipe.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    start_column: Option<u16>,
}

impl SwipeTracker {
    pub fn on_mouse(&mut self, event: &MouseEvent) -> Option<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.start_column = Some(event.column);
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let start = self.start_column.take()?;
                let end = event.column;
                if start > end && start - end > SWIPE_THRESHOLD {
                    Some(Action::Next)
                } else if end > start && end - start > SWIPE_THRESHOLD {
                    Some(Action::Prev)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    From,
    To,
}

/// What a key did to an open range form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Editing,
    Submit { from: u32, to: u32 },
    Cancel,
}

/// The "from / to" question range dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeForm {
    pub from: String,
    pub to: String,
    pub field: RangeField,
    pub error: Option<String>,
}

impl RangeForm {
    pub fn new(max: u32) -> Self {
        Self {
            from: "1".into(),
            to: max.to_string(),
            field: RangeField::From,
            error: None,
        }
    }

    fn focused(&mut self) -> &mut String {
        match self.field {
            RangeField::From => &mut self.from,
            RangeField::To => &mut self.to,
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> FormOutcome {
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Enter => {
                // Unparseable input becomes 0 and is rejected by range validation.
                let from = self.from.parse().unwrap_or(0);
                let to = self.to.parse().unwrap_or(0);
                return FormOutcome::Submit { from, to };
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    RangeField::From => RangeField::To,
                    RangeField::To => RangeField::From,
                };
            }
            KeyCode::Backspace => {
                self.focused().pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let value = self.focused();
                if value.len() < 4 {
                    value.push(c);
                }
            }
            _ => {}
        }
        FormOutcome::Editing
    }
}
