//! Pure navigation state over an ordered list of question ids.
//!
//! Nothing in here renders or speaks; the trainers call these transitions
//! and then decide what to show.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::RangeError;

/// The active subset of questions and the position within it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    ids: Vec<u32>,
    index: usize,
}

impl Deck {
    pub fn new(ids: Vec<u32>) -> Self {
        Self { ids, index: 0 }
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_id(&self) -> Option<u32> {
        self.ids.get(self.index).copied()
    }

    /// Jump to `index`; anything past the end falls back to the first card.
    pub fn set_index(&mut self, index: usize) {
        self.index = if index < self.ids.len() { index } else { 0 };
    }

    /// Swap in a new subset and start from its first card.
    pub fn replace(&mut self, ids: Vec<u32>) {
        self.ids = ids;
        self.index = 0;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Advance, wrapping to the first card after the last.
    pub fn next(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        self.index = if self.index + 1 < self.ids.len() { self.index + 1 } else { 0 };
    }

    /// Step back, wrapping to the last card before the first.
    pub fn prev(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        self.index = if self.index > 0 { self.index - 1 } else { self.ids.len() - 1 };
    }

    pub fn restart(&mut self) {
        self.index = 0;
    }

    pub fn random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.ids.is_empty() {
            return;
        }
        self.index = rng.random_range(0..self.ids.len());
    }

    /// Fisher-Yates shuffle of the subset; the position resets to the start.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.ids.is_empty() {
            return;
        }
        self.ids.shuffle(rng);
        self.index = 0;
    }

    /// 1-based position and total, for "Question n of m" labels.
    pub fn position(&self) -> (usize, usize) {
        if self.ids.is_empty() {
            (0, 0)
        } else {
            (self.index + 1, self.ids.len())
        }
    }

    /// Fraction of the deck reached so far, for progress gauges.
    pub fn progress_ratio(&self) -> f64 {
        let (position, total) = self.position();
        if total == 0 {
            0.0
        } else {
            position as f64 / total as f64
        }
    }
}

/// Check a user-entered range against the number of loaded questions.
pub fn validate_range(from: u32, to: u32, max: u32) -> Result<(u32, u32), RangeError> {
    if from < 1 || to > max || from > to {
        return Err(RangeError::Invalid { max });
    }
    Ok((from, to))
}
