//! Typewriter-style text reveal for the current node's text.

/// Reveals a text one character at a time.
///
/// Counting is by `char`, so multi-byte text is never split mid-character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextReveal {
    text: String,
    total: usize,
    shown: usize,
}

impl TextReveal {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let total = text.chars().count();
        Self {
            text,
            total,
            shown: 0,
        }
    }

    /// Start revealing a new text from the beginning.
    pub fn reset(&mut self, text: impl Into<String>) {
        *self = Self::new(text);
    }

    /// Reveal up to `chars` more characters. Returns true while part of the
    /// text is still hidden.
    pub fn tick(&mut self, chars: usize) -> bool {
        self.shown = self.shown.saturating_add(chars).min(self.total);
        !self.is_done()
    }

    /// Reveal the rest of the text at once.
    pub fn skip(&mut self) {
        self.shown = self.total;
    }

    /// The revealed prefix.
    pub fn displayed(&self) -> &str {
        match self.text.char_indices().nth(self.shown) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.total
    }

    /// Fraction revealed, in `0.0..=1.0`. Empty text counts as fully shown.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.shown as f32 / self.total as f32
        }
    }
}
