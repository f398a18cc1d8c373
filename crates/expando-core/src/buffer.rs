//! Rolling window of recently typed characters.

use std::collections::VecDeque;

pub const DEFAULT_MAX_LENGTH: usize = 20;

/// Fixed-capacity buffer of the most recent keystrokes.
///
/// On overflow the oldest characters are dropped. Invalidation empties the
/// buffer and remembers that the next append starts a fresh context.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    contents: VecDeque<char>,
    max_length: usize,
    invalidated: bool,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }
}

impl InputBuffer {
    pub fn new(max_length: usize) -> Self {
        Self {
            contents: VecDeque::with_capacity(max_length + 1),
            max_length,
            invalidated: false,
        }
    }

    pub fn append(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.invalidated = false;
        self.contents.extend(s.chars());
        let overflow = self.contents.len().saturating_sub(self.max_length);
        self.contents.drain(..overflow);
    }

    pub fn backspace(&mut self) {
        self.contents.pop_back();
    }

    pub fn invalidate(&mut self) {
        self.contents.clear();
        self.invalidated = true;
    }

    pub fn clear(&mut self) {
        self.contents.clear();
        self.invalidated = false;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn last_char(&self) -> Option<char> {
        self.contents.back().copied()
    }

    pub fn chars(&self) -> impl DoubleEndedIterator<Item = char> + '_ {
        self.contents.iter().copied()
    }

    pub fn text(&self) -> String {
        self.contents.iter().collect()
    }
}
