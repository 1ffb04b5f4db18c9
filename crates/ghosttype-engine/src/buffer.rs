//! Bounded sliding-window record of recent user keystrokes.
use std::collections::VecDeque;

/// Ordered record of the characters the user has typed, capacity-bounded.
///
/// Holds only real user input; synthetic engine output never lands here.
/// At capacity the oldest character is evicted — old context simply ages
/// out, it is never an error.
#[derive(Debug)]
pub struct Buffer {
    chars: VecDeque<char>,
    cap: usize,
}

impl Buffer {
    /// Create a buffer holding at most `cap` characters.
    pub fn new(cap: usize) -> Self {
        Self {
            chars: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append one character, evicting the oldest when full.
    pub fn append(&mut self, c: char) {
        if self.chars.len() == self.cap {
            self.chars.pop_front();
        }
        self.chars.push_back(c);
    }

    /// Remove the most recent character, if any.
    pub fn backspace(&mut self) {
        self.chars.pop_back();
    }

    /// Extend with the characters of an accepted suggestion.
    pub fn extend(&mut self, text: &str) {
        for c in text.chars() {
            self.append(c);
        }
    }

    /// Drop all content.
    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Current content as a string.
    pub fn snapshot(&self) -> String {
        self.chars.iter().collect()
    }

    /// Number of characters after trimming surrounding whitespace, the
    /// measure used for the trigger threshold.
    pub fn trimmed_len(&self) -> usize {
        self.snapshot().trim().chars().count()
    }

    /// True when nothing has been typed since the last clear.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
