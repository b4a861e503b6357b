//! Bounded history of raw device lines.

use std::collections::VecDeque;

/// The most recent distinct raw lines, oldest first.
#[derive(Debug, Clone)]
pub struct RawLineHistory {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RawLineHistory {
    /// Create a history holding at most `capacity` lines (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `line` unless it is empty or equal to the newest entry.
    ///
    /// Returns `true` if the line was added.
    pub fn push_if_new(&mut self, line: &str) -> bool {
        if line.is_empty() || self.lines.back().is_some_and(|last| last == line) {
            return false;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
        true
    }

    /// Newline-joined lines, oldest first
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
