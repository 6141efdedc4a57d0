//! Command history for the input line
//!
//! Stores submitted lines for recall with the arrow keys. Consecutive
//! duplicates are collapsed and the oldest entries fall off past the limit.

/// Default maximum number of history entries
pub const HISTORY_LIMIT: usize = 1000;

/// Submitted lines, oldest first
#[derive(Clone, Debug)]
pub struct CommandHistory {
    entries: Vec<String>,
    max_entries: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl CommandHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Add a line unless it repeats the most recent entry.
    ///
    /// Returns whether the line was stored.
    pub fn add(&mut self, line: &str) -> bool {
        if self.entries.last().map_or(false, |last| last == line) {
            return false;
        }

        self.entries.push(line.to_string());

        // Trim if exceeding limit
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        true
    }

    /// Entry `back` steps from the newest (0 = newest)
    pub fn recent(&self, back: usize) -> Option<&str> {
        self.entries
            .len()
            .checked_sub(back + 1)
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
