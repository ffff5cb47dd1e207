pub const HISTORY_CAPACITY: usize = 16;

/// Result of moving the browse cursor towards newer entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browse<'h> {
    Entry(&'h str),
    /// Moved past the newest entry, back to a fresh line.
    Blank,
}

/// Ring of the most recently accepted lines.
///
/// Entries are addressed by their absolute index `0..total_saved`; only the
/// last `capacity` of them are still stored. `browse_cursor == total_saved`
/// means no entry is being browsed.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<String>,
    capacity: usize,
    total_saved: usize,
    browse_cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            total_saved: 0,
            browse_cursor: 0,
        }
    }

    pub fn total_saved(&self) -> usize {
        self.total_saved
    }

    pub fn browse_cursor(&self) -> usize {
        self.browse_cursor
    }

    /// Absolute index of the oldest entry still stored.
    fn oldest(&self) -> usize {
        self.total_saved.saturating_sub(self.capacity)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        if index < self.oldest() || index >= self.total_saved {
            return None;
        }
        self.entries.get(index % self.capacity).map(String::as_str)
    }

    pub fn newest(&self) -> Option<&str> {
        self.total_saved.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Stored entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (self.oldest()..self.total_saved).filter_map(|i| self.get(i))
    }

    /// Saves an accepted line unless it is empty or repeats the newest
    /// entry, and stops browsing either way. Returns whether it was saved.
    pub fn push(&mut self, line: &str) -> bool {
        let saved = !line.is_empty() && self.newest() != Some(line);

        if saved {
            let slot = self.total_saved % self.capacity;
            if slot < self.entries.len() {
                self.entries[slot] = line.to_owned();
            } else {
                self.entries.push(line.to_owned());
            }
            self.total_saved += 1;
        }

        self.reset_browsing();
        saved
    }

    pub fn reset_browsing(&mut self) {
        self.browse_cursor = self.total_saved;
    }

    /// Cursor up: the next older entry, if there is one.
    pub fn older(&mut self) -> Option<&str> {
        if self.browse_cursor <= self.oldest() {
            return None;
        }
        self.browse_cursor -= 1;
        self.get(self.browse_cursor)
    }

    /// Cursor down: `None` when not browsing at all.
    pub fn newer(&mut self) -> Option<Browse<'_>> {
        if self.browse_cursor >= self.total_saved {
            return None;
        }
        self.browse_cursor += 1;

        match self.get(self.browse_cursor) {
            Some(entry) => Some(Browse::Entry(entry)),
            None => Some(Browse::Blank),
        }
    }
}
