//! Bounded, newest-first retention of log entries.
//!
//! The buffer is a display log, not a durable record: when full, the oldest
//! entry is dropped to make room. Appends never block and never fail. Order
//! is arrival order; embedded timestamps are not consulted because server and
//! client clocks may disagree.

use std::collections::VecDeque;

use crate::LogEntry;

/// Default retention.
pub const DEFAULT_CAPACITY: usize = 100;

/// Ring of the most recent entries, newest at the front.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    evicted: u64,
}

impl LogBuffer {
    /// Create an empty buffer holding at most `capacity` entries.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity, evicted: 0 }
    }

    /// Insert `entry` as the newest, evicting the oldest when full.
    pub fn append(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
            self.evicted += 1;
        }
        self.entries.push_front(entry);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Owned copy of the entries, newest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Borrowing iterator, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Oldest retained entry.
    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped by eviction since creation. `clear` does not count.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
