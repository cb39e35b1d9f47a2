//! Bounded, append-only event log.
//!
//! Every engine records one [`LogEntry`] per visible transition. The log
//! keeps the most recent `capacity` entries; pushing onto a full log evicts
//! the oldest entry. The write position never wraps, so
//! [`total_pushed`](EventLog::total_pushed) counts every entry ever
//! recorded, including evicted ones.

use std::collections::VecDeque;

use crate::id::TickId;

/// Default number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// One event-log line.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    /// Tick during which the event happened.
    pub tick: TickId,
    /// Human-readable description.
    pub message: String,
}

/// A fixed-capacity log that evicts its oldest entry when full.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    total_pushed: u64,
}

impl EventLog {
    /// Create an empty log retaining at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Engine configs reject a zero log
    /// capacity during validation, before a log is ever built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "EventLog capacity must be >= 1, got {capacity}");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    /// Append an entry, evicting the oldest one if the log is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, tick: TickId, message: impl Into<String>) -> Option<LogEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(LogEntry {
            tick,
            message: message.into(),
        });
        self.total_pushed += 1;
        evicted
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries ever pushed, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Entries lost to eviction.
    pub fn evicted(&self) -> u64 {
        self.total_pushed - self.entries.len() as u64
    }

    /// Owned copy of the retained entries, oldest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Drop every entry and zero the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_pushed = 0;
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
