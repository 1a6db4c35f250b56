//! Bounded, append-only log of what was generated during a run.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::constants::DEFAULT_HISTORY_CAPACITY;

/// What produced a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    /// Prompt text only.
    Prompt,
    /// Single-stage image.
    Image,
    /// Two-stage image.
    Hybrid,
    /// Video job.
    Video,
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Prompt => "prompt",
            Self::Image => "image",
            Self::Hybrid => "hybrid",
            Self::Video => "video",
        };
        f.write_str(label)
    }
}

/// One generated item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// The prompt text that was sent.
    pub prompt: String,
    /// What kind of output it produced.
    pub kind: HistoryKind,
}

/// Append-only log that drops its oldest entry once full.
#[derive(Clone, Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    /// Creates a log holding at most `capacity` entries (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry stamped with the current time.
    pub fn record(&mut self, prompt: impl Into<String>, kind: HistoryKind) {
        self.push(HistoryEntry {
            timestamp: Utc::now(),
            prompt: prompt.into(),
            kind,
        });
    }

    /// Appends an entry, evicting the oldest when at capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let mut log = HistoryLog::with_capacity(3);
        log.record("one", HistoryKind::Prompt);
        log.record("two", HistoryKind::Image);
        let prompts: Vec<_> = log.entries().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["one", "two"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = HistoryLog::with_capacity(2);
        log.record("one", HistoryKind::Prompt);
        log.record("two", HistoryKind::Prompt);
        log.record("three", HistoryKind::Video);
        let prompts: Vec<_> = log.entries().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["two", "three"]);
        assert_eq!(log.capacity(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut log = HistoryLog::default();
        log.record("same", HistoryKind::Image);
        log.record("same", HistoryKind::Image);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut log = HistoryLog::with_capacity(0);
        log.record("a", HistoryKind::Hybrid);
        log.record("b", HistoryKind::Hybrid);
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.entries().next().map(|e| e.kind.to_string()),
            Some("hybrid".to_string())
        );
    }
}
