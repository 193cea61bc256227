//! Diagnostics Log: messages produced while translating one tick.
//!
//! A fresh log is built every tick, handed to the orchestrator, scanned
//! for the stop sentinel and then dropped.

use std::fmt;

/// Message carried by the entry that requests a graceful shutdown.
pub const STOP_SENTINEL: &str = "console:stop";

/// One diagnostics message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsEntry {
    message: String,
}

impl DiagnosticsEntry {
    /// Create an entry.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The shutdown sentinel entry.
    pub fn stop() -> Self {
        Self::new(STOP_SENTINEL)
    }

    /// The message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this entry is the shutdown sentinel.
    pub fn is_stop(&self) -> bool {
        self.message == STOP_SENTINEL
    }
}

impl fmt::Display for DiagnosticsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered entries for a single tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsLog {
    entries: Vec<DiagnosticsEntry>,
}

impl DiagnosticsLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    pub fn push(&mut self, entry: DiagnosticsEntry) {
        self.entries.push(entry);
    }

    /// Append a plain message.
    pub fn note(&mut self, message: impl Into<String>) {
        self.push(DiagnosticsEntry::new(message));
    }

    /// Move all entries of `other` onto the end of this log.
    pub fn append(&mut self, other: &mut Self) {
        self.entries.append(&mut other.entries);
    }

    /// Entries in the order they were produced.
    pub fn entries(&self) -> &[DiagnosticsEntry] {
        &self.entries
    }

    /// Whether any entry is the shutdown sentinel.
    pub fn contains_stop(&self) -> bool {
        self.entries.iter().any(DiagnosticsEntry::is_stop)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DiagnosticsLog {
    type Item = &'a DiagnosticsEntry;
    type IntoIter = std::slice::Iter<'a, DiagnosticsEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order() {
        let mut log = DiagnosticsLog::new();
        log.note("first");
        log.note("second");
        let messages: Vec<_> = log.entries().iter().map(DiagnosticsEntry::message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[test]
    fn test_contains_stop() {
        let mut log = DiagnosticsLog::new();
        log.note("cursor is not in assets");
        assert!(!log.contains_stop());
        log.push(DiagnosticsEntry::stop());
        assert!(log.contains_stop());
    }

    #[test]
    fn test_append_drains_other() {
        let mut log = DiagnosticsLog::new();
        let mut other = DiagnosticsLog::new();
        other.note("pending");
        log.append(&mut other);
        assert_eq!(log.len(), 1);
        assert!(other.is_empty());
    }
}
