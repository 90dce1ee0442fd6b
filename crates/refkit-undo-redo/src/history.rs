//! History entries and the undo/redo stacks

use chrono::{DateTime, Utc};
use refkit_core::Change;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration for the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries; the oldest is dropped once exceeded.
    /// Zero means unlimited.
    pub undo_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { undo_limit: 100 }
    }
}

/// One undoable or redoable unit
#[derive(Debug)]
pub struct HistoryEntry {
    /// Unique id of the entry
    pub id: Uuid,
    /// Display name shown to the user
    pub name: String,
    /// Change executed when the entry is undone or redone
    pub change: Box<dyn Change>,
    /// When the entry was pushed
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create a new history entry
    pub fn new(name: impl Into<String>, change: Box<dyn Change>) -> Self {
        HistoryEntry {
            id: Uuid::new_v4(),
            name: name.into(),
            change,
            recorded_at: Utc::now(),
        }
    }

    /// Metadata of the entry without the change
    pub fn info(&self) -> HistoryEntryInfo {
        HistoryEntryInfo {
            id: self.id,
            name: self.name.clone(),
            recorded_at: self.recorded_at,
        }
    }
}

/// Serializable metadata of a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryInfo {
    /// Unique id of the entry
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// When the entry was pushed
    pub recorded_at: DateTime<Utc>,
}

/// The two LIFO stacks
#[derive(Debug)]
pub struct HistoryStacks {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    undo_limit: usize,
}

impl HistoryStacks {
    /// Create empty stacks with the given configuration
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            undo_limit: config.undo_limit,
        }
    }

    /// Record a new undo entry; the redo stack is cleared
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        self.push_undo(entry);
    }

    /// Push onto the undo stack, keeping the redo stack
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        if self.undo_limit > 0 && self.undo.len() > self.undo_limit {
            let excess = self.undo.len() - self.undo_limit;
            self.undo.drain(..excess);
        }
    }

    /// Push onto the redo stack
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    /// Pop the most recent undo entry
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop()
    }

    /// Pop the most recent redo entry
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    /// Empty both stacks, returning how many entries were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.undo.len() + self.redo.len();
        self.undo.clear();
        self.redo.clear();
        dropped
    }

    /// Next undo entry
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo.last()
    }

    /// Next redo entry
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.redo.last()
    }

    /// Number of undo entries
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo entries
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo entries, most recent first
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter().rev()
    }

    /// Redo entries, most recent first
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo.iter().rev()
    }
}
