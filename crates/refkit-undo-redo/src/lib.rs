#![warn(missing_docs)]

//! Undo/redo history for refkit
//!
//! Keeps two LIFO stacks of performed changes. Recording a new entry clears the
//! redo stack, and any workspace mutation the manager did not announce flushes
//! both stacks so stale inverses are never replayed.

pub mod error;
pub mod history;
pub mod listener;
pub mod manager;

// Re-export public API
pub use error::{Result, UndoRedoError};
pub use history::{HistoryConfig, HistoryEntry, HistoryEntryInfo, HistoryStacks};
pub use listener::UndoManagerListener;
pub use manager::UndoManager;
