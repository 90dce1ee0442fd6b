//! Error types for the undo/redo history

use refkit_core::{ChangeError, RefactoringStatus};
use thiserror::Error;

/// Errors that can occur while undoing or redoing
#[derive(Debug, Error)]
pub enum UndoRedoError {
    /// Undo stack is empty
    #[error("No more undos available")]
    NoMoreUndos,

    /// Redo stack is empty
    #[error("No more redos available")]
    NoMoreRedos,

    /// Cancelled before the entry was executed
    #[error("Undo/redo cancelled")]
    Cancelled,

    /// The entry can no longer be executed against the workspace
    #[error("'{name}' can no longer be applied: {status}")]
    InvalidChange {
        /// Entry name
        name: String,
        /// Validity status reported by the change
        status: RefactoringStatus,
    },

    /// Executing the entry failed
    #[error("Executing '{name}' failed: {source}")]
    ExecutionFailed {
        /// Entry name
        name: String,
        /// Underlying change failure
        #[source]
        source: ChangeError,
    },
}

impl UndoRedoError {
    /// Create an ExecutionFailed error for the named entry
    pub fn execution_failed(name: impl Into<String>, source: ChangeError) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            source,
        }
    }
}

/// Result type for undo/redo operations
pub type Result<T> = std::result::Result<T, UndoRedoError>;
