//! Error types for change execution

use thiserror::Error;

use crate::change::{Change, NullChange};

/// Result type for change and workspace operations
pub type Result<T> = std::result::Result<T, ChangeError>;

/// Signal raised when a [`ProgressMonitor`](crate::ProgressMonitor) has been cancelled.
///
/// Cancellation is not a diagnostic severity; every crate converts this into its
/// own dedicated `Cancelled` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation cancelled")]
pub struct OperationCanceled;

/// Errors that can occur while performing changes
#[derive(Debug, Error)]
pub enum ChangeError {
    /// The monitor was cancelled before or while the change was performed
    #[error("Operation cancelled")]
    Cancelled,

    /// A resource the change depends on does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// A resource the change wants to create already exists
    #[error("Resource already exists: {0}")]
    ResourceExists(String),

    /// The resource was modified after the change captured its validation data
    #[error("Resource modified outside of the refactoring: {0}")]
    StaleResource(String),

    /// A text edit does not fit the current content
    #[error("Invalid text edit: {0}")]
    InvalidEdit(String),

    /// A composite change failed part way through.
    ///
    /// `undo` reverts exactly the children that were performed before the failure.
    #[error("Change '{name}' failed after {performed} of {total} children: {source}")]
    PartiallyPerformed {
        /// Name of the composite that failed
        name: String,
        /// Number of children performed before the failure
        performed: usize,
        /// Total number of children
        total: usize,
        /// The child failure
        #[source]
        source: Box<ChangeError>,
        /// Inverse of the children that were performed, in reverse order
        undo: Box<dyn Change>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ChangeError {
    /// Create a new ResourceNotFound error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound(resource.into())
    }

    /// Create a new ResourceExists error
    pub fn exists(resource: impl Into<String>) -> Self {
        Self::ResourceExists(resource.into())
    }

    /// Create a new error with a free-form message
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error stems from cancellation, directly or inside a composite
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::PartiallyPerformed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The partial inverse carried by a failed composite, if any
    pub fn partial_undo(&self) -> Option<&dyn Change> {
        match self {
            Self::PartiallyPerformed { undo, .. } => Some(undo.as_ref()),
            _ => None,
        }
    }

    /// Take the partial inverse out of a failed composite, if any
    pub fn into_partial_undo(self) -> Option<Box<dyn Change>> {
        match self {
            Self::PartiallyPerformed { undo, .. } => Some(undo),
            _ => None,
        }
    }

    /// Move the partial inverse out, leaving a no-op change in its place
    pub fn take_partial_undo(&mut self) -> Option<Box<dyn Change>> {
        match self {
            Self::PartiallyPerformed { name, undo, .. } => Some(std::mem::replace(
                undo,
                Box::new(NullChange::new(name.clone())),
            )),
            _ => None,
        }
    }
}

impl From<OperationCanceled> for ChangeError {
    fn from(_: OperationCanceled) -> Self {
        Self::Cancelled
    }
}
