#![warn(missing_docs)]

//! Core primitives for the refkit refactoring engine
//!
//! Provides the pieces every other refkit crate builds on:
//!
//! - **Status**: severity-leveled diagnostics (`OK < INFO < WARNING < ERROR < FATAL`)
//! - **Change**: reversible units of workspace mutation, composed by [`CompositeChange`]
//! - **Workspace**: the mutable resource set changes operate on, with change notifications
//! - **ProgressMonitor**: cooperative cancellation shared by all phases of an operation

pub mod change;
pub mod element;
pub mod error;
pub mod monitor;
pub mod status;
pub mod workspace;

// Re-export public API
pub use change::{
    CompositeChange, CreateFileChange, DeleteFileChange, MoveFileChange, NullChange, TextEdit,
    TextFileChange, Change,
};
pub use element::ElementRef;
pub use error::{ChangeError, OperationCanceled, Result};
pub use monitor::ProgressMonitor;
pub use status::{RefactoringStatus, Severity, StatusContext, StatusEntry};
pub use workspace::{
    FsWorkspace, ListenerId, MemoryWorkspace, ModelChangeEvent, ModelChangeKind,
    ModelChangeListener, ModelChangeNotifier, ResourceStamp, Workspace,
};
