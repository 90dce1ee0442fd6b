//! Reversible units of workspace mutation
//!
//! Performing a [`Change`] returns its inverse. Performing the inverse restores
//! every resource the change touched: content byte for byte, and workspace
//! membership structurally.

pub mod composite;
pub mod null;
pub mod resource;

pub use composite::CompositeChange;
pub use null::NullChange;
pub use resource::{CreateFileChange, DeleteFileChange, MoveFileChange, TextEdit, TextFileChange};

use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::element::ElementRef;
use crate::error::Result;
use crate::monitor::ProgressMonitor;
use crate::status::RefactoringStatus;

/// A reversible, named unit of mutation
pub trait Change: fmt::Debug + Send + Sync {
    /// Display name
    fn name(&self) -> &str;

    /// Whether the change will be applied when performed
    fn is_active(&self) -> bool;

    /// Activate or deactivate the change
    fn set_active(&mut self, active: bool);

    /// Apply the mutation and return its inverse.
    ///
    /// Implementations may assume the change is active; callers go through
    /// [`perform`](Change::perform).
    fn execute(&mut self, monitor: &ProgressMonitor) -> Result<Box<dyn Change>>;

    /// Perform the change and return its inverse.
    ///
    /// An inactive change does nothing and its inverse is a [`NullChange`].
    fn perform(&mut self, monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        if !self.is_active() {
            debug!(change = %self.name(), "Skipping inactive change");
            return Ok(Box::new(NullChange::new(self.name())));
        }
        monitor.check_cancelled()?;
        self.execute(monitor)
    }

    /// Capture the state `is_valid` later compares against
    fn initialize_validation_data(&mut self, _monitor: &ProgressMonitor) {}

    /// Check whether the change can still be performed.
    ///
    /// A FATAL status means performing would corrupt the workspace.
    fn is_valid(&self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        Ok(RefactoringStatus::new())
    }

    /// Element modified by this change
    fn modified_element(&self) -> Option<ElementRef> {
        None
    }

    /// Resources touched when the change is performed
    fn affected_resources(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Downcast helper for composites
    fn as_composite(&self) -> Option<&CompositeChange> {
        None
    }
}
