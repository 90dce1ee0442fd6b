//! Shared validation state of one refactoring operation
//!
//! Every participant of an operation sees the same [`CheckConditionsContext`]
//! during final condition checking. Instead of validating in isolation, they
//! contribute to typed checkers that run once after the final phase.

pub mod resource_change;
pub mod validate_edit;

pub use resource_change::{ResourceChangeChecker, ResourceModifications};
pub use validate_edit::ValidateEditChecker;

use refkit_core::{ProgressMonitor, RefactoringStatus};
use std::any::{Any, TypeId};
use std::fmt;
use tracing::debug;

use crate::error::{RefactoringError, Result};

/// A checker participants contribute to during final condition checking
pub trait ConditionChecker: Send + Sync + 'static {
    /// Validate everything contributed so far
    fn check(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus>;
}

type CheckFn = fn(&mut (dyn Any + Send + Sync), &ProgressMonitor) -> Result<RefactoringStatus>;

struct CheckerSlot {
    type_id: TypeId,
    type_name: &'static str,
    checker: Box<dyn Any + Send + Sync>,
    check: CheckFn,
}

fn run_checker<T: ConditionChecker>(
    checker: &mut (dyn Any + Send + Sync),
    monitor: &ProgressMonitor,
) -> Result<RefactoringStatus> {
    match checker.downcast_mut::<T>() {
        Some(checker) => checker.check(monitor),
        None => Ok(RefactoringStatus::new()),
    }
}

/// Typed checkers shared by the processor and all participants of one
/// operation; at most one checker per type.
#[derive(Default)]
pub struct CheckConditionsContext {
    slots: Vec<CheckerSlot>,
}

impl CheckConditionsContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a checker; fails when a checker of the same type is present
    pub fn add<T: ConditionChecker>(&mut self, checker: T) -> Result<()> {
        if self.contains::<T>() {
            return Err(RefactoringError::invalid_state(format!(
                "checker {} already present",
                std::any::type_name::<T>()
            )));
        }
        self.slots.push(CheckerSlot {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            checker: Box::new(checker),
            check: run_checker::<T>,
        });
        Ok(())
    }

    /// Whether a checker of type `T` is present
    pub fn contains<T: ConditionChecker>(&self) -> bool {
        self.slots.iter().any(|s| s.type_id == TypeId::of::<T>())
    }

    /// The checker of type `T`
    pub fn get<T: ConditionChecker>(&self) -> Option<&T> {
        self.slots
            .iter()
            .find_map(|s| s.checker.downcast_ref::<T>())
    }

    /// The checker of type `T`, mutably
    pub fn get_mut<T: ConditionChecker>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find_map(|s| s.checker.downcast_mut::<T>())
    }

    /// The checker of type `T`, inserting one built by `create` if absent
    pub fn get_or_insert_with<T: ConditionChecker>(
        &mut self,
        create: impl FnOnce() -> T,
    ) -> Result<&mut T> {
        if !self.contains::<T>() {
            self.add(create())?;
        }
        self.get_mut::<T>().ok_or_else(|| {
            RefactoringError::invalid_state(format!(
                "checker {} missing after insertion",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Number of checkers
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the context holds no checker
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run every checker in insertion order and merge their statuses
    pub fn check(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        for slot in &mut self.slots {
            monitor.check_cancelled()?;
            let result = (slot.check)(slot.checker.as_mut(), monitor)?;
            debug!(checker = slot.type_name, severity = ?result.severity(), "Ran condition checker");
            status.merge(result);
        }
        Ok(status)
    }
}

impl fmt::Debug for CheckConditionsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.slots.iter().map(|s| s.type_name).collect();
        f.debug_struct("CheckConditionsContext")
            .field("checkers", &names)
            .finish()
    }
}
