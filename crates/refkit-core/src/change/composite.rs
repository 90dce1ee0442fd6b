//! Ordered aggregation of changes

use std::path::PathBuf;
use tracing::{debug, warn};

use super::Change;
use crate::error::{ChangeError, Result};
use crate::monitor::ProgressMonitor;
use crate::status::RefactoringStatus;

/// An ordered sequence of child changes performed as one unit.
///
/// Children perform in list order; the inverse holds the children's inverses in
/// reverse order. If a child fails, the composite stops and reports
/// [`ChangeError::PartiallyPerformed`] carrying the inverse of everything that
/// did perform.
#[derive(Debug)]
pub struct CompositeChange {
    name: String,
    children: Vec<Box<dyn Change>>,
    active: bool,
}

impl CompositeChange {
    /// Create an empty composite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            active: true,
        }
    }

    /// Create a composite holding `children`
    pub fn with_children(name: impl Into<String>, children: Vec<Box<dyn Change>>) -> Self {
        Self {
            name: name.into(),
            children,
            active: true,
        }
    }

    /// Append a child
    pub fn add(&mut self, change: Box<dyn Change>) {
        self.children.push(change);
    }

    /// Append several children
    pub fn add_all(&mut self, changes: impl IntoIterator<Item = Box<dyn Change>>) {
        self.children.extend(changes);
    }

    /// Move all children of `other` to the end of this composite
    pub fn merge(&mut self, other: CompositeChange) {
        self.children.extend(other.children);
    }

    /// Children in perform order
    pub fn children(&self) -> &[Box<dyn Change>] {
        &self.children
    }

    /// Mutable access to a child
    pub fn child_mut(&mut self, index: usize) -> Option<&mut Box<dyn Change>> {
        self.children.get_mut(index)
    }

    /// Take the children out, leaving the composite empty
    pub fn take_children(&mut self) -> Vec<Box<dyn Change>> {
        std::mem::take(&mut self.children)
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the composite has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Names of the direct children, in order
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name()).collect()
    }
}

impl Change for CompositeChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        for child in &mut self.children {
            child.set_active(active);
        }
    }

    fn execute(&mut self, monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        let total = self.children.len();
        let mut undos: Vec<Box<dyn Change>> = Vec::with_capacity(total);

        for (index, child) in self.children.iter_mut().enumerate() {
            let outcome = match monitor.check_cancelled() {
                Ok(()) => child.perform(monitor),
                Err(cancelled) => Err(cancelled.into()),
            };
            match outcome {
                Ok(undo) => undos.push(undo),
                Err(mut err) => {
                    warn!(
                        change = %self.name,
                        child = %child.name(),
                        performed = index,
                        total,
                        error = %err,
                        "Composite change failed part way"
                    );
                    if let Some(nested) = err.take_partial_undo() {
                        // The nested composite did apply some of its children
                        undos.push(nested);
                    }
                    undos.reverse();
                    return Err(ChangeError::PartiallyPerformed {
                        name: self.name.clone(),
                        performed: index,
                        total,
                        source: Box::new(err),
                        undo: Box::new(CompositeChange::with_children(self.name.clone(), undos)),
                    });
                }
            }
            monitor.worked(1);
        }

        debug!(change = %self.name, children = total, "Performed composite change");
        undos.reverse();
        Ok(Box::new(CompositeChange::with_children(
            self.name.clone(),
            undos,
        )))
    }

    fn initialize_validation_data(&mut self, monitor: &ProgressMonitor) {
        for child in &mut self.children {
            child.initialize_validation_data(monitor);
        }
    }

    fn is_valid(&self, monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        for child in self.children.iter().filter(|c| c.is_active()) {
            monitor.check_cancelled()?;
            status.merge(child.is_valid(monitor)?);
            if status.has_fatal_error() {
                break;
            }
        }
        Ok(status)
    }

    fn affected_resources(&self) -> Vec<PathBuf> {
        let mut resources: Vec<PathBuf> = self
            .children
            .iter()
            .flat_map(|c| c.affected_resources())
            .collect();
        resources.sort();
        resources.dedup();
        resources
    }

    fn as_composite(&self) -> Option<&CompositeChange> {
        Some(self)
    }
}
