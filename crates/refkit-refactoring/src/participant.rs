//! Processor and participant contracts
//!
//! A [`RefactoringProcessor`] defines the primary mutation of an operation and
//! gives it its identity. [`RefactoringParticipant`]s are secondary
//! contributors selected by the registry for each element the processor
//! touches. Participants never own their processor; they see a
//! [`ProcessorInfo`] snapshot.

use refkit_core::{Change, ElementRef, ProgressMonitor, RefactoringStatus};
use serde::{Deserialize, Serialize};

use crate::arguments::RefactoringArguments;
use crate::conditions::CheckConditionsContext;
use crate::error::Result;

/// Presentation flags of an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStyle {
    /// The host should show a preview before performing
    pub needs_preview: bool,
    /// Affected resources must be saved before the operation runs
    pub needs_save: bool,
}

impl OperationStyle {
    /// Style requesting a preview
    pub fn preview() -> Self {
        Self {
            needs_preview: true,
            ..Self::default()
        }
    }
}

/// Non-owning view of the processor a participant works for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInfo {
    /// Processor identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Primary elements
    pub elements: Vec<ElementRef>,
}

/// One participant lookup the processor asks for: an element plus what
/// happens to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRequest {
    /// Affected element
    pub element: ElementRef,
    /// Mutation applied to the element
    pub arguments: RefactoringArguments,
}

impl ParticipantRequest {
    /// Create a request
    pub fn new(element: ElementRef, arguments: impl Into<RefactoringArguments>) -> Self {
        Self {
            element,
            arguments: arguments.into(),
        }
    }
}

/// Primary definer of a refactoring operation
pub trait RefactoringProcessor: Send + Sync {
    /// Stable identifier; participants match on it
    fn identifier(&self) -> &str;

    /// Display name, also used for the created change
    fn name(&self) -> &str;

    /// Primary targets
    fn elements(&self) -> Vec<ElementRef>;

    /// Cheap precondition checked before anything else
    fn is_applicable(&self) -> Result<bool>;

    /// Fast, local validation
    fn check_initial_conditions(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus>;

    /// Expensive, global validation
    fn check_final_conditions(
        &mut self,
        monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus>;

    /// Primary mutation
    fn create_change(&mut self, monitor: &ProgressMonitor) -> Result<Box<dyn Change>>;

    /// Elements participants are loaded for, with the mutation each receives.
    ///
    /// Called once initial conditions of the processor have passed.
    fn participant_requests(&self) -> Vec<ParticipantRequest>;

    /// Presentation flags
    fn style(&self) -> OperationStyle {
        OperationStyle::default()
    }

    /// Snapshot handed to participants
    fn info(&self) -> ProcessorInfo {
        ProcessorInfo {
            id: self.identifier().to_string(),
            name: self.name().to_string(),
            elements: self.elements(),
        }
    }
}

/// Secondary contributor to a refactoring operation
pub trait RefactoringParticipant: Send + Sync {
    /// Display name
    fn name(&self) -> &str;

    /// Bind the participant to its first element.
    ///
    /// Returning `Ok(false)` means the participant has nothing to contribute
    /// and is dropped.
    fn initialize(
        &mut self,
        processor: &ProcessorInfo,
        element: &ElementRef,
        arguments: &RefactoringArguments,
    ) -> Result<bool>;

    /// Whether the participant can currently contribute
    fn is_available(&self) -> bool {
        true
    }

    /// Fast, local validation
    fn check_initial_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
    ) -> Result<RefactoringStatus> {
        Ok(RefactoringStatus::new())
    }

    /// Expensive validation; may contribute to shared checkers in `context`
    fn check_final_conditions(
        &mut self,
        monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus>;

    /// Secondary mutation, `None` when there is nothing to change
    fn create_change(&mut self, monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>>;

    /// The sharable capability, if the participant has it
    fn as_sharable(&mut self) -> Option<&mut dyn SharableParticipant> {
        None
    }
}

/// Participant that accumulates every element matching its descriptor
/// instead of being instantiated once per element
pub trait SharableParticipant {
    /// Add another element handled by this instance
    fn add_element(&mut self, element: &ElementRef, arguments: &RefactoringArguments);
}
