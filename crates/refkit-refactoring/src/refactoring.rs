//! Processor-based refactoring pipeline
//!
//! [`ProcessorBasedRefactoring`] moves strictly forward through
//! applicability, initial conditions, final conditions and change creation.
//! A FATAL status ends the pipeline for this instance; so does a cancelled
//! monitor, which surfaces as [`RefactoringError::Cancelled`] and never as a
//! status entry.

use refkit_core::{
    Change, CompositeChange, ElementRef, ProgressMonitor, RefactoringStatus, Workspace,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::conditions::{CheckConditionsContext, ResourceChangeChecker, ValidateEditChecker};
use crate::error::{RefactoringError, Result};
use crate::participant::{OperationStyle, ProcessorInfo, RefactoringProcessor};
use crate::registry::ParticipantRegistry;
use crate::sharable::ParticipantSet;

/// Position of a refactoring in its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactoringState {
    /// Nothing has been checked yet
    Created,
    /// Initial conditions passed without FATAL
    InitialChecked,
    /// Final conditions passed without FATAL
    FinalChecked,
    /// The change was created; the pipeline is done
    ChangeCreated,
    /// A FATAL status or a failure ended the pipeline
    Aborted,
    /// The monitor was cancelled
    Cancelled,
}

impl RefactoringState {
    /// Whether no further step is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefactoringState::ChangeCreated | RefactoringState::Aborted | RefactoringState::Cancelled
        )
    }
}

impl fmt::Display for RefactoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefactoringState::Created => "created",
            RefactoringState::InitialChecked => "initial_checked",
            RefactoringState::FinalChecked => "final_checked",
            RefactoringState::ChangeCreated => "change_created",
            RefactoringState::Aborted => "aborted",
            RefactoringState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A refactoring defined by a processor and extended by participants
pub struct ProcessorBasedRefactoring {
    processor: Box<dyn RefactoringProcessor>,
    registry: Arc<ParticipantRegistry>,
    workspace: Arc<dyn Workspace>,
    participants: ParticipantSet,
    derived_start: Option<usize>,
    status: RefactoringStatus,
    state: RefactoringState,
}

impl ProcessorBasedRefactoring {
    /// Wrap `processor`; participants are looked up in `registry`
    pub fn new(
        processor: Box<dyn RefactoringProcessor>,
        registry: Arc<ParticipantRegistry>,
        workspace: Arc<dyn Workspace>,
    ) -> Self {
        Self {
            processor,
            registry,
            workspace,
            participants: ParticipantSet::new(),
            derived_start: None,
            status: RefactoringStatus::new(),
            state: RefactoringState::Created,
        }
    }

    /// Create the processor for `elements` through the registry and wrap it
    pub fn for_elements(
        elements: &[ElementRef],
        registry: Arc<ParticipantRegistry>,
        workspace: Arc<dyn Workspace>,
    ) -> Result<Option<Self>> {
        let processor = registry.create_processor(elements)?;
        Ok(processor.map(|p| Self::new(p, registry, workspace)))
    }

    /// Display name of the operation
    pub fn name(&self) -> &str {
        self.processor.name()
    }

    /// The processor
    pub fn processor(&self) -> &dyn RefactoringProcessor {
        self.processor.as_ref()
    }

    /// Presentation flags of the operation
    pub fn style(&self) -> OperationStyle {
        self.processor.style()
    }

    /// Workspace the operation modifies
    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// Current pipeline state
    pub fn state(&self) -> RefactoringState {
        self.state
    }

    /// Every status entry produced so far
    pub fn status(&self) -> &RefactoringStatus {
        &self.status
    }

    /// Names of loaded participants, element participants first
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.names()
    }

    /// Number of participants loaded for the processor's elements
    pub fn element_participant_count(&self) -> usize {
        self.derived_start.unwrap_or(self.participants.len())
    }

    /// Number of participants derived from resource modifications
    pub fn derived_participant_count(&self) -> usize {
        self.derived_start
            .map(|start| self.participants.len() - start)
            .unwrap_or(0)
    }

    fn expect_state(&self, expected: RefactoringState, operation: &str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(RefactoringError::invalid_state(format!(
            "cannot {} a refactoring in state {}",
            operation, self.state
        )))
    }

    /// Cancellation point between steps
    fn checkpoint(&mut self, monitor: &ProgressMonitor) -> Result<()> {
        if monitor.is_cancelled() {
            debug!(refactoring = %self.processor.name(), "Refactoring cancelled");
            self.state = RefactoringState::Cancelled;
            return Err(RefactoringError::Cancelled);
        }
        Ok(())
    }

    /// Record a processor failure and end the pipeline
    fn fail(&mut self, err: RefactoringError) -> RefactoringError {
        if err.is_cancelled() {
            self.state = RefactoringState::Cancelled;
            return RefactoringError::Cancelled;
        }
        self.state = RefactoringState::Aborted;
        err
    }

    /// Turn a participant failure into a FATAL entry; cancellation passes through
    fn participant_outcome(
        &mut self,
        name: &str,
        result: Result<RefactoringStatus>,
    ) -> Result<RefactoringStatus> {
        match result {
            Ok(status) => Ok(status),
            Err(err) if err.is_cancelled() => Err(self.fail(err)),
            Err(err) => {
                warn!(participant = %name, error = %err, "Participant check failed");
                Ok(RefactoringStatus::create_fatal_error(format!(
                    "Participant '{}' failed: {}",
                    name, err
                )))
            }
        }
    }

    fn finish_phase(&mut self, phase: RefactoringStatus, next: RefactoringState) -> RefactoringStatus {
        self.status.merge(phase.clone());
        self.state = if phase.has_fatal_error() {
            RefactoringState::Aborted
        } else {
            next
        };
        debug!(
            refactoring = %self.processor.name(),
            state = %self.state,
            severity = ?phase.severity(),
            "Phase finished"
        );
        phase
    }

    /// Check applicability and initial conditions of the processor, load the
    /// element participants and check their initial conditions.
    ///
    /// Returns the status of this phase.
    pub fn check_initial_conditions(
        &mut self,
        monitor: &ProgressMonitor,
    ) -> Result<RefactoringStatus> {
        self.expect_state(RefactoringState::Created, "check initial conditions of")?;
        self.checkpoint(monitor)?;

        let applicable = match self.processor.is_applicable() {
            Ok(applicable) => applicable,
            Err(err) => return Err(self.fail(err)),
        };
        if !applicable {
            let status = RefactoringStatus::create_fatal_error(format!(
                "'{}' is not applicable to the selected elements",
                self.processor.name()
            ));
            return Ok(self.finish_phase(status, RefactoringState::Aborted));
        }

        let mut phase = match self.processor.check_initial_conditions(monitor) {
            Ok(status) => status,
            Err(err) => return Err(self.fail(err)),
        };
        if phase.has_fatal_error() {
            return Ok(self.finish_phase(phase, RefactoringState::InitialChecked));
        }

        self.checkpoint(monitor)?;
        let info = self.processor.info();
        let requests = self.processor.participant_requests();
        self.registry
            .load_participants(&info, &requests, &mut self.participants, &mut phase);
        debug!(
            refactoring = %info.name,
            participants = self.participants.len(),
            "Loaded element participants"
        );

        let statuses = self.run_initial_checks(0, monitor)?;
        phase.merge(statuses);
        Ok(self.finish_phase(phase, RefactoringState::InitialChecked))
    }

    fn run_initial_checks(
        &mut self,
        start: usize,
        monitor: &ProgressMonitor,
    ) -> Result<RefactoringStatus> {
        let mut phase = RefactoringStatus::new();
        let count = self.participants.len();
        for index in start..count {
            self.checkpoint(monitor)?;
            let (name, result) = {
                let Some(loaded) = self.participants.get_mut(index) else {
                    break;
                };
                let participant = loaded.participant_mut();
                (
                    participant.name().to_string(),
                    participant.check_initial_conditions(monitor),
                )
            };
            let status = self.participant_outcome(&name, result)?;
            phase.merge(status);
            if phase.has_fatal_error() {
                break;
            }
        }
        Ok(phase)
    }

    fn run_final_checks(
        &mut self,
        start: usize,
        monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        let mut phase = RefactoringStatus::new();
        let count = self.participants.len();
        for index in start..count {
            self.checkpoint(monitor)?;
            let (name, result) = {
                let Some(loaded) = self.participants.get_mut(index) else {
                    break;
                };
                let participant = loaded.participant_mut();
                (
                    participant.name().to_string(),
                    participant.check_final_conditions(monitor, context),
                )
            };
            let status = self.participant_outcome(&name, result)?;
            phase.merge(status);
            if phase.has_fatal_error() {
                break;
            }
        }
        Ok(phase)
    }

    /// Check final conditions of the processor and the element participants,
    /// then load and check the participants derived from the recorded
    /// resource modifications, and finally run the shared checkers.
    ///
    /// Returns the status of this phase.
    pub fn check_final_conditions(
        &mut self,
        monitor: &ProgressMonitor,
    ) -> Result<RefactoringStatus> {
        self.expect_state(RefactoringState::InitialChecked, "check final conditions of")?;
        self.checkpoint(monitor)?;

        let mut context = CheckConditionsContext::new();
        context.add(ValidateEditChecker::new(self.workspace.clone()))?;
        context.add(ResourceChangeChecker::new(self.workspace.clone()))?;

        let mut phase = match self
            .processor
            .check_final_conditions(monitor, &mut context)
        {
            Ok(status) => status,
            Err(err) => return Err(self.fail(err)),
        };
        if phase.has_fatal_error() {
            return Ok(self.finish_phase(phase, RefactoringState::FinalChecked));
        }

        let element_participants = self.participants.len();
        let statuses = self.run_final_checks(0, monitor, &mut context)?;
        phase.merge(statuses);
        if phase.has_fatal_error() {
            return Ok(self.finish_phase(phase, RefactoringState::FinalChecked));
        }

        self.checkpoint(monitor)?;
        let requests = context
            .get::<ResourceChangeChecker>()
            .map(|checker| checker.modifications().requests().to_vec())
            .unwrap_or_default();
        self.derived_start = Some(element_participants);
        if !requests.is_empty() {
            let info: ProcessorInfo = self.processor.info();
            self.registry
                .load_participants(&info, &requests, &mut self.participants, &mut phase);
            debug!(
                refactoring = %info.name,
                derived = self.participants.len() - element_participants,
                "Loaded derived participants"
            );
            // Initial checks of all derived participants complete before any
            // of their final checks begins
            let initial = self.run_initial_checks(element_participants, monitor)?;
            phase.merge(initial);
            if !phase.has_fatal_error() {
                let derived = self.run_final_checks(element_participants, monitor, &mut context)?;
                phase.merge(derived);
            }
            if phase.has_fatal_error() {
                return Ok(self.finish_phase(phase, RefactoringState::FinalChecked));
            }
        }

        self.checkpoint(monitor)?;
        match context.check(monitor) {
            Ok(status) => phase.merge(status),
            Err(err) => return Err(self.fail(err)),
        }
        Ok(self.finish_phase(phase, RefactoringState::FinalChecked))
    }

    /// Run both condition phases and return their merged status
    pub fn check_all_conditions(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let mut status = self.check_initial_conditions(monitor)?;
        if status.has_fatal_error() {
            return Ok(status);
        }
        status.merge(self.check_final_conditions(monitor)?);
        Ok(status)
    }

    /// Create the change: the processor's change first, then every
    /// participant's in discovery order (element participants before derived
    /// ones), wrapped in one composite named after the processor.
    pub fn create_change(&mut self, monitor: &ProgressMonitor) -> Result<CompositeChange> {
        self.expect_state(RefactoringState::FinalChecked, "create the change of")?;
        self.checkpoint(monitor)?;

        let mut composite = CompositeChange::new(self.processor.name());
        match self.processor.create_change(monitor) {
            Ok(change) => composite.add(change),
            Err(err) => return Err(self.fail(err)),
        }

        let count = self.participants.len();
        for index in 0..count {
            self.checkpoint(monitor)?;
            let (name, result) = {
                let Some(loaded) = self.participants.get_mut(index) else {
                    break;
                };
                let participant = loaded.participant_mut();
                (participant.name().to_string(), participant.create_change(monitor))
            };
            match result {
                Ok(Some(change)) => composite.add(change),
                Ok(None) => debug!(participant = %name, "Participant contributed no change"),
                Err(err) if err.is_cancelled() => return Err(self.fail(err)),
                Err(err) => {
                    warn!(participant = %name, error = %err, "Participant failed to create its change");
                    return Err(self.fail(RefactoringError::participant(name, err.to_string())));
                }
            }
        }

        composite.initialize_validation_data(monitor);
        self.state = RefactoringState::ChangeCreated;
        info!(
            refactoring = %composite.name(),
            children = composite.len(),
            "Created change"
        );
        Ok(composite)
    }
}

impl fmt::Debug for ProcessorBasedRefactoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorBasedRefactoring")
            .field("processor", &self.processor.identifier())
            .field("state", &self.state)
            .field("participants", &self.participants)
            .field("severity", &self.status.severity())
            .finish()
    }
}
