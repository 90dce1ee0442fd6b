//! Performing changes and whole refactorings
//!
//! [`PerformChangeOperation`] executes one change against the workspace and
//! records its inverse with an [`UndoManager`]. [`PerformRefactoringOperation`]
//! runs a refactoring's condition checks, creates the change and performs it.

use refkit_core::{Change, ProgressMonitor, RefactoringStatus, Workspace};
use refkit_undo_redo::UndoManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;
use crate::error::{RefactoringError, Result};
use crate::refactoring::ProcessorBasedRefactoring;

/// Result of a successful [`PerformChangeOperation`]
pub struct ChangeExecution {
    /// Name of the performed change
    pub name: String,
    /// Validity status observed before performing
    pub validation_status: RefactoringStatus,
    /// Whether the inverse was pushed onto the undo stack
    pub undo_recorded: bool,
    /// The inverse, when no undo manager took it
    pub undo: Option<Box<dyn Change>>,
}

impl fmt::Debug for ChangeExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeExecution")
            .field("name", &self.name)
            .field("validation_status", &self.validation_status)
            .field("undo_recorded", &self.undo_recorded)
            .field("undo", &self.undo.as_ref().map(|u| u.name().to_string()))
            .finish()
    }
}

/// Performs one change and records its inverse
pub struct PerformChangeOperation {
    change: Box<dyn Change>,
    workspace: Arc<dyn Workspace>,
    undo_manager: Option<Arc<UndoManager>>,
    undo_name: Option<String>,
    config: ExecutionConfig,
}

impl PerformChangeOperation {
    /// Operation performing `change` against `workspace`
    pub fn new(change: Box<dyn Change>, workspace: Arc<dyn Workspace>) -> Self {
        Self {
            change,
            workspace,
            undo_manager: None,
            undo_name: None,
            config: ExecutionConfig::default(),
        }
    }

    /// Record the inverse with `undo_manager`
    pub fn with_undo_manager(mut self, undo_manager: Arc<UndoManager>) -> Self {
        self.undo_manager = Some(undo_manager);
        self
    }

    /// Name of the undo entry; defaults to the change name
    pub fn with_undo_name(mut self, name: impl Into<String>) -> Self {
        self.undo_name = Some(name.into());
        self
    }

    /// Execution policy
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate, perform inside one workspace batch, record the inverse.
    ///
    /// A FATAL validity status fails with [`RefactoringError::InvalidChange`]
    /// before anything is touched. When performing fails part way and
    /// `continue_on_error` is set, the inverse of the part that did apply is
    /// recorded and the failure reports `undo_recorded: true`.
    pub fn run(mut self, monitor: &ProgressMonitor) -> Result<ChangeExecution> {
        monitor.check_cancelled()?;
        let name = self.change.name().to_string();
        let undo_name = self.undo_name.clone().unwrap_or_else(|| name.clone());

        let validation_status = if self.config.validate_before_perform {
            let status = self.change.is_valid(monitor)?;
            if status.has_fatal_error() {
                warn!(change = %name, "Change is no longer valid");
                return Err(RefactoringError::InvalidChange(status));
            }
            status
        } else {
            RefactoringStatus::new()
        };

        if let Some(manager) = &self.undo_manager {
            manager.about_to_perform_change(&name);
        }
        let change = &mut self.change;
        let result = self.workspace.batch(|| change.perform(monitor));
        if let Some(manager) = &self.undo_manager {
            manager.change_performed(&name, result.is_ok());
        }

        match result {
            Ok(undo) => {
                info!(change = %name, "Performed change");
                match &self.undo_manager {
                    Some(manager) => {
                        manager.add_undo(undo_name, undo);
                        Ok(ChangeExecution {
                            name,
                            validation_status,
                            undo_recorded: true,
                            undo: None,
                        })
                    }
                    None => Ok(ChangeExecution {
                        name,
                        validation_status,
                        undo_recorded: false,
                        undo: Some(undo),
                    }),
                }
            }
            Err(mut err) => {
                warn!(change = %name, error = %err, "Performing change failed");
                let mut undo_recorded = false;
                if self.config.continue_on_error && !err.is_cancelled() {
                    if let Some(manager) = &self.undo_manager {
                        if let Some(partial) = err.take_partial_undo() {
                            debug!(change = %name, "Recording partial undo");
                            manager.add_undo(undo_name, partial);
                            undo_recorded = true;
                        }
                    }
                }
                Err(RefactoringError::PerformFailed {
                    name,
                    source: err,
                    undo_recorded,
                })
            }
        }
    }
}

impl fmt::Debug for PerformChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformChangeOperation")
            .field("change", &self.change.name())
            .field("undo_name", &self.undo_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Which condition phases [`PerformRefactoringOperation`] runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckConditionsStyle {
    /// Only initial conditions; nothing is created or performed
    Initial,
    /// Only final conditions; initial conditions were checked by the caller
    Final,
    /// Initial then final conditions
    #[default]
    All,
}

/// Result of a [`PerformRefactoringOperation`]
pub struct RefactoringOutcome {
    /// Merged status of the condition phases that ran
    pub status: RefactoringStatus,
    /// Whether the change was created and performed
    pub performed: bool,
    /// Name of the recorded undo entry
    pub undo_name: Option<String>,
    /// The inverse, when no undo manager took it
    pub undo: Option<Box<dyn Change>>,
}

impl fmt::Debug for RefactoringOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefactoringOutcome")
            .field("status", &self.status)
            .field("performed", &self.performed)
            .field("undo_name", &self.undo_name)
            .field("undo", &self.undo.as_ref().map(|u| u.name().to_string()))
            .finish()
    }
}

/// Checks, creates and performs a refactoring
pub struct PerformRefactoringOperation {
    refactoring: ProcessorBasedRefactoring,
    style: CheckConditionsStyle,
    undo_manager: Option<Arc<UndoManager>>,
    config: ExecutionConfig,
}

impl PerformRefactoringOperation {
    /// Operation running all condition phases
    pub fn new(refactoring: ProcessorBasedRefactoring) -> Self {
        Self {
            refactoring,
            style: CheckConditionsStyle::All,
            undo_manager: None,
            config: ExecutionConfig::default(),
        }
    }

    /// Condition phases to run
    pub fn with_style(mut self, style: CheckConditionsStyle) -> Self {
        self.style = style;
        self
    }

    /// Record the inverse with `undo_manager`
    pub fn with_undo_manager(mut self, undo_manager: Arc<UndoManager>) -> Self {
        self.undo_manager = Some(undo_manager);
        self
    }

    /// Execution policy
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// The wrapped refactoring
    pub fn refactoring(&self) -> &ProcessorBasedRefactoring {
        &self.refactoring
    }

    fn stops(&self, status: &RefactoringStatus) -> bool {
        status.has_fatal_error() || status.severity() >= self.config.stop_severity
    }

    /// Run the configured phases; unless the merged status reaches the stop
    /// severity, create the change and perform it.
    pub fn run(mut self, monitor: &ProgressMonitor) -> Result<RefactoringOutcome> {
        let status = match self.style {
            CheckConditionsStyle::Initial => {
                let status = self.refactoring.check_initial_conditions(monitor)?;
                return Ok(RefactoringOutcome {
                    status,
                    performed: false,
                    undo_name: None,
                    undo: None,
                });
            }
            CheckConditionsStyle::Final => self.refactoring.check_final_conditions(monitor)?,
            CheckConditionsStyle::All => self.refactoring.check_all_conditions(monitor)?,
        };

        if self.stops(&status) {
            info!(
                refactoring = %self.refactoring.name(),
                severity = ?status.severity(),
                "Refactoring stopped by condition status"
            );
            return Ok(RefactoringOutcome {
                status,
                performed: false,
                undo_name: None,
                undo: None,
            });
        }

        let change = self.refactoring.create_change(monitor)?;
        let undo_name = self.refactoring.name().to_string();
        let mut operation =
            PerformChangeOperation::new(Box::new(change), self.refactoring.workspace().clone())
                .with_undo_name(undo_name.clone())
                .with_config(self.config.clone());
        if let Some(manager) = self.undo_manager.take() {
            operation = operation.with_undo_manager(manager);
        }
        let execution = operation.run(monitor)?;
        Ok(RefactoringOutcome {
            status,
            performed: true,
            undo_name: execution.undo_recorded.then_some(undo_name),
            undo: execution.undo,
        })
    }
}

impl fmt::Debug for PerformRefactoringOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformRefactoringOperation")
            .field("refactoring", &self.refactoring)
            .field("style", &self.style)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run `operation` on tokio's blocking pool.
///
/// Cancel through a clone of `monitor`.
pub async fn perform_in_background(
    operation: PerformRefactoringOperation,
    monitor: ProgressMonitor,
) -> Result<RefactoringOutcome> {
    tokio::task::spawn_blocking(move || operation.run(&monitor))
        .await
        .map_err(|e| RefactoringError::Other(format!("Background refactoring failed: {}", e)))?
}
