//! Resource-level consequences of an operation
//!
//! Processors and participants record here what will happen to workspace
//! resources (a type rename implies a file rename, a package move implies a
//! folder move). After final conditions the recorded modifications are
//! validated against the workspace and turned into requests for derived
//! participants.

use refkit_core::{
    ElementRef, ProgressMonitor, RefactoringStatus, Severity, StatusContext, Workspace,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::ConditionChecker;
use crate::arguments::{
    CopyArguments, CreateArguments, DeleteArguments, MoveArguments, RefactoringArguments,
    RenameArguments,
};
use crate::error::Result;
use crate::participant::ParticipantRequest;

/// Resource modifications, in recording order and without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceModifications {
    requests: Vec<ParticipantRequest>,
}

impl ResourceModifications {
    /// No modifications
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `resource` will be created
    pub fn add_create(&mut self, resource: ElementRef) {
        self.record(resource, CreateArguments::new().into());
    }

    /// Record that `resource` will be deleted
    pub fn add_delete(&mut self, resource: ElementRef, arguments: DeleteArguments) {
        self.record(resource, arguments.into());
    }

    /// Record that `resource` will be moved
    pub fn add_move(&mut self, resource: ElementRef, arguments: MoveArguments) {
        self.record(resource, arguments.into());
    }

    /// Record that `resource` will be renamed
    pub fn add_rename(&mut self, resource: ElementRef, arguments: RenameArguments) {
        self.record(resource, arguments.into());
    }

    /// Record that `resource` will be copied
    pub fn add_copy(&mut self, resource: ElementRef, arguments: CopyArguments) {
        self.record(resource, arguments.into());
    }

    fn record(&mut self, resource: ElementRef, arguments: RefactoringArguments) {
        let request = ParticipantRequest::new(resource, arguments);
        if self.requests.contains(&request) {
            return;
        }
        debug!(
            resource = %request.element,
            kind = %request.arguments.kind(),
            "Recorded resource modification"
        );
        self.requests.push(request);
    }

    /// Recorded modifications as participant requests
    pub fn requests(&self) -> &[ParticipantRequest] {
        &self.requests
    }

    /// Number of modifications
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Path a modification creates, if any
fn target_path(source: &Path, arguments: &RefactoringArguments) -> Option<PathBuf> {
    let file_name = source.file_name()?;
    match arguments {
        RefactoringArguments::Create(_) => Some(source.to_path_buf()),
        RefactoringArguments::Rename(args) => Some(source.with_file_name(args.new_name())),
        RefactoringArguments::Move(args) => {
            Some(args.destination().resource_path()?.join(file_name))
        }
        RefactoringArguments::Copy(args) => {
            let folder = args.destination().resource_path()?;
            Some(match args.new_name() {
                Some(name) => folder.join(name),
                None => folder.join(file_name),
            })
        }
        RefactoringArguments::Delete(_) => None,
    }
}

/// Validates recorded [`ResourceModifications`] against the workspace.
///
/// Every source but a created one must exist, and no target may exist yet.
#[derive(Debug)]
pub struct ResourceChangeChecker {
    workspace: Arc<dyn Workspace>,
    modifications: ResourceModifications,
}

impl ResourceChangeChecker {
    /// Checker over `workspace`
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace,
            modifications: ResourceModifications::new(),
        }
    }

    /// Recorded modifications
    pub fn modifications(&self) -> &ResourceModifications {
        &self.modifications
    }

    /// Recorded modifications, for adding to them
    pub fn modifications_mut(&mut self) -> &mut ResourceModifications {
        &mut self.modifications
    }
}

impl ConditionChecker for ResourceChangeChecker {
    fn check(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        for request in self.modifications.requests() {
            monitor.check_cancelled()?;
            let Some(source) = request.element.resource_path() else {
                continue;
            };
            let creates = matches!(request.arguments, RefactoringArguments::Create(_));
            if !creates && !self.workspace.exists(&source) {
                status.add(
                    Severity::Fatal,
                    format!("'{}' does not exist", source.display()),
                    Some(StatusContext::resource(source.to_string_lossy())),
                );
                continue;
            }
            if let Some(target) = target_path(&source, &request.arguments) {
                if (creates || target != source) && self.workspace.exists(&target) {
                    status.add(
                        Severity::Fatal,
                        format!("'{}' already exists", target.display()),
                        Some(StatusContext::resource(target.to_string_lossy())),
                    );
                }
            }
        }
        Ok(status)
    }
}
