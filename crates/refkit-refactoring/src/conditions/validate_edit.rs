//! Detects concurrent edits of resources an operation is going to modify

use refkit_core::{
    ProgressMonitor, RefactoringStatus, ResourceStamp, Severity, StatusContext, Workspace,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::ConditionChecker;
use crate::error::Result;

/// Records the stamp of every resource participants intend to modify and
/// raises FATAL when one of them changed before the change is created.
#[derive(Debug)]
pub struct ValidateEditChecker {
    workspace: Arc<dyn Workspace>,
    stamps: BTreeMap<PathBuf, Option<ResourceStamp>>,
}

impl ValidateEditChecker {
    /// Checker over `workspace`
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace,
            stamps: BTreeMap::new(),
        }
    }

    /// Register a resource; the first registration's stamp is kept
    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.stamps.contains_key(&path) {
            return;
        }
        let stamp = self.workspace.stamp(&path);
        debug!(path = %path.display(), "Registered resource for edit validation");
        self.stamps.insert(path, stamp);
    }

    /// Register several resources
    pub fn add_files<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.add_file(path);
        }
    }

    /// Registered resources, sorted
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.stamps.keys().map(PathBuf::as_path)
    }
}

impl ConditionChecker for ValidateEditChecker {
    fn check(&mut self, monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        for (path, recorded) in &self.stamps {
            monitor.check_cancelled()?;
            let current = self.workspace.stamp(path);
            if current == *recorded {
                continue;
            }
            let message = match (recorded, current) {
                (Some(_), None) => format!("'{}' was deleted in the meantime", path.display()),
                (None, Some(_)) => format!("'{}' was created in the meantime", path.display()),
                _ => format!("'{}' was modified in the meantime", path.display()),
            };
            status.add(
                Severity::Fatal,
                message,
                Some(StatusContext::resource(path.to_string_lossy())),
            );
        }
        Ok(status)
    }
}
