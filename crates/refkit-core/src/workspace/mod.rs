//! The mutable resource set refactorings operate on
//!
//! Changes never touch the file system directly; they go through a
//! [`Workspace`], which publishes a [`ModelChangeEvent`] for every mutation.

pub mod events;
pub mod fs;
pub mod memory;

pub use events::{
    BatchGuard, ListenerId, ModelChangeEvent, ModelChangeKind, ModelChangeListener,
    ModelChangeNotifier,
};
pub use fs::FsWorkspace;
pub use memory::MemoryWorkspace;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Opaque modification stamp of a resource.
///
/// Two reads returning the same stamp observed the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceStamp(pub u64);

/// A set of text resources addressed by relative path
pub trait Workspace: Send + Sync + fmt::Debug {
    /// Read the content of a resource
    fn read(&self, path: &Path) -> Result<String>;

    /// Whether a resource exists
    fn exists(&self, path: &Path) -> bool;

    /// Replace the content of an existing resource
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Create a resource that does not exist yet
    fn create(&self, path: &Path, content: &str) -> Result<()>;

    /// Delete a resource, returning its last content
    fn delete(&self, path: &Path) -> Result<String>;

    /// Move a resource to a path that does not exist yet
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Current modification stamp, `None` when the resource does not exist
    fn stamp(&self, path: &Path) -> Option<ResourceStamp>;

    /// All resource paths, sorted
    fn list(&self) -> Vec<PathBuf>;

    /// Bus receiving an event for every mutation of this workspace
    fn notifier(&self) -> &ModelChangeNotifier;
}

impl<'a> dyn Workspace + 'a {
    /// Run `f` as one workspace-level batch: the events it causes are
    /// delivered together once `f` returns.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.notifier().batch();
        f()
    }
}
