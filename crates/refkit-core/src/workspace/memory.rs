//! In-memory workspace

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ModelChangeEvent, ModelChangeKind, ModelChangeNotifier, ResourceStamp, Workspace};
use crate::error::{ChangeError, Result};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    stamp: u64,
}

/// Workspace keeping all resources in memory.
///
/// Stamps come from a workspace-wide counter, so every write yields a new stamp.
#[derive(Default)]
pub struct MemoryWorkspace {
    files: RwLock<BTreeMap<PathBuf, MemoryFile>>,
    counter: AtomicU64,
    notifier: ModelChangeNotifier,
}

impl MemoryWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workspace holding the given files; no events are published
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<PathBuf>,
        C: Into<String>,
    {
        let workspace = Self::new();
        {
            let mut map = workspace.files.write();
            for (path, content) in files {
                let stamp = workspace.next_stamp();
                map.insert(
                    path.into(),
                    MemoryFile {
                        content: content.into(),
                        stamp,
                    },
                );
            }
        }
        workspace
    }

    /// Path to content map of the current state
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.files
            .read()
            .iter()
            .map(|(path, file)| (path.clone(), file.content.clone()))
            .collect()
    }

    fn next_stamp(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn display(path: &Path) -> String {
        path.display().to_string()
    }
}

impl Workspace for MemoryWorkspace {
    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .get(path)
            .map(|file| file.content.clone())
            .ok_or_else(|| ChangeError::not_found(Self::display(path)))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        {
            let mut files = self.files.write();
            let stamp = self.next_stamp();
            let file = files
                .get_mut(path)
                .ok_or_else(|| ChangeError::not_found(Self::display(path)))?;
            file.content = content.to_string();
            file.stamp = stamp;
        }
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Modified));
        Ok(())
    }

    fn create(&self, path: &Path, content: &str) -> Result<()> {
        {
            let mut files = self.files.write();
            if files.contains_key(path) {
                return Err(ChangeError::exists(Self::display(path)));
            }
            let stamp = self.next_stamp();
            files.insert(
                path.to_path_buf(),
                MemoryFile {
                    content: content.to_string(),
                    stamp,
                },
            );
        }
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Created));
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<String> {
        let removed = self
            .files
            .write()
            .remove(path)
            .ok_or_else(|| ChangeError::not_found(Self::display(path)))?;
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Deleted));
        Ok(removed.content)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        {
            let mut files = self.files.write();
            if files.contains_key(to) {
                return Err(ChangeError::exists(Self::display(to)));
            }
            let mut file = files
                .remove(from)
                .ok_or_else(|| ChangeError::not_found(Self::display(from)))?;
            file.stamp = self.next_stamp();
            files.insert(to.to_path_buf(), file);
        }
        self.notifier.notify(ModelChangeEvent::new(
            from,
            ModelChangeKind::Moved {
                to: to.to_path_buf(),
            },
        ));
        Ok(())
    }

    fn stamp(&self, path: &Path) -> Option<ResourceStamp> {
        self.files
            .read()
            .get(path)
            .map(|file| ResourceStamp(file.stamp))
    }

    fn list(&self) -> Vec<PathBuf> {
        self.files.read().keys().cloned().collect()
    }

    fn notifier(&self) -> &ModelChangeNotifier {
        &self.notifier
    }
}

impl fmt::Debug for MemoryWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWorkspace")
            .field("files", &self.files.read().len())
            .finish()
    }
}
