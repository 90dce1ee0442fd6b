//! File-system backed workspace

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{ModelChangeEvent, ModelChangeKind, ModelChangeNotifier, ResourceStamp, Workspace};
use crate::error::{ChangeError, Result};

/// Workspace rooted at a directory on disk.
///
/// Paths are resolved relative to the root. Stamps are derived from a SHA-256
/// digest of the content, so edits made by other processes are detected even
/// when they preserve the modification time.
#[derive(Debug)]
pub struct FsWorkspace {
    root: PathBuf,
    notifier: ModelChangeNotifier,
}

impl FsWorkspace {
    /// Create a workspace rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            notifier: ModelChangeNotifier::new(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(full: &Path) -> Result<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Workspace for FsWorkspace {
    fn read(&self, path: &Path) -> Result<String> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(ChangeError::not_found(path.display().to_string()));
        }
        Ok(fs::read_to_string(full)?)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(ChangeError::not_found(path.display().to_string()));
        }
        fs::write(&full, content)?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote resource");
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Modified));
        Ok(())
    }

    fn create(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);
        if full.exists() {
            return Err(ChangeError::exists(path.display().to_string()));
        }
        Self::ensure_parent(&full)?;
        fs::write(&full, content)?;
        debug!(path = %path.display(), "Created resource");
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Created));
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<String> {
        let content = self.read(path)?;
        fs::remove_file(self.resolve(path))?;
        debug!(path = %path.display(), "Deleted resource");
        self.notifier
            .notify(ModelChangeEvent::new(path, ModelChangeKind::Deleted));
        Ok(content)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.resolve(from);
        let target = self.resolve(to);
        if !source.is_file() {
            return Err(ChangeError::not_found(from.display().to_string()));
        }
        if target.exists() {
            return Err(ChangeError::exists(to.display().to_string()));
        }
        Self::ensure_parent(&target)?;
        fs::rename(&source, &target)?;
        debug!(from = %from.display(), to = %to.display(), "Moved resource");
        self.notifier.notify(ModelChangeEvent::new(
            from,
            ModelChangeKind::Moved {
                to: to.to_path_buf(),
            },
        ));
        Ok(())
    }

    fn stamp(&self, path: &Path) -> Option<ResourceStamp> {
        let bytes = fs::read(self.resolve(path)).ok()?;
        let digest = Sha256::digest(&bytes);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Some(ResourceStamp(u64::from_be_bytes(prefix)))
    }

    fn list(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();
        paths.sort();
        paths
    }

    fn notifier(&self) -> &ModelChangeNotifier {
        &self.notifier
    }
}
