//! Stable references to the elements a refactoring operates on

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind used for file resources
pub const FILE_KIND: &str = "resource.file";
/// Kind used for folder resources
pub const FOLDER_KIND: &str = "resource.folder";
/// Type name every element is an instance of
pub const ELEMENT_TYPE: &str = "element";

/// Identity of a program element or workspace resource.
///
/// Kinds are dotted paths (`resource.file`, `code.type.class`); an element is
/// an instance of every dotted prefix of its kind and of [`ELEMENT_TYPE`].
/// Equality is structural, so references can be used as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRef {
    /// Dotted kind of the element
    pub kind: String,
    /// Stable handle, unique per kind
    pub handle: String,
    /// Project the element belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl ElementRef {
    /// Create a reference without project
    pub fn new(kind: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            handle: handle.into(),
            project: None,
        }
    }

    /// Reference to a file resource
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(FILE_KIND, path.as_ref().to_string_lossy())
    }

    /// Reference to a folder resource
    pub fn folder(path: impl AsRef<Path>) -> Self {
        Self::new(FOLDER_KIND, path.as_ref().to_string_lossy())
    }

    /// Set the owning project
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Whether this element is an instance of `type_name`
    pub fn is_kind_of(&self, type_name: &str) -> bool {
        if type_name == ELEMENT_TYPE || self.kind == type_name {
            return true;
        }
        self.kind
            .strip_prefix(type_name)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Whether this element is a workspace resource
    pub fn is_resource(&self) -> bool {
        self.is_kind_of("resource")
    }

    /// Path of a resource element
    pub fn resource_path(&self) -> Option<PathBuf> {
        self.is_resource().then(|| PathBuf::from(&self.handle))
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.handle)
    }
}
