//! Arguments handed from a processor to its participants
//!
//! Each value describes one class of mutation for one element. They are
//! immutable once built and carry no behavior.

use refkit_core::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of mutation a participant reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    /// Element is renamed
    Rename,
    /// Element is moved
    Move,
    /// Element is deleted
    Delete,
    /// Element is created
    Create,
    /// Element is copied
    Copy,
}

impl ParticipantKind {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Rename => "rename",
            ParticipantKind::Move => "move",
            ParticipantKind::Delete => "delete",
            ParticipantKind::Create => "create",
            ParticipantKind::Copy => "copy",
        }
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameArguments {
    new_name: String,
    update_references: bool,
}

impl RenameArguments {
    /// Rename to `new_name`
    pub fn new(new_name: impl Into<String>, update_references: bool) -> Self {
        Self {
            new_name: new_name.into(),
            update_references,
        }
    }

    /// The new name
    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    /// Whether references to the element are updated as well
    pub fn update_references(&self) -> bool {
        self.update_references
    }
}

/// Arguments of a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveArguments {
    destination: ElementRef,
    update_references: bool,
}

impl MoveArguments {
    /// Move into `destination`
    pub fn new(destination: ElementRef, update_references: bool) -> Self {
        Self {
            destination,
            update_references,
        }
    }

    /// Target container
    pub fn destination(&self) -> &ElementRef {
        &self.destination
    }

    /// Whether references to the element are updated as well
    pub fn update_references(&self) -> bool {
        self.update_references
    }
}

/// Arguments of a delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteArguments {
    delete_contents: bool,
}

impl DeleteArguments {
    /// Delete the element, optionally including the contents of a container
    pub fn new(delete_contents: bool) -> Self {
        Self { delete_contents }
    }

    /// Whether contents are deleted along with a container
    pub fn delete_contents(&self) -> bool {
        self.delete_contents
    }
}

/// Arguments of a create
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateArguments {}

impl CreateArguments {
    /// Create arguments
    pub fn new() -> Self {
        Self {}
    }
}

/// Arguments of a copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyArguments {
    destination: ElementRef,
    new_name: Option<String>,
}

impl CopyArguments {
    /// Copy into `destination`, keeping the name
    pub fn new(destination: ElementRef) -> Self {
        Self {
            destination,
            new_name: None,
        }
    }

    /// Copy into `destination` under a different name
    pub fn renamed(destination: ElementRef, new_name: impl Into<String>) -> Self {
        Self {
            destination,
            new_name: Some(new_name.into()),
        }
    }

    /// Target container
    pub fn destination(&self) -> &ElementRef {
        &self.destination
    }

    /// Name of the copy, if it differs from the source
    pub fn new_name(&self) -> Option<&str> {
        self.new_name.as_deref()
    }
}

/// Arguments of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RefactoringArguments {
    /// Rename arguments
    Rename(RenameArguments),
    /// Move arguments
    Move(MoveArguments),
    /// Delete arguments
    Delete(DeleteArguments),
    /// Create arguments
    Create(CreateArguments),
    /// Copy arguments
    Copy(CopyArguments),
}

impl RefactoringArguments {
    /// The class of mutation these arguments describe
    pub fn kind(&self) -> ParticipantKind {
        match self {
            RefactoringArguments::Rename(_) => ParticipantKind::Rename,
            RefactoringArguments::Move(_) => ParticipantKind::Move,
            RefactoringArguments::Delete(_) => ParticipantKind::Delete,
            RefactoringArguments::Create(_) => ParticipantKind::Create,
            RefactoringArguments::Copy(_) => ParticipantKind::Copy,
        }
    }

    /// Rename arguments, if these describe a rename
    pub fn as_rename(&self) -> Option<&RenameArguments> {
        match self {
            RefactoringArguments::Rename(args) => Some(args),
            _ => None,
        }
    }

    /// Move arguments, if these describe a move
    pub fn as_move(&self) -> Option<&MoveArguments> {
        match self {
            RefactoringArguments::Move(args) => Some(args),
            _ => None,
        }
    }

    /// Delete arguments, if these describe a delete
    pub fn as_delete(&self) -> Option<&DeleteArguments> {
        match self {
            RefactoringArguments::Delete(args) => Some(args),
            _ => None,
        }
    }

    /// Copy arguments, if these describe a copy
    pub fn as_copy(&self) -> Option<&CopyArguments> {
        match self {
            RefactoringArguments::Copy(args) => Some(args),
            _ => None,
        }
    }
}

impl From<RenameArguments> for RefactoringArguments {
    fn from(args: RenameArguments) -> Self {
        Self::Rename(args)
    }
}

impl From<MoveArguments> for RefactoringArguments {
    fn from(args: MoveArguments) -> Self {
        Self::Move(args)
    }
}

impl From<DeleteArguments> for RefactoringArguments {
    fn from(args: DeleteArguments) -> Self {
        Self::Delete(args)
    }
}

impl From<CreateArguments> for RefactoringArguments {
    fn from(args: CreateArguments) -> Self {
        Self::Create(args)
    }
}

impl From<CopyArguments> for RefactoringArguments {
    fn from(args: CopyArguments) -> Self {
        Self::Copy(args)
    }
}

impl fmt::Display for RefactoringArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefactoringArguments::Rename(args) => write!(
                f,
                "rename to '{}' (update references: {})",
                args.new_name, args.update_references
            ),
            RefactoringArguments::Move(args) => write!(
                f,
                "move to {} (update references: {})",
                args.destination, args.update_references
            ),
            RefactoringArguments::Delete(args) => {
                write!(f, "delete (contents: {})", args.delete_contents)
            }
            RefactoringArguments::Create(_) => f.write_str("create"),
            RefactoringArguments::Copy(args) => match &args.new_name {
                Some(name) => write!(f, "copy to {} as '{}'", args.destination, name),
                None => write!(f, "copy to {}", args.destination),
            },
        }
    }
}
