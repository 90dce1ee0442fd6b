//! Changes over workspace resources

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Change;
use crate::element::ElementRef;
use crate::error::{ChangeError, Result};
use crate::monitor::ProgressMonitor;
use crate::status::{RefactoringStatus, Severity, StatusContext};
use crate::workspace::{ResourceStamp, Workspace};

/// Replace a byte range of a text resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Byte range to replace
    pub range: Range<usize>,
    /// Replacement text
    pub replacement: String,
}

impl TextEdit {
    /// Replace `range` with `replacement`
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    /// Insert `text` at `offset`
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset..offset, text)
    }

    /// Delete `range`
    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, "")
    }
}

/// Apply non-overlapping edits to `content`
fn apply_edits(content: &str, edits: &[TextEdit]) -> Result<String> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.range.start, e.range.end));

    let mut result = String::with_capacity(content.len());
    let mut cursor = 0;
    for edit in sorted {
        let Range { start, end } = edit.range;
        if start < cursor {
            return Err(ChangeError::InvalidEdit(format!(
                "edit {}..{} overlaps a previous edit",
                start, end
            )));
        }
        if start > end || end > content.len() {
            return Err(ChangeError::InvalidEdit(format!(
                "edit {}..{} is outside of 0..{}",
                start,
                end,
                content.len()
            )));
        }
        if !content.is_char_boundary(start) || !content.is_char_boundary(end) {
            return Err(ChangeError::InvalidEdit(format!(
                "edit {}..{} splits a character",
                start, end
            )));
        }
        result.push_str(&content[cursor..start]);
        result.push_str(&edit.replacement);
        cursor = end;
    }
    result.push_str(&content[cursor..]);
    Ok(result)
}

fn stale_status(path: &Path, what: &str) -> RefactoringStatus {
    let mut status = RefactoringStatus::new();
    status.add(
        Severity::Fatal,
        format!("'{}' {}", path.display(), what),
        Some(StatusContext::resource(path.display().to_string())),
    );
    status
}

#[derive(Debug, Clone)]
enum TextUpdate {
    Edits(Vec<TextEdit>),
    Content(String),
}

/// Modify the content of an existing text resource.
///
/// The inverse restores the previous content exactly.
#[derive(Debug, Clone)]
pub struct TextFileChange {
    name: String,
    workspace: Arc<dyn Workspace>,
    path: PathBuf,
    update: TextUpdate,
    expected_stamp: Option<ResourceStamp>,
    active: bool,
}

impl TextFileChange {
    /// Change applying `edits` to the resource at `path`
    pub fn new(
        name: impl Into<String>,
        workspace: Arc<dyn Workspace>,
        path: impl Into<PathBuf>,
        edits: Vec<TextEdit>,
    ) -> Self {
        Self {
            name: name.into(),
            workspace,
            path: path.into(),
            update: TextUpdate::Edits(edits),
            expected_stamp: None,
            active: true,
        }
    }

    /// Change replacing the whole content of the resource at `path`
    pub fn with_content(
        name: impl Into<String>,
        workspace: Arc<dyn Workspace>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            workspace,
            path: path.into(),
            update: TextUpdate::Content(content.into()),
            expected_stamp: None,
            active: true,
        }
    }

    /// Add one more edit; a pending whole-content replacement is discarded
    pub fn add_edit(&mut self, edit: TextEdit) {
        match &mut self.update {
            TextUpdate::Edits(edits) => edits.push(edit),
            TextUpdate::Content(_) => {
                self.update = TextUpdate::Edits(vec![edit]);
            }
        }
    }

    /// Resource path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content the resource will have after performing against `current`
    pub fn preview(&self, current: &str) -> Result<String> {
        match &self.update {
            TextUpdate::Edits(edits) => apply_edits(current, edits),
            TextUpdate::Content(content) => Ok(content.clone()),
        }
    }
}

impl Change for TextFileChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn execute(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        if let Some(expected) = self.expected_stamp {
            if self.workspace.stamp(&self.path) != Some(expected) {
                return Err(ChangeError::StaleResource(self.path.display().to_string()));
            }
        }
        let previous = self.workspace.read(&self.path)?;
        let updated = self.preview(&previous)?;
        self.workspace.write(&self.path, &updated)?;

        Ok(Box::new(TextFileChange::with_content(
            self.name.clone(),
            self.workspace.clone(),
            self.path.clone(),
            previous,
        )))
    }

    fn initialize_validation_data(&mut self, _monitor: &ProgressMonitor) {
        self.expected_stamp = self.workspace.stamp(&self.path);
    }

    fn is_valid(&self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        let current = self.workspace.stamp(&self.path);
        if current.is_none() {
            return Ok(stale_status(&self.path, "does not exist"));
        }
        match self.expected_stamp {
            Some(expected) if current != Some(expected) => Ok(stale_status(
                &self.path,
                "has been modified since the refactoring was computed",
            )),
            _ => Ok(RefactoringStatus::new()),
        }
    }

    fn modified_element(&self) -> Option<ElementRef> {
        Some(ElementRef::file(&self.path))
    }

    fn affected_resources(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}

/// Create a new text resource; the inverse deletes it
#[derive(Debug, Clone)]
pub struct CreateFileChange {
    name: String,
    workspace: Arc<dyn Workspace>,
    path: PathBuf,
    content: String,
    active: bool,
}

impl CreateFileChange {
    /// Create `path` with `content`
    pub fn new(
        workspace: Arc<dyn Workspace>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            name: format!("Create '{}'", path.display()),
            workspace,
            path,
            content: content.into(),
            active: true,
        }
    }
}

impl Change for CreateFileChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn execute(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        self.workspace.create(&self.path, &self.content)?;
        Ok(Box::new(DeleteFileChange::new(
            self.workspace.clone(),
            self.path.clone(),
        )))
    }

    fn is_valid(&self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        if self.workspace.exists(&self.path) {
            return Ok(stale_status(&self.path, "already exists"));
        }
        Ok(RefactoringStatus::new())
    }

    fn modified_element(&self) -> Option<ElementRef> {
        Some(ElementRef::file(&self.path))
    }

    fn affected_resources(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}

/// Delete a text resource; the inverse recreates it with its last content
#[derive(Debug, Clone)]
pub struct DeleteFileChange {
    name: String,
    workspace: Arc<dyn Workspace>,
    path: PathBuf,
    active: bool,
}

impl DeleteFileChange {
    /// Delete `path`
    pub fn new(workspace: Arc<dyn Workspace>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("Delete '{}'", path.display()),
            workspace,
            path,
            active: true,
        }
    }
}

impl Change for DeleteFileChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn execute(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        let content = self.workspace.delete(&self.path)?;
        Ok(Box::new(CreateFileChange::new(
            self.workspace.clone(),
            self.path.clone(),
            content,
        )))
    }

    fn is_valid(&self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        if !self.workspace.exists(&self.path) {
            return Ok(stale_status(&self.path, "does not exist"));
        }
        Ok(RefactoringStatus::new())
    }

    fn modified_element(&self) -> Option<ElementRef> {
        Some(ElementRef::file(&self.path))
    }

    fn affected_resources(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}

/// Move or rename a resource; the inverse moves it back
#[derive(Debug, Clone)]
pub struct MoveFileChange {
    name: String,
    workspace: Arc<dyn Workspace>,
    from: PathBuf,
    to: PathBuf,
    active: bool,
}

impl MoveFileChange {
    /// Move `from` to `to`
    pub fn new(
        workspace: Arc<dyn Workspace>,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            name: format!("Move '{}' to '{}'", from.display(), to.display()),
            workspace,
            from,
            to,
            active: true,
        }
    }
}

impl Change for MoveFileChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn execute(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        self.workspace.rename(&self.from, &self.to)?;
        Ok(Box::new(MoveFileChange::new(
            self.workspace.clone(),
            self.to.clone(),
            self.from.clone(),
        )))
    }

    fn is_valid(&self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        if !self.workspace.exists(&self.from) {
            return Ok(stale_status(&self.from, "does not exist"));
        }
        if self.workspace.exists(&self.to) {
            return Ok(stale_status(&self.to, "already exists"));
        }
        Ok(RefactoringStatus::new())
    }

    fn modified_element(&self) -> Option<ElementRef> {
        Some(ElementRef::file(&self.from))
    }

    fn affected_resources(&self) -> Vec<PathBuf> {
        vec![self.from.clone(), self.to.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryWorkspace;

    fn workspace() -> (Arc<MemoryWorkspace>, Arc<dyn Workspace>) {
        let ws = Arc::new(MemoryWorkspace::with_files([
            ("a.rs", "fn foo() { foo(); }"),
            ("b.rs", "use a::foo;"),
        ]));
        let dynamic: Arc<dyn Workspace> = ws.clone();
        (ws, dynamic)
    }

    #[test]
    fn test_text_edits_and_undo() {
        let (ws, dynamic) = workspace();
        let before = ws.snapshot();
        let mut change = TextFileChange::new(
            "Rename foo",
            dynamic,
            "a.rs",
            vec![TextEdit::replace(3..6, "bar"), TextEdit::replace(11..14, "bar")],
        );
        let monitor = ProgressMonitor::new();
        let mut undo = change.perform(&monitor).unwrap();
        assert_eq!(ws.read(Path::new("a.rs")).unwrap(), "fn bar() { bar(); }");

        undo.perform(&monitor).unwrap();
        assert_eq!(ws.snapshot(), before);
    }

    #[test]
    fn test_overlapping_edits_are_rejected() {
        let (ws, dynamic) = workspace();
        let mut change = TextFileChange::new(
            "bad",
            dynamic,
            "a.rs",
            vec![TextEdit::replace(0..5, "x"), TextEdit::replace(3..8, "y")],
        );
        let err = change.perform(&ProgressMonitor::new()).unwrap_err();
        assert!(matches!(err, ChangeError::InvalidEdit(_)));
        assert_eq!(ws.read(Path::new("a.rs")).unwrap(), "fn foo() { foo(); }");
    }

    #[test]
    fn test_stale_resource_is_detected() {
        let (ws, dynamic) = workspace();
        let monitor = ProgressMonitor::new();
        let mut change = TextFileChange::with_content("edit", dynamic, "b.rs", "use a::bar;");
        change.initialize_validation_data(&monitor);
        assert!(change.is_valid(&monitor).unwrap().is_ok());

        ws.write(Path::new("b.rs"), "// edited elsewhere").unwrap();
        assert!(change.is_valid(&monitor).unwrap().has_fatal_error());
        assert!(matches!(
            change.perform(&monitor),
            Err(ChangeError::StaleResource(_))
        ));
    }

    #[test]
    fn test_create_delete_move_round_trips() {
        let (ws, dynamic) = workspace();
        let before = ws.snapshot();
        let monitor = ProgressMonitor::new();

        let mut create = CreateFileChange::new(dynamic.clone(), "c.rs", "mod c;");
        let mut undo_create = create.perform(&monitor).unwrap();
        assert!(ws.exists(Path::new("c.rs")));
        undo_create.perform(&monitor).unwrap();

        let mut delete = DeleteFileChange::new(dynamic.clone(), "b.rs");
        let mut undo_delete = delete.perform(&monitor).unwrap();
        assert!(!ws.exists(Path::new("b.rs")));
        undo_delete.perform(&monitor).unwrap();

        let mut mv = MoveFileChange::new(dynamic, "a.rs", "src/a.rs");
        assert!(mv.is_valid(&monitor).unwrap().is_ok());
        let mut undo_move = mv.perform(&monitor).unwrap();
        assert!(ws.exists(Path::new("src/a.rs")));
        undo_move.perform(&monitor).unwrap();

        assert_eq!(ws.snapshot(), before);
    }

    #[test]
    fn test_inactive_text_change_leaves_content() {
        let (ws, dynamic) = workspace();
        let mut change = TextFileChange::with_content("edit", dynamic, "a.rs", "changed");
        change.set_active(false);
        change.perform(&ProgressMonitor::new()).unwrap();
        assert_eq!(ws.read(Path::new("a.rs")).unwrap(), "fn foo() { foo(); }");
    }

    #[test]
    fn test_multibyte_boundaries() {
        assert!(apply_edits("héllo", &[TextEdit::delete(1..2)]).is_err());
        assert_eq!(apply_edits("héllo", &[TextEdit::delete(1..3)]).unwrap(), "hllo");
        assert_eq!(apply_edits("ab", &[TextEdit::insert(1, "-")]).unwrap(), "a-b");
    }
}
