//! End-to-End Tests: Refactoring Workflows
//!
//! Runs complete refactorings (processor, participants, condition checks,
//! change creation, performing) against in-memory and on-disk workspaces and
//! drives the resulting undo history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use refkit_core::{
    Change, CompositeChange, ElementRef, FsWorkspace, MemoryWorkspace, ProgressMonitor,
    RefactoringStatus, Severity, TextEdit, TextFileChange, Workspace,
};
use refkit_refactoring::{
    perform_in_background, CheckConditionsContext, ExecutionConfig, Expression,
    ParticipantDescriptor, ParticipantKind, ParticipantRegistry, ParticipantRequest,
    PerformChangeOperation, PerformRefactoringOperation, ProcessorBasedRefactoring,
    ProcessorInfo, RefactoringArguments, RefactoringError, RefactoringParticipant,
    RefactoringProcessor, RenameArguments, Result, ValidateEditChecker,
};
use refkit_undo_redo::UndoManager;
use tempfile::TempDir;

const SYMBOL_KIND: &str = "code.symbol";

/// Renames a symbol in every listed file
struct RenameSymbolProcessor {
    symbol: ElementRef,
    new_name: String,
    files: Vec<PathBuf>,
    workspace: Arc<dyn Workspace>,
    name: String,
}

impl RenameSymbolProcessor {
    fn new(old: &str, new_name: &str, files: &[&str], workspace: Arc<dyn Workspace>) -> Self {
        Self {
            symbol: ElementRef::new(SYMBOL_KIND, old),
            new_name: new_name.to_string(),
            files: files.iter().map(PathBuf::from).collect(),
            workspace,
            name: format!("Rename '{}'", old),
        }
    }

    fn old_name(&self) -> &str {
        &self.symbol.handle
    }
}

impl RefactoringProcessor for RenameSymbolProcessor {
    fn identifier(&self) -> &str {
        "demo.rename.symbol"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self) -> Vec<ElementRef> {
        vec![self.symbol.clone()]
    }

    fn is_applicable(&self) -> Result<bool> {
        Ok(!self.files.is_empty())
    }

    fn check_initial_conditions(&mut self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        if self.new_name == self.old_name() {
            return Ok(RefactoringStatus::create_fatal_error(
                "The new name equals the old name",
            ));
        }
        Ok(RefactoringStatus::new())
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        for file in &self.files {
            if self.workspace.read(file)?.contains(&self.new_name) {
                status.add_warning(format!(
                    "'{}' is already used in '{}'",
                    self.new_name,
                    file.display()
                ));
            }
        }
        if let Some(checker) = context.get_mut::<ValidateEditChecker>() {
            checker.add_files(self.files.iter().cloned());
        }
        Ok(status)
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        let mut change = CompositeChange::new("Update occurrences");
        for file in &self.files {
            let content = self.workspace.read(file)?;
            let edits: Vec<TextEdit> = content
                .match_indices(self.old_name())
                .map(|(offset, found)| TextEdit::replace(offset..offset + found.len(), &self.new_name))
                .collect();
            if edits.is_empty() {
                continue;
            }
            change.add(Box::new(TextFileChange::new(
                format!("Rename in '{}'", file.display()),
                self.workspace.clone(),
                file,
                edits,
            )));
        }
        Ok(Box::new(change))
    }

    fn participant_requests(&self) -> Vec<ParticipantRequest> {
        vec![ParticipantRequest::new(
            self.symbol.clone(),
            RenameArguments::new(self.new_name.clone(), true),
        )]
    }
}

/// Appends a line to the changelog
struct ChangelogParticipant {
    workspace: Arc<dyn Workspace>,
    entry: String,
}

impl RefactoringParticipant for ChangelogParticipant {
    fn name(&self) -> &str {
        "changelog"
    }

    fn initialize(
        &mut self,
        _processor: &ProcessorInfo,
        element: &ElementRef,
        arguments: &RefactoringArguments,
    ) -> Result<bool> {
        let Some(rename) = arguments.as_rename() else {
            return Ok(false);
        };
        self.entry = format!("- renamed {} to {}\n", element.handle, rename.new_name());
        Ok(self.workspace.exists(Path::new("CHANGELOG.md")))
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        if let Some(checker) = context.get_mut::<ValidateEditChecker>() {
            checker.add_file("CHANGELOG.md");
        }
        Ok(RefactoringStatus::new())
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>> {
        let path = Path::new("CHANGELOG.md");
        let end = self.workspace.read(path)?.len();
        Ok(Some(Box::new(TextFileChange::new(
            "Update changelog",
            self.workspace.clone(),
            path,
            vec![TextEdit::insert(end, self.entry.clone())],
        ))))
    }
}

/// Reports a fixed final status and changes nothing
struct LintParticipant {
    severity: Severity,
}

impl RefactoringParticipant for LintParticipant {
    fn name(&self) -> &str {
        "lint"
    }

    fn initialize(
        &mut self,
        _processor: &ProcessorInfo,
        _element: &ElementRef,
        _arguments: &RefactoringArguments,
    ) -> Result<bool> {
        Ok(true)
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        _context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        Ok(RefactoringStatus::create(
            self.severity,
            "public API name changes break downstream crates",
        ))
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>> {
        Ok(None)
    }
}

fn registry(workspace: &Arc<dyn Workspace>, lint: Option<Severity>) -> Arc<ParticipantRegistry> {
    let registry = ParticipantRegistry::new();
    let changelog_workspace = workspace.clone();
    registry.register(
        ParticipantDescriptor::new("demo.changelog", "Changelog", ParticipantKind::Rename, move || {
            Ok(Box::new(ChangelogParticipant {
                workspace: changelog_workspace.clone(),
                entry: String::new(),
            }) as Box<dyn RefactoringParticipant>)
        })
        .with_enablement(Expression::instance_of(SYMBOL_KIND)),
    );
    if let Some(severity) = lint {
        registry.register(ParticipantDescriptor::new(
            "demo.lint",
            "Lint",
            ParticipantKind::Rename,
            move || Ok(Box::new(LintParticipant { severity }) as Box<dyn RefactoringParticipant>),
        ));
    }
    Arc::new(registry)
}

fn memory_workspace() -> (Arc<MemoryWorkspace>, Arc<dyn Workspace>) {
    let memory = Arc::new(MemoryWorkspace::with_files([
        ("src/lib.rs", "pub fn greet() {}\n"),
        ("src/main.rs", "fn main() { greet(); greet(); }\n"),
        ("CHANGELOG.md", "# Changes\n"),
    ]));
    let workspace: Arc<dyn Workspace> = memory.clone();
    (memory, workspace)
}

fn rename(
    old: &str,
    new_name: &str,
    workspace: &Arc<dyn Workspace>,
    registry: Arc<ParticipantRegistry>,
) -> ProcessorBasedRefactoring {
    let processor =
        RenameSymbolProcessor::new(old, new_name, &["src/lib.rs", "src/main.rs"], workspace.clone());
    ProcessorBasedRefactoring::new(Box::new(processor), registry, workspace.clone())
}

fn read(workspace: &Arc<dyn Workspace>, path: &str) -> String {
    workspace.read(Path::new(path)).unwrap()
}

#[test]
fn test_rename_updates_every_file_and_undoes_atomically() {
    let (memory, workspace) = memory_workspace();
    let before = memory.snapshot();
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let monitor = ProgressMonitor::new();

    let outcome = PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, None),
    ))
    .with_undo_manager(manager.clone())
    .run(&monitor)
    .unwrap();

    assert!(outcome.performed);
    assert!(outcome.status.is_ok());
    assert_eq!(read(&workspace, "src/lib.rs"), "pub fn welcome() {}\n");
    assert_eq!(
        read(&workspace, "src/main.rs"),
        "fn main() { welcome(); welcome(); }\n"
    );
    assert_eq!(
        read(&workspace, "CHANGELOG.md"),
        "# Changes\n- renamed greet to welcome\n"
    );
    let after = memory.snapshot();

    assert_eq!(manager.peek_undo_name().as_deref(), Some("Rename 'greet'"));
    manager.perform_undo(&monitor).unwrap();
    assert_eq!(memory.snapshot(), before);

    manager.perform_redo(&monitor).unwrap();
    assert_eq!(memory.snapshot(), after);
}

#[test]
fn test_error_from_one_participant_blocks_the_whole_operation() {
    let (memory, workspace) = memory_workspace();
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let monitor = ProgressMonitor::new();

    // An earlier operation leaves one undo entry behind
    PerformRefactoringOperation::new(rename(
        "greet",
        "hello",
        &workspace,
        registry(&workspace, None),
    ))
    .with_undo_manager(manager.clone())
    .run(&monitor)
    .unwrap();
    let before = memory.snapshot();
    let history: Vec<String> = manager.undo_history().into_iter().map(|e| e.name).collect();

    let outcome = PerformRefactoringOperation::new(rename(
        "hello",
        "welcome",
        &workspace,
        registry(&workspace, Some(Severity::Error)),
    ))
    .with_undo_manager(manager.clone())
    .run(&monitor)
    .unwrap();

    assert!(!outcome.performed);
    assert_eq!(outcome.status.severity(), Severity::Error);
    assert_eq!(
        outcome.status.messages(Severity::Error),
        vec!["public API name changes break downstream crates"]
    );
    assert_eq!(memory.snapshot(), before);
    let unchanged: Vec<String> = manager.undo_history().into_iter().map(|e| e.name).collect();
    assert_eq!(unchanged, history);
}

#[test]
fn test_warnings_do_not_block() {
    let (_, workspace) = memory_workspace();
    let outcome = PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, Some(Severity::Warning)),
    ))
    .run(&ProgressMonitor::new())
    .unwrap();

    assert!(outcome.performed);
    assert_eq!(outcome.status.severity(), Severity::Warning);
    assert!(outcome.undo.is_some());
}

#[test]
fn test_same_name_is_rejected_up_front() {
    let (memory, workspace) = memory_workspace();
    let before = memory.snapshot();
    let mut refactoring = rename("greet", "greet", &workspace, registry(&workspace, None));

    let status = refactoring
        .check_all_conditions(&ProgressMonitor::new())
        .unwrap();
    assert!(status.has_fatal_error());
    assert!(refactoring.participant_names().is_empty());
    assert_eq!(memory.snapshot(), before);
}

#[test]
fn test_external_edit_flushes_history() {
    let (_, workspace) = memory_workspace();
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let monitor = ProgressMonitor::new();

    PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, None),
    ))
    .with_undo_manager(manager.clone())
    .run(&monitor)
    .unwrap();
    assert!(manager.anything_to_undo());

    workspace
        .write(Path::new("src/lib.rs"), "pub fn edited_by_hand() {}\n")
        .unwrap();
    assert!(!manager.anything_to_undo());
    assert!(!manager.anything_to_redo());
}

#[test]
fn test_partial_failure_records_partial_undo() {
    let (memory, workspace) = memory_workspace();
    let before = memory.snapshot();
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let monitor = ProgressMonitor::new();

    let mut change = CompositeChange::new("Rewrite sources");
    change.add(Box::new(TextFileChange::with_content(
        "Rewrite lib",
        workspace.clone(),
        "src/lib.rs",
        "pub fn rewritten() {}\n",
    )));
    change.add(Box::new(TextFileChange::with_content(
        "Rewrite missing",
        workspace.clone(),
        "src/missing.rs",
        "",
    )));
    let config = ExecutionConfig {
        continue_on_error: true,
        validate_before_perform: false,
        ..ExecutionConfig::default()
    };

    let err = PerformChangeOperation::new(Box::new(change), workspace.clone())
        .with_undo_manager(manager.clone())
        .with_config(config)
        .run(&monitor)
        .unwrap_err();
    assert!(matches!(
        err,
        RefactoringError::PerformFailed {
            undo_recorded: true,
            ..
        }
    ));
    assert_eq!(read(&workspace, "src/lib.rs"), "pub fn rewritten() {}\n");

    manager.perform_undo(&monitor).unwrap();
    assert_eq!(memory.snapshot(), before);
}

#[test]
fn test_validation_rejects_missing_resource() {
    let (memory, workspace) = memory_workspace();
    let before = memory.snapshot();
    let change = TextFileChange::with_content("Rewrite missing", workspace.clone(), "src/missing.rs", "");

    let err = PerformChangeOperation::new(Box::new(change), workspace.clone())
        .run(&ProgressMonitor::new())
        .unwrap_err();
    assert!(matches!(err, RefactoringError::InvalidChange(_)));
    assert_eq!(memory.snapshot(), before);
}

#[test]
fn test_rename_on_disk() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("src"))?;
    std::fs::write(dir.path().join("src/lib.rs"), "pub fn greet() {}\n")?;
    std::fs::write(dir.path().join("src/main.rs"), "fn main() { greet(); }\n")?;
    std::fs::write(dir.path().join("CHANGELOG.md"), "# Changes\n")?;
    let workspace: Arc<dyn Workspace> = Arc::new(FsWorkspace::new(dir.path()));
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let monitor = ProgressMonitor::new();

    PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, None),
    ))
    .with_undo_manager(manager.clone())
    .run(&monitor)?;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/main.rs"))?,
        "fn main() { welcome(); }\n"
    );

    manager.perform_undo(&monitor)?;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/main.rs"))?,
        "fn main() { greet(); }\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("CHANGELOG.md"))?,
        "# Changes\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_perform_in_background() {
    let (_, workspace) = memory_workspace();
    let manager = Arc::new(UndoManager::new(workspace.clone()));
    let operation = PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, None),
    ))
    .with_undo_manager(manager.clone());

    let outcome = perform_in_background(operation, ProgressMonitor::new())
        .await
        .unwrap();
    assert!(outcome.performed);
    assert_eq!(outcome.undo_name.as_deref(), Some("Rename 'greet'"));
    assert_eq!(manager.undo_count(), 1);
    assert_eq!(read(&workspace, "src/lib.rs"), "pub fn welcome() {}\n");
}

#[tokio::test]
async fn test_cancelled_background_operation_changes_nothing() {
    let (memory, workspace) = memory_workspace();
    let before = memory.snapshot();
    let monitor = ProgressMonitor::new();
    monitor.cancel();

    let operation = PerformRefactoringOperation::new(rename(
        "greet",
        "welcome",
        &workspace,
        registry(&workspace, None),
    ));
    let err = perform_in_background(operation, monitor).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(memory.snapshot(), before);
}
