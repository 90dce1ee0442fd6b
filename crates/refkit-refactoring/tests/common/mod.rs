//! Shared fixtures for the refactoring pipeline tests
//!
//! A small "rename type" operation over an in-memory workspace: the processor
//! moves the type into a file named after it, element participants update other
//! files, and a derived participant follows the file rename.

#![allow(dead_code)]

use parking_lot::Mutex;
use refkit_core::{
    Change, CompositeChange, CreateFileChange, DeleteFileChange, ElementRef, MemoryWorkspace,
    ProgressMonitor, RefactoringStatus, Severity, TextFileChange, Workspace,
};
use refkit_refactoring::{
    CheckConditionsContext, Expression, IterateOperator, ParticipantDescriptor, ParticipantKind,
    ParticipantRequest, ProcessorDescriptor, ProcessorInfo, RefactoringArguments,
    RefactoringError, RefactoringParticipant, RefactoringProcessor, RenameArguments,
    ResourceChangeChecker, Result, SharableParticipant, ValidateEditChecker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const RENAME_TYPE: &str = "test.rename.type";
pub const TYPE_KIND: &str = "code.type";

/// Ordered record of the calls fixtures receive
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().clone()
}

pub fn workspace() -> (Arc<MemoryWorkspace>, Arc<dyn Workspace>) {
    let ws = Arc::new(MemoryWorkspace::with_files([
        ("src/user.rs", "pub struct User;\n\nimpl User {}\n"),
        ("src/main.rs", "mod user;\n\nuse user::User;\n"),
        ("docs/guide.md", "Create a User first.\n"),
    ]));
    let dynamic: Arc<dyn Workspace> = ws.clone();
    (ws, dynamic)
}

pub fn type_element(name: &str) -> ElementRef {
    ElementRef::new(TYPE_KIND, format!("src/{}.rs::{}", name.to_lowercase(), name))
}

fn type_name(element: &ElementRef) -> &str {
    element.handle.rsplit("::").next().unwrap_or(&element.handle)
}

/// Renames a type, its file and every occurrence in that file
pub struct RenameTypeProcessor {
    pub element: ElementRef,
    pub new_name: String,
    pub workspace: Arc<dyn Workspace>,
    pub log: CallLog,
    pub initial_status: RefactoringStatus,
    pub rename_file: bool,
    name: String,
}

impl RenameTypeProcessor {
    pub fn new(
        element: ElementRef,
        new_name: &str,
        workspace: Arc<dyn Workspace>,
        log: CallLog,
    ) -> Self {
        let name = format!("Rename type '{}'", type_name(&element));
        Self {
            element,
            new_name: new_name.to_string(),
            workspace,
            log,
            initial_status: RefactoringStatus::new(),
            rename_file: true,
            name,
        }
    }

    fn file(&self) -> PathBuf {
        let path = self.element.handle.split("::").next().unwrap_or_default();
        PathBuf::from(path)
    }

    fn new_file(&self) -> PathBuf {
        self.file()
            .with_file_name(format!("{}.rs", self.new_name.to_lowercase()))
    }
}

impl RefactoringProcessor for RenameTypeProcessor {
    fn identifier(&self) -> &str {
        RENAME_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self) -> Vec<ElementRef> {
        vec![self.element.clone()]
    }

    fn is_applicable(&self) -> Result<bool> {
        Ok(self.workspace.exists(&self.file()))
    }

    fn check_initial_conditions(&mut self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        self.log.lock().push("processor:initial".to_string());
        if self.new_name.is_empty() {
            return Ok(RefactoringStatus::create_fatal_error("The new name is empty"));
        }
        Ok(self.initial_status.clone())
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        self.log.lock().push("processor:final".to_string());
        let file = self.file();
        if let Some(checker) = context.get_mut::<ValidateEditChecker>() {
            checker.add_file(&file);
        }
        if self.rename_file {
            let new_file_name = format!("{}.rs", self.new_name.to_lowercase());
            context
                .get_or_insert_with(|| ResourceChangeChecker::new(self.workspace.clone()))?
                .modifications_mut()
                .add_rename(ElementRef::file(&file), RenameArguments::new(new_file_name, true));
        }
        Ok(RefactoringStatus::new())
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Box<dyn Change>> {
        self.log.lock().push("processor:create".to_string());
        let file = self.file();
        let content = self.workspace.read(&file)?;
        let renamed = content.replace(type_name(&self.element), &self.new_name);
        if !self.rename_file {
            return Ok(Box::new(TextFileChange::with_content(
                format!("Update '{}'", file.display()),
                self.workspace.clone(),
                &file,
                renamed,
            )));
        }
        // The type moves to a new file named after it
        let mut change = CompositeChange::new(self.name.clone());
        change.add(Box::new(DeleteFileChange::new(self.workspace.clone(), &file)));
        change.add(Box::new(CreateFileChange::new(
            self.workspace.clone(),
            self.new_file(),
            renamed,
        )));
        Ok(Box::new(change))
    }

    fn participant_requests(&self) -> Vec<ParticipantRequest> {
        vec![ParticipantRequest::new(
            self.element.clone(),
            RenameArguments::new(self.new_name.clone(), true),
        )]
    }
}

pub fn rename_type_descriptor(workspace: Arc<dyn Workspace>, log: CallLog) -> ProcessorDescriptor {
    ProcessorDescriptor::new(RENAME_TYPE, "Rename type", move |elements: &[ElementRef]| {
        let element = elements
            .first()
            .cloned()
            .ok_or_else(|| "no element".to_string())?;
        Ok(Box::new(RenameTypeProcessor::new(
            element,
            "Person",
            workspace.clone(),
            log.clone(),
        )) as Box<dyn RefactoringProcessor>)
    })
    .with_enablement(Expression::iterate(
        IterateOperator::And,
        vec![Expression::instance_of(TYPE_KIND)],
    ))
}

/// What a [`ScriptedParticipant`] does in each step
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub initial: Option<(Severity, &'static str)>,
    pub final_status: Option<(Severity, &'static str)>,
    pub fail_final: bool,
    pub fail_create: bool,
    pub decline: bool,
    /// File in which occurrences of the old type name are replaced
    pub edit: Option<&'static str>,
}

fn scripted_status(entry: Option<(Severity, &'static str)>) -> RefactoringStatus {
    let mut status = RefactoringStatus::new();
    if let Some((severity, message)) = entry {
        status.add(severity, message, None);
    }
    status
}

/// Participant following a [`Script`] and logging every call
pub struct ScriptedParticipant {
    pub name: String,
    pub script: Script,
    pub workspace: Arc<dyn Workspace>,
    pub log: CallLog,
    old_name: String,
    new_name: String,
}

impl ScriptedParticipant {
    pub fn new(name: &str, script: Script, workspace: Arc<dyn Workspace>, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            script,
            workspace,
            log,
            old_name: String::new(),
            new_name: String::new(),
        }
    }

    fn record(&self, step: &str) {
        self.log.lock().push(format!("{}:{}", self.name, step));
    }
}

impl RefactoringParticipant for ScriptedParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &mut self,
        _processor: &ProcessorInfo,
        element: &ElementRef,
        arguments: &RefactoringArguments,
    ) -> Result<bool> {
        self.record(&format!("initialize:{}", element.handle));
        if self.script.decline {
            return Ok(false);
        }
        self.old_name = type_name(element).to_string();
        self.new_name = arguments
            .as_rename()
            .map(|args| args.new_name().to_string())
            .unwrap_or_default();
        Ok(true)
    }

    fn check_initial_conditions(&mut self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        self.record("initial");
        Ok(scripted_status(self.script.initial))
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        self.record("final");
        if self.script.fail_final {
            return Err(RefactoringError::Other("index unavailable".to_string()));
        }
        if let Some(path) = self.script.edit {
            if let Some(checker) = context.get_mut::<ValidateEditChecker>() {
                checker.add_file(path);
            }
        }
        Ok(scripted_status(self.script.final_status))
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>> {
        self.record("create");
        if self.script.fail_create {
            return Err(RefactoringError::participant(&self.name, "lost its index"));
        }
        let Some(path) = self.script.edit else {
            return Ok(None);
        };
        let content = self.workspace.read(Path::new(path))?;
        Ok(Some(Box::new(TextFileChange::with_content(
            format!("Update references in '{}'", path),
            self.workspace.clone(),
            path,
            content.replace(&self.old_name, &self.new_name),
        ))))
    }
}

pub fn scripted_descriptor(
    id: &str,
    script: Script,
    workspace: Arc<dyn Workspace>,
    log: CallLog,
) -> ParticipantDescriptor {
    let name = id.to_string();
    ParticipantDescriptor::new(id, id, ParticipantKind::Rename, move || {
        Ok(Box::new(ScriptedParticipant::new(
            &name,
            script.clone(),
            workspace.clone(),
            log.clone(),
        )) as Box<dyn RefactoringParticipant>)
    })
    .with_enablement(Expression::instance_of(TYPE_KIND))
}

/// Rewrites `mod` declarations when a module file is renamed
pub struct ModDeclarationParticipant {
    workspace: Arc<dyn Workspace>,
    log: CallLog,
    old_module: String,
    new_module: String,
}

impl RefactoringParticipant for ModDeclarationParticipant {
    fn name(&self) -> &str {
        "mod-declarations"
    }

    fn initialize(
        &mut self,
        _processor: &ProcessorInfo,
        element: &ElementRef,
        arguments: &RefactoringArguments,
    ) -> Result<bool> {
        self.log
            .lock()
            .push(format!("mod-declarations:initialize:{}", element.handle));
        let (Some(path), Some(rename)) = (element.resource_path(), arguments.as_rename()) else {
            return Ok(false);
        };
        let stem = |p: &Path| p.file_stem().map(|s| s.to_string_lossy().into_owned());
        match (stem(&path), stem(Path::new(rename.new_name()))) {
            (Some(old), Some(new)) => {
                self.old_module = old;
                self.new_module = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn check_initial_conditions(&mut self, _monitor: &ProgressMonitor) -> Result<RefactoringStatus> {
        self.log.lock().push("mod-declarations:initial".to_string());
        Ok(RefactoringStatus::new())
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        _context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        self.log.lock().push("mod-declarations:final".to_string());
        Ok(RefactoringStatus::new())
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>> {
        self.log.lock().push("mod-declarations:create".to_string());
        let main = Path::new("src/main.rs");
        let content = self.workspace.read(main)?;
        Ok(Some(Box::new(TextFileChange::with_content(
            "Update mod declarations",
            self.workspace.clone(),
            main,
            content.replace(
                &format!("mod {};", self.old_module),
                &format!("mod {};", self.new_module),
            ),
        ))))
    }
}

pub fn mod_declaration_descriptor(workspace: Arc<dyn Workspace>, log: CallLog) -> ParticipantDescriptor {
    ParticipantDescriptor::new(
        "test.mod-declarations",
        "Update mod declarations",
        ParticipantKind::Rename,
        move || {
            Ok(Box::new(ModDeclarationParticipant {
                workspace: workspace.clone(),
                log: log.clone(),
                old_module: String::new(),
                new_module: String::new(),
            }) as Box<dyn RefactoringParticipant>)
        },
    )
    .with_enablement(Expression::instance_of("resource.file"))
}

/// Sharable participant collecting every element it is handed
pub struct CollectingParticipant {
    pub log: CallLog,
    pub elements: Vec<String>,
}

impl RefactoringParticipant for CollectingParticipant {
    fn name(&self) -> &str {
        "collector"
    }

    fn initialize(
        &mut self,
        _processor: &ProcessorInfo,
        element: &ElementRef,
        _arguments: &RefactoringArguments,
    ) -> Result<bool> {
        self.log
            .lock()
            .push(format!("collector:initialize:{}", element.handle));
        self.elements.push(element.handle.clone());
        Ok(true)
    }

    fn check_final_conditions(
        &mut self,
        _monitor: &ProgressMonitor,
        _context: &mut CheckConditionsContext,
    ) -> Result<RefactoringStatus> {
        let mut status = RefactoringStatus::new();
        status.add_info(format!("collected {}", self.elements.join(",")));
        Ok(status)
    }

    fn create_change(&mut self, _monitor: &ProgressMonitor) -> Result<Option<Box<dyn Change>>> {
        Ok(None)
    }

    fn as_sharable(&mut self) -> Option<&mut dyn SharableParticipant> {
        Some(self)
    }
}

impl SharableParticipant for CollectingParticipant {
    fn add_element(&mut self, element: &ElementRef, _arguments: &RefactoringArguments) {
        self.log
            .lock()
            .push(format!("collector:add:{}", element.handle));
        self.elements.push(element.handle.clone());
    }
}

pub fn collecting_descriptor(log: CallLog) -> ParticipantDescriptor {
    ParticipantDescriptor::new("test.collector", "Collector", ParticipantKind::Rename, move || {
        Ok(Box::new(CollectingParticipant {
            log: log.clone(),
            elements: Vec::new(),
        }) as Box<dyn RefactoringParticipant>)
    })
}

pub fn broken_descriptor(id: &str) -> ParticipantDescriptor {
    ParticipantDescriptor::new(id, id, ParticipantKind::Rename, || {
        Err("missing native library".to_string())
    })
}
