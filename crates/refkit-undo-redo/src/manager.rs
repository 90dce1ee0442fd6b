//! The undo manager

use parking_lot::{Mutex, RwLock};
use refkit_core::{
    Change, ChangeError, ListenerId, ModelChangeEvent, ModelChangeListener, NullChange,
    ProgressMonitor, Workspace,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::error::{Result, UndoRedoError};
use crate::history::{HistoryConfig, HistoryEntry, HistoryEntryInfo, HistoryStacks};
use crate::listener::UndoManagerListener;

struct Shared {
    stacks: Mutex<HistoryStacks>,
    suspended: AtomicUsize,
    listeners: RwLock<Vec<Arc<dyn UndoManagerListener>>>,
}

impl Shared {
    fn flush(&self) -> usize {
        let dropped = self.stacks.lock().clear();
        if dropped > 0 {
            debug!(entries = dropped, "Flushed undo history");
            for listener in self.listeners_snapshot() {
                listener.undo_stack_changed();
                listener.redo_stack_changed();
            }
        }
        dropped
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn UndoManagerListener>> {
        self.listeners.read().clone()
    }
}

/// Flushes the history when the workspace changes behind the manager's back
struct ExternalChangeListener {
    shared: Weak<Shared>,
}

impl ModelChangeListener for ExternalChangeListener {
    fn model_changed(&self, events: &[ModelChangeEvent]) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if shared.suspended.load(Ordering::SeqCst) > 0 {
            return;
        }
        debug!(events = events.len(), "External workspace change observed");
        shared.flush();
    }
}

struct Suspension<'a>(&'a AtomicUsize);

impl<'a> Suspension<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Suspension<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Undo => "undo",
            Direction::Redo => "redo",
        }
    }
}

/// LIFO undo/redo history bound to one workspace.
///
/// The manager subscribes to the workspace's model change notifications for
/// its whole lifetime. Any change it did not announce itself flushes both
/// stacks, so stale inverses are never replayed. Changes performed on the
/// manager's behalf are announced with
/// [`about_to_perform_change`](Self::about_to_perform_change) and
/// [`change_performed`](Self::change_performed).
pub struct UndoManager {
    shared: Arc<Shared>,
    workspace: Arc<dyn Workspace>,
    subscription: Option<ListenerId>,
}

impl UndoManager {
    /// Create a manager with the default configuration
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self::with_config(workspace, &HistoryConfig::default())
    }

    /// Create a manager with the given configuration
    pub fn with_config(workspace: Arc<dyn Workspace>, config: &HistoryConfig) -> Self {
        let shared = Arc::new(Shared {
            stacks: Mutex::new(HistoryStacks::new(config)),
            suspended: AtomicUsize::new(0),
            listeners: RwLock::new(Vec::new()),
        });
        let subscription = workspace.notifier().subscribe(Arc::new(ExternalChangeListener {
            shared: Arc::downgrade(&shared),
        }));
        debug!(undo_limit = config.undo_limit, "Created undo manager");
        Self {
            shared,
            workspace,
            subscription: Some(subscription),
        }
    }

    /// Workspace the history applies to
    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn UndoManagerListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Remove a listener previously added; returns whether it was registered
    pub fn remove_listener(&self, listener: &Arc<dyn UndoManagerListener>) -> bool {
        let mut listeners = self.shared.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    /// Push a new undo entry; the redo stack is cleared
    pub fn add_undo(&self, name: impl Into<String>, change: Box<dyn Change>) {
        let entry = HistoryEntry::new(name, change);
        debug!(name = %entry.name, id = %entry.id, "Recorded undo entry");
        let had_redo = {
            let mut stacks = self.shared.stacks.lock();
            let had_redo = stacks.redo_len() > 0;
            stacks.record(entry);
            had_redo
        };
        for listener in self.shared.listeners_snapshot() {
            listener.undo_stack_changed();
            if had_redo {
                listener.redo_stack_changed();
            }
        }
    }

    /// Announce that a change is about to be performed against the workspace.
    ///
    /// Model change events are not treated as external until the matching
    /// [`change_performed`](Self::change_performed).
    pub fn about_to_perform_change(&self, name: &str) {
        self.shared.suspended.fetch_add(1, Ordering::SeqCst);
        for listener in self.shared.listeners_snapshot() {
            listener.about_to_perform_change(name);
        }
    }

    /// Close a bracket opened by [`about_to_perform_change`](Self::about_to_perform_change)
    pub fn change_performed(&self, name: &str, successful: bool) {
        let previous = self
            .shared
            .suspended
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous.is_err() {
            warn!(change = %name, "change_performed called without about_to_perform_change");
        }
        for listener in self.shared.listeners_snapshot() {
            listener.change_performed(name, successful);
        }
    }

    /// Undo the most recent entry and move its inverse onto the redo stack
    pub fn perform_undo(&self, monitor: &ProgressMonitor) -> Result<()> {
        self.perform(Direction::Undo, monitor)
    }

    /// Redo the most recent undone entry and move its inverse onto the undo stack
    pub fn perform_redo(&self, monitor: &ProgressMonitor) -> Result<()> {
        self.perform(Direction::Redo, monitor)
    }

    fn perform(&self, direction: Direction, monitor: &ProgressMonitor) -> Result<()> {
        if monitor.is_cancelled() {
            return Err(UndoRedoError::Cancelled);
        }
        let popped = {
            let mut stacks = self.shared.stacks.lock();
            match direction {
                Direction::Undo => stacks.pop_undo(),
                Direction::Redo => stacks.pop_redo(),
            }
        };
        let mut entry = popped.ok_or(match direction {
            Direction::Undo => UndoRedoError::NoMoreUndos,
            Direction::Redo => UndoRedoError::NoMoreRedos,
        })?;
        self.notify_stack_changed(direction);

        let validity = match entry.change.is_valid(monitor) {
            Ok(validity) => validity,
            Err(err) => {
                warn!(
                    name = %entry.name,
                    direction = direction.as_str(),
                    error = %err,
                    "History entry could not be validated"
                );
                return self.move_entry(direction, entry.name, Err(err));
            }
        };
        if validity.has_fatal_error() {
            warn!(
                name = %entry.name,
                direction = direction.as_str(),
                status = %validity,
                "History entry is no longer valid; flushing"
            );
            self.shared.flush();
            return Err(UndoRedoError::InvalidChange {
                name: entry.name,
                status: validity,
            });
        }

        info!(name = %entry.name, direction = direction.as_str(), "Executing history entry");
        let outcome = self.execute(&mut entry.change, &entry.name, monitor);
        if let Err(err) = &outcome {
            warn!(
                name = %entry.name,
                direction = direction.as_str(),
                error = %err,
                "History entry failed"
            );
        }
        self.move_entry(direction, entry.name, outcome)
    }

    /// Push the inverse of a popped entry onto the opposite stack; a failed
    /// entry moves with a `NullChange` inverse
    fn move_entry(
        &self,
        direction: Direction,
        name: String,
        outcome: std::result::Result<Box<dyn Change>, ChangeError>,
    ) -> Result<()> {
        let (inverse, result): (Box<dyn Change>, Result<()>) = match outcome {
            Ok(inverse) => (inverse, Ok(())),
            Err(err) => (
                Box::new(NullChange::new(name.clone())),
                Err(UndoRedoError::execution_failed(name.clone(), err)),
            ),
        };

        let moved = HistoryEntry::new(name, inverse);
        {
            let mut stacks = self.shared.stacks.lock();
            match direction {
                Direction::Undo => stacks.push_redo(moved),
                Direction::Redo => stacks.push_undo(moved),
            }
        }
        self.notify_stack_changed(match direction {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        });
        result
    }

    fn execute(
        &self,
        change: &mut Box<dyn Change>,
        name: &str,
        monitor: &ProgressMonitor,
    ) -> std::result::Result<Box<dyn Change>, ChangeError> {
        for listener in self.shared.listeners_snapshot() {
            listener.about_to_perform_change(name);
        }
        let result = {
            let _suspended = Suspension::new(&self.shared.suspended);
            self.workspace.batch(|| change.perform(monitor))
        };
        for listener in self.shared.listeners_snapshot() {
            listener.change_performed(name, result.is_ok());
        }
        result
    }

    fn notify_stack_changed(&self, direction: Direction) {
        for listener in self.shared.listeners_snapshot() {
            match direction {
                Direction::Undo => listener.undo_stack_changed(),
                Direction::Redo => listener.redo_stack_changed(),
            }
        }
    }

    /// Empty both stacks
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Whether there is an entry to undo
    pub fn anything_to_undo(&self) -> bool {
        self.shared.stacks.lock().undo_len() > 0
    }

    /// Whether there is an entry to redo
    pub fn anything_to_redo(&self) -> bool {
        self.shared.stacks.lock().redo_len() > 0
    }

    /// Name of the entry [`perform_undo`](Self::perform_undo) would execute
    pub fn peek_undo_name(&self) -> Option<String> {
        self.shared.stacks.lock().peek_undo().map(|e| e.name.clone())
    }

    /// Name of the entry [`perform_redo`](Self::perform_redo) would execute
    pub fn peek_redo_name(&self) -> Option<String> {
        self.shared.stacks.lock().peek_redo().map(|e| e.name.clone())
    }

    /// Number of undo entries
    pub fn undo_count(&self) -> usize {
        self.shared.stacks.lock().undo_len()
    }

    /// Number of redo entries
    pub fn redo_count(&self) -> usize {
        self.shared.stacks.lock().redo_len()
    }

    /// Undo entries, most recent first
    pub fn undo_history(&self) -> Vec<HistoryEntryInfo> {
        self.shared
            .stacks
            .lock()
            .undo_entries()
            .map(HistoryEntry::info)
            .collect()
    }

    /// Redo entries, most recent first
    pub fn redo_history(&self) -> Vec<HistoryEntryInfo> {
        self.shared
            .stacks
            .lock()
            .redo_entries()
            .map(HistoryEntry::info)
            .collect()
    }

    /// Flush the history and stop observing the workspace
    pub fn shutdown(mut self) {
        self.shared.flush();
        self.unsubscribe();
        info!("Undo manager shut down");
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.workspace.notifier().unsubscribe(id);
        }
    }
}

impl Drop for UndoManager {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stacks = self.shared.stacks.lock();
        f.debug_struct("UndoManager")
            .field("undo", &stacks.undo_len())
            .field("redo", &stacks.redo_len())
            .field("suspended", &self.shared.suspended.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_core::{CompositeChange, MemoryWorkspace, TextFileChange};
    use std::path::Path;

    fn setup() -> (Arc<MemoryWorkspace>, UndoManager) {
        let ws = Arc::new(MemoryWorkspace::with_files([("a.txt", "one"), ("b.txt", "two")]));
        let manager = UndoManager::new(ws.clone());
        (ws, manager)
    }

    fn perform(
        manager: &UndoManager,
        mut change: Box<dyn Change>,
    ) -> Box<dyn Change> {
        let name = change.name().to_string();
        manager.about_to_perform_change(&name);
        let undo = manager
            .workspace()
            .batch(|| change.perform(&ProgressMonitor::new()));
        manager.change_performed(&name, undo.is_ok());
        undo.unwrap()
    }

    #[derive(Default)]
    struct Counter {
        undo: AtomicUsize,
        redo: AtomicUsize,
        performed: Mutex<Vec<(String, bool)>>,
    }

    impl UndoManagerListener for Counter {
        fn undo_stack_changed(&self) {
            self.undo.fetch_add(1, Ordering::SeqCst);
        }

        fn redo_stack_changed(&self) {
            self.redo.fetch_add(1, Ordering::SeqCst);
        }

        fn change_performed(&self, name: &str, successful: bool) {
            self.performed.lock().push((name.to_string(), successful));
        }
    }

    #[test]
    fn test_add_undo_clears_redo() {
        let (_ws, manager) = setup();
        manager.add_undo("n1", Box::new(NullChange::new("n1")));
        manager.add_undo("n2", Box::new(NullChange::new("n2")));
        assert_eq!((manager.undo_count(), manager.redo_count()), (2, 0));

        manager.perform_undo(&ProgressMonitor::new()).unwrap();
        assert_eq!((manager.undo_count(), manager.redo_count()), (1, 1));
        assert_eq!(manager.peek_redo_name().as_deref(), Some("n2"));

        manager.add_undo("n3", Box::new(NullChange::new("n3")));
        assert_eq!((manager.undo_count(), manager.redo_count()), (2, 0));
    }

    #[test]
    fn test_undo_then_redo_round_trip() {
        let (ws, manager) = setup();
        let change = TextFileChange::with_content("edit a", manager.workspace().clone(), "a.txt", "ONE");
        let undo = perform(&manager, Box::new(change));
        manager.add_undo("edit a", undo);
        assert_eq!(ws.read(Path::new("a.txt")).unwrap(), "ONE");

        manager.perform_undo(&ProgressMonitor::new()).unwrap();
        assert_eq!(ws.read(Path::new("a.txt")).unwrap(), "one");
        assert!(manager.anything_to_redo());

        manager.perform_redo(&ProgressMonitor::new()).unwrap();
        assert_eq!(ws.read(Path::new("a.txt")).unwrap(), "ONE");
        assert_eq!((manager.undo_count(), manager.redo_count()), (1, 0));
    }

    #[test]
    fn test_external_change_flushes_both_stacks() {
        let (ws, manager) = setup();
        manager.add_undo("n1", Box::new(NullChange::new("n1")));
        manager.add_undo("n2", Box::new(NullChange::new("n2")));
        manager.perform_undo(&ProgressMonitor::new()).unwrap();

        ws.write(Path::new("b.txt"), "edited elsewhere").unwrap();
        assert!(!manager.anything_to_undo());
        assert!(!manager.anything_to_redo());
    }

    #[test]
    fn test_own_changes_do_not_flush() {
        let (_ws, manager) = setup();
        manager.add_undo("earlier", Box::new(NullChange::new("earlier")));
        let change = TextFileChange::with_content("edit b", manager.workspace().clone(), "b.txt", "TWO");
        let undo = perform(&manager, Box::new(change));
        manager.add_undo("edit b", undo);
        assert_eq!(manager.undo_count(), 2);

        manager.perform_undo(&ProgressMonitor::new()).unwrap();
        assert_eq!((manager.undo_count(), manager.redo_count()), (1, 1));
    }

    #[test]
    fn test_failed_undo_moves_entry_with_null_inverse() {
        let (ws, manager) = setup();
        let dynamic: Arc<dyn Workspace> = ws.clone();
        let mut composite = CompositeChange::new("delete a");
        composite.add(Box::new(refkit_core::DeleteFileChange::new(dynamic.clone(), "a.txt")));
        let undo = perform(&manager, Box::new(composite));
        manager.add_undo("delete a", undo);

        // Recreate a.txt behind the manager's back without a notification
        // reaching it, so the stale inverse is still on the stack.
        manager.about_to_perform_change("sneaky");
        ws.create(Path::new("a.txt"), "sneaky").unwrap();
        manager.change_performed("sneaky", true);

        let err = manager.perform_undo(&ProgressMonitor::new()).unwrap_err();
        assert!(matches!(
            err,
            UndoRedoError::InvalidChange { .. } | UndoRedoError::ExecutionFailed { .. }
        ));
        assert!(!manager.anything_to_undo());
    }

    #[test]
    fn test_execution_failure_pushes_null_redo() {
        let (_ws, manager) = setup();
        manager.add_undo(
            "bad",
            Box::new(TextFileChange::new(
                "bad",
                manager.workspace().clone(),
                "a.txt",
                vec![refkit_core::TextEdit::replace(10..20, "x")],
            )),
        );
        let err = manager.perform_undo(&ProgressMonitor::new()).unwrap_err();
        assert!(matches!(err, UndoRedoError::ExecutionFailed { .. }));
        assert_eq!((manager.undo_count(), manager.redo_count()), (0, 1));

        // Redoing the null inverse succeeds and changes nothing
        manager.perform_redo(&ProgressMonitor::new()).unwrap();
        assert_eq!(manager.peek_undo_name().as_deref(), Some("bad"));
    }

    #[derive(Debug)]
    struct Unverifiable;

    impl Change for Unverifiable {
        fn name(&self) -> &str {
            "unverifiable"
        }

        fn is_active(&self) -> bool {
            true
        }

        fn set_active(&mut self, _active: bool) {}

        fn execute(&mut self, _monitor: &ProgressMonitor) -> refkit_core::Result<Box<dyn Change>> {
            Ok(Box::new(NullChange::new("unverifiable")))
        }

        fn is_valid(&self, _monitor: &ProgressMonitor) -> refkit_core::Result<refkit_core::RefactoringStatus> {
            Err(ChangeError::ResourceNotFound("a.txt".to_string()))
        }
    }

    #[test]
    fn test_validation_error_moves_entry_with_null_inverse() {
        let (_ws, manager) = setup();
        let counter = Arc::new(Counter::default());
        manager.add_listener(counter.clone());
        manager.add_undo("bad", Box::new(Unverifiable));

        let err = manager.perform_undo(&ProgressMonitor::new()).unwrap_err();
        assert!(matches!(err, UndoRedoError::ExecutionFailed { .. }));
        assert_eq!((manager.undo_count(), manager.redo_count()), (0, 1));
        assert_eq!(manager.peek_redo_name().as_deref(), Some("bad"));
        assert!(counter.redo.load(Ordering::SeqCst) >= 1);
        // The change itself never ran
        assert!(counter.performed.lock().is_empty());

        manager.perform_redo(&ProgressMonitor::new()).unwrap();
        assert_eq!(manager.peek_undo_name().as_deref(), Some("bad"));
    }

    #[test]
    fn test_cancelled_monitor_keeps_entry() {
        let (_ws, manager) = setup();
        manager.add_undo("n1", Box::new(NullChange::new("n1")));
        let monitor = ProgressMonitor::new();
        monitor.cancel();
        assert!(matches!(
            manager.perform_undo(&monitor),
            Err(UndoRedoError::Cancelled)
        ));
        assert_eq!(manager.undo_count(), 1);
    }

    #[test]
    fn test_empty_stacks_report_errors() {
        let (_ws, manager) = setup();
        assert!(matches!(
            manager.perform_undo(&ProgressMonitor::new()),
            Err(UndoRedoError::NoMoreUndos)
        ));
        assert!(matches!(
            manager.perform_redo(&ProgressMonitor::new()),
            Err(UndoRedoError::NoMoreRedos)
        ));
    }

    #[test]
    fn test_listeners_are_notified() {
        let (_ws, manager) = setup();
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn UndoManagerListener> = counter.clone();
        manager.add_listener(listener.clone());

        manager.add_undo("n1", Box::new(NullChange::new("n1")));
        manager.perform_undo(&ProgressMonitor::new()).unwrap();
        assert_eq!(counter.undo.load(Ordering::SeqCst), 2);
        assert_eq!(counter.redo.load(Ordering::SeqCst), 1);
        assert_eq!(*counter.performed.lock(), vec![("n1".to_string(), true)]);

        assert!(manager.remove_listener(&listener));
        manager.flush();
        assert_eq!(counter.redo.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_unsubscribes() {
        let (ws, manager) = setup();
        assert_eq!(ws.notifier().listener_count(), 1);
        manager.add_undo("n1", Box::new(NullChange::new("n1")));
        manager.shutdown();
        assert_eq!(ws.notifier().listener_count(), 0);
    }
}
