//! Observers of the undo manager

/// Callbacks fired by [`UndoManager`](crate::UndoManager).
///
/// All methods default to no-ops. Callbacks run after the manager's internal
/// lock has been released, so they may query the manager.
pub trait UndoManagerListener: Send + Sync {
    /// The undo stack gained or lost entries
    fn undo_stack_changed(&self) {}

    /// The redo stack gained or lost entries
    fn redo_stack_changed(&self) {}

    /// A change is about to be executed by the manager or its caller
    fn about_to_perform_change(&self, _name: &str) {}

    /// A change announced through `about_to_perform_change` finished
    fn change_performed(&self, _name: &str, _successful: bool) {}
}
