//! Progress reporting and cooperative cancellation

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::OperationCanceled;

#[derive(Debug, Default)]
struct ProgressState {
    task: String,
    sub_task: String,
    total_work: usize,
    worked: usize,
}

/// Progress token threaded through every phase of an operation.
///
/// Clones share the same cancellation token and progress state, so a host can
/// keep one handle and cancel an operation running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor {
    token: CancellationToken,
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressMonitor {
    /// Create a new monitor with a fresh cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor observing an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            state: Arc::default(),
        }
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Return `Err(OperationCanceled)` once cancellation has been requested
    pub fn check_cancelled(&self) -> Result<(), OperationCanceled> {
        if self.is_cancelled() {
            Err(OperationCanceled)
        } else {
            Ok(())
        }
    }

    /// Start a new task with the given amount of work
    pub fn begin_task(&self, name: impl Into<String>, total_work: usize) {
        let mut state = self.state.lock();
        state.task = name.into();
        state.sub_task.clear();
        state.total_work = total_work;
        state.worked = 0;
    }

    /// Describe the step currently running
    pub fn sub_task(&self, name: impl Into<String>) {
        self.state.lock().sub_task = name.into();
    }

    /// Record completed work
    pub fn worked(&self, work: usize) {
        self.state.lock().worked += work;
    }

    /// Mark the current task complete
    pub fn done(&self) {
        let mut state = self.state.lock();
        state.worked = state.total_work;
        state.sub_task.clear();
    }

    /// Name of the current task
    pub fn task_name(&self) -> String {
        self.state.lock().task.clone()
    }

    /// Name of the current step
    pub fn sub_task_name(&self) -> String {
        self.state.lock().sub_task.clone()
    }

    /// Fraction of work done, in `0.0..=1.0`
    pub fn fraction_done(&self) -> f64 {
        let state = self.state.lock();
        if state.total_work == 0 {
            0.0
        } else {
            (state.worked as f64 / state.total_work as f64).min(1.0)
        }
    }
}
