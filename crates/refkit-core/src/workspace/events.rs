//! Model change notifications
//!
//! Every workspace mutation publishes a [`ModelChangeEvent`]. Listeners that
//! cache state derived from the workspace (the undo history in particular)
//! subscribe here and react to mutations they did not originate.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// What happened to a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChangeKind {
    /// The resource was created
    Created,
    /// The resource content changed
    Modified,
    /// The resource was removed
    Deleted,
    /// The resource was moved to a new path
    Moved {
        /// Destination path
        to: PathBuf,
    },
}

/// One observed resource mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChangeEvent {
    /// Resource path, relative to the workspace root
    pub path: PathBuf,
    /// Kind of mutation
    pub kind: ModelChangeKind,
}

impl ModelChangeEvent {
    /// Create a new event
    pub fn new(path: impl Into<PathBuf>, kind: ModelChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receives batches of model change events
pub trait ModelChangeListener: Send + Sync {
    /// Called once per delivered batch, never with an empty slice
    fn model_changed(&self, events: &[ModelChangeEvent]);
}

/// Handle returned by [`ModelChangeNotifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<ModelChangeEvent>,
}

#[derive(Default)]
struct NotifierInner {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ModelChangeListener>)>>,
    next_id: AtomicU64,
    batch: Mutex<BatchState>,
}

/// Publish/subscribe bus for model change events.
///
/// While a batch is open, events are queued and delivered together when the
/// outermost batch closes.
#[derive(Clone, Default)]
pub struct ModelChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ModelChangeNotifier {
    /// Create a notifier without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&self, listener: Arc<dyn ModelChangeListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Publish one event
    pub fn notify(&self, event: ModelChangeEvent) {
        self.notify_all(vec![event]);
    }

    /// Publish several events as one delivery
    pub fn notify_all(&self, events: Vec<ModelChangeEvent>) {
        if events.is_empty() {
            return;
        }
        {
            let mut batch = self.inner.batch.lock();
            if batch.depth > 0 {
                batch.pending.extend(events);
                return;
            }
        }
        self.deliver(&events);
    }

    /// Open a batch; events are held until every open batch guard is dropped
    pub fn batch(&self) -> BatchGuard {
        self.inner.batch.lock().depth += 1;
        BatchGuard {
            notifier: self.clone(),
        }
    }

    /// Whether a batch is currently open
    pub fn is_batching(&self) -> bool {
        self.inner.batch.lock().depth > 0
    }

    fn end_batch(&self) {
        let pending = {
            let mut batch = self.inner.batch.lock();
            batch.depth = batch.depth.saturating_sub(1);
            if batch.depth > 0 {
                return;
            }
            std::mem::take(&mut batch.pending)
        };
        if !pending.is_empty() {
            self.deliver(&pending);
        }
    }

    fn deliver(&self, events: &[ModelChangeEvent]) {
        // Snapshot so listeners may subscribe or unsubscribe while being notified
        let listeners: Vec<_> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        trace!(events = events.len(), listeners = listeners.len(), "Delivering model changes");
        for listener in listeners {
            listener.model_changed(events);
        }
    }
}

impl fmt::Debug for ModelChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelChangeNotifier")
            .field("listeners", &self.listener_count())
            .field("batching", &self.is_batching())
            .finish()
    }
}

/// Closes a batch opened by [`ModelChangeNotifier::batch`] when dropped
#[must_use = "the batch closes as soon as the guard is dropped"]
pub struct BatchGuard {
    notifier: ModelChangeNotifier,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.notifier.end_batch();
    }
}
