//! Adapters used by `adapt` expressions

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::context::Value;
use crate::error::ExpressionError;

/// Converts values into another type
pub trait Adapter: Send + Sync {
    /// Types this adapter can produce
    fn target_types(&self) -> Vec<String>;

    /// Adapt `value` to `target_type`; `None` when the value cannot be adapted
    fn adapt(&self, value: &Value, target_type: &str) -> Option<Value>;
}

/// Outcome of [`AdapterRegistry::adapt`]
#[derive(Debug, Clone, PartialEq)]
pub enum Adaptation {
    /// The adapted value
    Adapted(Value),
    /// No adapter can produce the type for this value
    NotAdaptable,
    /// An adapter for the type exists but is not loaded
    NotLoaded,
}

/// Creates a deferred adapter on activation
pub type AdapterLoader =
    Box<dyn Fn() -> std::result::Result<Arc<dyn Adapter>, String> + Send + Sync>;

enum AdapterEntry {
    Loaded(Arc<dyn Adapter>),
    Deferred {
        target_types: Vec<String>,
        loader: AdapterLoader,
    },
}

impl AdapterEntry {
    fn produces(&self, target_type: &str) -> bool {
        match self {
            AdapterEntry::Loaded(adapter) => {
                adapter.target_types().iter().any(|t| t == target_type)
            }
            AdapterEntry::Deferred { target_types, .. } => {
                target_types.iter().any(|t| t == target_type)
            }
        }
    }
}

/// Registered adapters
pub struct AdapterRegistry {
    entries: RwLock<Vec<AdapterEntry>>,
}

impl AdapterRegistry {
    /// Registry without adapters
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register an active adapter
    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        self.entries.write().push(AdapterEntry::Loaded(adapter));
    }

    /// Register an adapter producing `target_types` that is only created by
    /// [`activate`](Self::activate); until then `adapt` reports `NotLoaded`
    pub fn register_deferred(&self, target_types: Vec<String>, loader: AdapterLoader) {
        self.entries.write().push(AdapterEntry::Deferred {
            target_types,
            loader,
        });
    }

    /// Activate every deferred adapter producing `target_type`.
    ///
    /// Returns the number of adapters activated. A failing loader leaves its
    /// entry deferred and fails the call.
    pub fn activate(&self, target_type: &str) -> std::result::Result<usize, ExpressionError> {
        let mut entries = self.entries.write();
        if !entries.iter().any(|e| e.produces(target_type)) {
            return Err(ExpressionError::NoAdapter(target_type.to_string()));
        }
        let mut activated = 0;
        for entry in entries.iter_mut().filter(|e| e.produces(target_type)) {
            let adapter = match &*entry {
                AdapterEntry::Loaded(_) => continue,
                AdapterEntry::Deferred { loader, .. } => {
                    loader().map_err(|reason| ExpressionError::AdapterActivation {
                        type_name: target_type.to_string(),
                        reason,
                    })?
                }
            };
            *entry = AdapterEntry::Loaded(adapter);
            activated += 1;
        }
        debug!(target_type = %target_type, activated, "Activated adapters");
        Ok(activated)
    }

    /// Adapt `value` to `target_type`
    pub fn adapt(&self, value: &Value, target_type: &str) -> Adaptation {
        let entries = self.entries.read();
        let mut deferred = false;
        for entry in entries.iter() {
            if !entry.produces(target_type) {
                continue;
            }
            match entry {
                AdapterEntry::Loaded(adapter) => {
                    if let Some(adapted) = adapter.adapt(value, target_type) {
                        return Adaptation::Adapted(adapted);
                    }
                }
                AdapterEntry::Deferred { .. } => deferred = true,
            }
        }
        if deferred {
            Adaptation::NotLoaded
        } else {
            Adaptation::NotAdaptable
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.entries.read().len())
            .finish()
    }
}
