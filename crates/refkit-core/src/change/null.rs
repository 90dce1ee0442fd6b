//! The no-op change

use super::Change;
use crate::error::Result;
use crate::monitor::ProgressMonitor;

/// A change that does nothing; its inverse is another `NullChange`
#[derive(Debug, Clone)]
pub struct NullChange {
    name: String,
    active: bool,
}

impl NullChange {
    /// Create a named no-op change
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
        }
    }
}

impl Default for NullChange {
    fn default() -> Self {
        Self::new("No operation")
    }
}

impl Change for NullChange {
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
        Ok(Box::new(NullChange::new(self.name.clone())))
    }
}
