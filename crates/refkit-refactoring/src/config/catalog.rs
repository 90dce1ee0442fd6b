//! Named factories configured descriptors bind to

use refkit_core::ElementRef;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::types::DescriptorConfig;
use crate::descriptor::{
    Descriptor, ParticipantDescriptor, ParticipantFactory, ProcessorDescriptor, ProcessorFactory,
};
use crate::error::{RefactoringError, Result};
use crate::participant::{RefactoringParticipant, RefactoringProcessor};

/// Factories addressable by name from configuration
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    participants: HashMap<String, ParticipantFactory>,
    processors: HashMap<String, ProcessorFactory>,
}

impl FactoryCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant factory under `name`
    pub fn register_participant<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> std::result::Result<Box<dyn RefactoringParticipant>, String>
            + Send
            + Sync
            + 'static,
    {
        self.participants.insert(name.into(), Arc::new(factory));
    }

    /// Register a processor factory under `name`
    pub fn register_processor<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[ElementRef]) -> std::result::Result<Box<dyn RefactoringProcessor>, String>
            + Send
            + Sync
            + 'static,
    {
        self.processors.insert(name.into(), Arc::new(factory));
    }

    /// Build the descriptor `config` describes.
    ///
    /// Fails with [`RefactoringError::DescriptorLoad`] when the factory is unknown.
    pub fn descriptor(&self, config: &DescriptorConfig) -> Result<Descriptor> {
        let unknown = || RefactoringError::DescriptorLoad {
            id: config.id.clone(),
            reason: format!("unknown factory '{}'", config.factory),
        };
        match config.kind.participant_kind() {
            None => {
                let factory = self.processors.get(&config.factory).ok_or_else(unknown)?;
                let mut descriptor = ProcessorDescriptor::with_factory(
                    config.id.clone(),
                    config.display_name(),
                    factory.clone(),
                )
                .with_enablement(config.enablement.clone());
                if let Some(overridden) = &config.override_id {
                    descriptor = descriptor.overriding(overridden.clone());
                }
                Ok(descriptor.into())
            }
            Some(kind) => {
                let factory = self.participants.get(&config.factory).ok_or_else(unknown)?;
                Ok(ParticipantDescriptor::with_factory(
                    config.id.clone(),
                    config.display_name(),
                    kind,
                    factory.clone(),
                )
                .with_enablement(config.enablement.clone())
                .into())
            }
        }
    }
}

impl fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut participants: Vec<&String> = self.participants.keys().collect();
        participants.sort();
        let mut processors: Vec<&String> = self.processors.keys().collect();
        processors.sort();
        f.debug_struct("FactoryCatalog")
            .field("participants", &participants)
            .field("processors", &processors)
            .finish()
    }
}
