//! Declarative descriptions of processors and participants
//!
//! A descriptor pairs an enablement [`Expression`] with a factory. Descriptors
//! are registered with a [`ParticipantRegistry`](crate::ParticipantRegistry)
//! directly, built from configuration, or submitted at link time through
//! [`DescriptorFactory`].

use refkit_core::ElementRef;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::arguments::ParticipantKind;
use crate::error::{ExpressionError, RefactoringError, Result};
use crate::expression::{EvaluationContext, EvaluationResult, Expression};
use crate::participant::{RefactoringParticipant, RefactoringProcessor};

/// Creates participant instances
pub type ParticipantFactory = Arc<
    dyn Fn() -> std::result::Result<Box<dyn RefactoringParticipant>, String> + Send + Sync,
>;

/// Creates a processor for a set of elements
pub type ProcessorFactory = Arc<
    dyn Fn(&[ElementRef]) -> std::result::Result<Box<dyn RefactoringProcessor>, String>
        + Send
        + Sync,
>;

/// Description of a participant
#[derive(Clone)]
pub struct ParticipantDescriptor {
    id: String,
    name: String,
    kind: ParticipantKind,
    enablement: Expression,
    factory: ParticipantFactory,
}

impl ParticipantDescriptor {
    /// Descriptor enabled for every element
    pub fn new<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ParticipantKind,
        factory: F,
    ) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn RefactoringParticipant>, String>
            + Send
            + Sync
            + 'static,
    {
        Self::with_factory(id, name, kind, Arc::new(factory))
    }

    /// Descriptor with a shared factory
    pub fn with_factory(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ParticipantKind,
        factory: ParticipantFactory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            enablement: Expression::always(),
            factory,
        }
    }

    /// Replace the enablement expression
    pub fn with_enablement(mut self, enablement: Expression) -> Self {
        self.enablement = enablement;
        self
    }

    /// Descriptor id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mutation class this participant reacts to
    pub fn kind(&self) -> ParticipantKind {
        self.kind
    }

    /// Enablement expression
    pub fn enablement(&self) -> &Expression {
        &self.enablement
    }

    /// Evaluate the enablement expression
    pub fn matches(
        &self,
        context: &EvaluationContext<'_>,
    ) -> std::result::Result<EvaluationResult, ExpressionError> {
        self.enablement.evaluate(context)
    }

    /// Instantiate the participant
    pub fn create(&self) -> Result<Box<dyn RefactoringParticipant>> {
        debug!(descriptor = %self.id, "Creating participant");
        (self.factory)().map_err(|reason| RefactoringError::DescriptorLoad {
            id: self.id.clone(),
            reason,
        })
    }
}

impl fmt::Debug for ParticipantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticipantDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("enablement", &self.enablement)
            .finish_non_exhaustive()
    }
}

/// Description of a processor
#[derive(Clone)]
pub struct ProcessorDescriptor {
    id: String,
    name: String,
    override_id: Option<String>,
    enablement: Expression,
    factory: ProcessorFactory,
}

impl ProcessorDescriptor {
    /// Descriptor enabled for every element list
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[ElementRef]) -> std::result::Result<Box<dyn RefactoringProcessor>, String>
            + Send
            + Sync
            + 'static,
    {
        Self::with_factory(id, name, Arc::new(factory))
    }

    /// Descriptor with a shared factory
    pub fn with_factory(
        id: impl Into<String>,
        name: impl Into<String>,
        factory: ProcessorFactory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            override_id: None,
            enablement: Expression::always(),
            factory,
        }
    }

    /// Declare that this descriptor wins over `other` when both match
    pub fn overriding(mut self, other: impl Into<String>) -> Self {
        self.override_id = Some(other.into());
        self
    }

    /// Replace the enablement expression
    pub fn with_enablement(mut self, enablement: Expression) -> Self {
        self.enablement = enablement;
        self
    }

    /// Descriptor id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the descriptor this one overrides
    pub fn override_id(&self) -> Option<&str> {
        self.override_id.as_deref()
    }

    /// Enablement expression
    pub fn enablement(&self) -> &Expression {
        &self.enablement
    }

    /// Evaluate the enablement expression
    pub fn matches(
        &self,
        context: &EvaluationContext<'_>,
    ) -> std::result::Result<EvaluationResult, ExpressionError> {
        self.enablement.evaluate(context)
    }

    /// Instantiate the processor for `elements`
    pub fn create(&self, elements: &[ElementRef]) -> Result<Box<dyn RefactoringProcessor>> {
        debug!(descriptor = %self.id, elements = elements.len(), "Creating processor");
        (self.factory)(elements).map_err(|reason| RefactoringError::DescriptorLoad {
            id: self.id.clone(),
            reason,
        })
    }
}

impl fmt::Debug for ProcessorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("override_id", &self.override_id)
            .field("enablement", &self.enablement)
            .finish_non_exhaustive()
    }
}

/// Either kind of descriptor
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Processor descriptor
    Processor(ProcessorDescriptor),
    /// Participant descriptor
    Participant(ParticipantDescriptor),
}

impl Descriptor {
    /// Descriptor id
    pub fn id(&self) -> &str {
        match self {
            Descriptor::Processor(d) => d.id(),
            Descriptor::Participant(d) => d.id(),
        }
    }
}

impl From<ProcessorDescriptor> for Descriptor {
    fn from(descriptor: ProcessorDescriptor) -> Self {
        Descriptor::Processor(descriptor)
    }
}

impl From<ParticipantDescriptor> for Descriptor {
    fn from(descriptor: ParticipantDescriptor) -> Self {
        Descriptor::Participant(descriptor)
    }
}

/// Link-time registration of descriptors.
///
/// ```ignore
/// inventory::submit! {
///     DescriptorFactory::new("java-rename", java_rename_descriptors)
/// }
/// ```
pub struct DescriptorFactory {
    /// Name of the descriptor group
    pub name: &'static str,

    /// Creates the descriptors of the group
    pub factory_fn: fn() -> Vec<Descriptor>,

    /// Registration order (lower = earlier, default = 100)
    pub priority: u32,
}

impl DescriptorFactory {
    /// Factory with default priority
    pub const fn new(name: &'static str, factory_fn: fn() -> Vec<Descriptor>) -> Self {
        Self {
            name,
            factory_fn,
            priority: 100,
        }
    }

    /// Factory with custom priority
    pub const fn with_priority(
        name: &'static str,
        factory_fn: fn() -> Vec<Descriptor>,
        priority: u32,
    ) -> Self {
        Self {
            name,
            factory_fn,
            priority,
        }
    }
}

inventory::collect!(DescriptorFactory);

/// Descriptors of every [`DescriptorFactory`] linked into the binary, in
/// priority order.
pub fn collect_registered_descriptors() -> Vec<Descriptor> {
    let mut factories: Vec<&DescriptorFactory> =
        inventory::iter::<DescriptorFactory>().collect();
    // Stable sort keeps submission order for equal priorities
    factories.sort_by_key(|f| f.priority);

    let mut descriptors = Vec::new();
    for factory in factories {
        let group = (factory.factory_fn)();
        debug!(
            group = factory.name,
            priority = factory.priority,
            count = group.len(),
            "Collected descriptor group"
        );
        descriptors.extend(group);
    }
    info!(count = descriptors.len(), "Collected registered descriptors");
    descriptors
}

/// Names of the linked descriptor groups
pub fn registered_descriptor_groups() -> Vec<&'static str> {
    inventory::iter::<DescriptorFactory>()
        .map(|f| f.name)
        .collect()
}
