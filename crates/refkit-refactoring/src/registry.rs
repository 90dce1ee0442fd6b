//! Processor and participant lookup
//!
//! The registry answers two questions: which processor handles a set of
//! elements, and which participants want to take part for one element of an
//! operation. Descriptors come from direct registration, from link-time
//! [`DescriptorFactory`](crate::descriptor::DescriptorFactory) submissions and
//! from external [`DescriptorSource`]s.
//!
//! Descriptors whose enablement cannot be evaluated or whose implementation
//! fails to load are disabled for the rest of the session.

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use refkit_core::{ElementRef, RefactoringStatus};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::arguments::ParticipantKind;
use crate::config::{ConfigLoader, FactoryCatalog, RefactoringConfig, RegistryConfig};
use crate::descriptor::{
    collect_registered_descriptors, Descriptor, ParticipantDescriptor, ProcessorDescriptor,
};
use crate::error::{RefactoringError, Result};
use crate::expression::{
    ContextKey, EvaluationContext, EvaluationResult, ExpressionEnvironment, Value,
    AFFECTED_PROJECTS_VARIABLE, ELEMENTS_VARIABLE, PROCESSOR_VARIABLE,
};
use crate::participant::{ParticipantRequest, ProcessorInfo, RefactoringProcessor};
use crate::sharable::ParticipantSet;

/// Default capacity of the processor lookup cache
pub const DEFAULT_PROCESSOR_CACHE_CAPACITY: usize = 5;

/// External provider of descriptors
pub trait DescriptorSource: Send + Sync {
    /// Descriptors that may apply to `context`
    fn candidates(&self, context: &EvaluationContext<'_>) -> Vec<Descriptor>;
}

/// Resolves processors and participants for evaluation contexts
pub struct ParticipantRegistry {
    descriptors: RwLock<Vec<Descriptor>>,
    sources: RwLock<Vec<Arc<dyn DescriptorSource>>>,
    disabled: RwLock<HashSet<String>>,
    processor_cache: Mutex<LruCache<ContextKey, Option<ProcessorDescriptor>>>,
    environment: Arc<ExpressionEnvironment>,
}

impl ParticipantRegistry {
    /// Empty registry with the default cache capacity
    pub fn new() -> Self {
        Self::with_capacity(
            NonZeroUsize::new(DEFAULT_PROCESSOR_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )
    }

    fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            descriptors: RwLock::new(Vec::new()),
            sources: RwLock::new(Vec::new()),
            disabled: RwLock::new(HashSet::new()),
            processor_cache: Mutex::new(LruCache::new(capacity)),
            environment: Arc::new(ExpressionEnvironment::new()),
        }
    }

    /// Empty registry configured from `config`
    pub fn with_config(config: &RegistryConfig) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.processor_cache_capacity).ok_or_else(|| {
            RefactoringError::InvalidConfiguration(
                "registry.processor_cache_capacity must be at least 1".to_string(),
            )
        })?;
        let registry = Self::with_capacity(capacity);
        for id in &config.disabled_descriptors {
            registry.disable(id, "disabled by configuration");
        }
        Ok(registry)
    }

    /// Registry holding the descriptors declared in `config`, bound to the
    /// factories of `catalog`.
    ///
    /// A descriptor naming an unknown factory is registered nowhere and
    /// disabled, like any other descriptor that fails to load.
    pub fn from_config(config: &RefactoringConfig, catalog: &FactoryCatalog) -> Result<Self> {
        ConfigLoader::validate(config)?;
        let registry = Self::with_config(&config.registry)?;
        for descriptor_config in &config.descriptors {
            match catalog.descriptor(descriptor_config) {
                Ok(descriptor) => registry.register(descriptor),
                Err(err) => registry.disable(&descriptor_config.id, &err.to_string()),
            }
        }
        Ok(registry)
    }

    /// Registry holding every descriptor submitted with `inventory::submit!`
    pub fn with_registered() -> Self {
        let registry = Self::new();
        registry.register_all(collect_registered_descriptors());
        registry
    }

    /// Replace the expression environment (testers and adapters)
    pub fn with_environment(mut self, environment: Arc<ExpressionEnvironment>) -> Self {
        self.environment = environment;
        self
    }

    /// Testers and adapters used to evaluate enablement expressions
    pub fn environment(&self) -> &Arc<ExpressionEnvironment> {
        &self.environment
    }

    /// Register a descriptor; later registrations lose ties to earlier ones
    pub fn register(&self, descriptor: impl Into<Descriptor>) {
        let descriptor = descriptor.into();
        debug!(descriptor = %descriptor.id(), "Registered descriptor");
        self.descriptors.write().push(descriptor);
        self.processor_cache.lock().clear();
    }

    /// Register several descriptors
    pub fn register_all(&self, descriptors: impl IntoIterator<Item = Descriptor>) {
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    /// Add an external descriptor source, consulted after registered descriptors
    pub fn add_source(&self, source: Arc<dyn DescriptorSource>) {
        self.sources.write().push(source);
        self.processor_cache.lock().clear();
    }

    /// Number of registered descriptors, disabled ones included
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.read().len()
    }

    /// Disable a descriptor for the rest of the session
    pub fn disable(&self, id: &str, reason: &str) {
        if self.disabled.write().insert(id.to_string()) {
            warn!(descriptor = %id, reason = %reason, "Disabled descriptor");
            self.processor_cache.lock().clear();
        }
    }

    /// Whether a descriptor is disabled
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.read().contains(id)
    }

    /// Ids of disabled descriptors, sorted
    pub fn disabled_descriptors(&self) -> Vec<String> {
        let disabled: BTreeSet<String> = self.disabled.read().iter().cloned().collect();
        disabled.into_iter().collect()
    }

    /// Number of cached processor lookups
    pub fn cached_lookups(&self) -> usize {
        self.processor_cache.lock().len()
    }

    /// Drop all cached processor lookups
    pub fn clear_cache(&self) {
        self.processor_cache.lock().clear();
    }

    /// Context processors are matched against: the element list is the
    /// default variable. `test` expressions may force tester activation.
    pub fn processor_context(&self, elements: &[ElementRef]) -> EvaluationContext<'static> {
        let mut context = EvaluationContext::for_elements(elements, self.environment.clone());
        context.set_allow_activation(true);
        context
    }

    fn candidates(&self, context: &EvaluationContext<'_>) -> Vec<Descriptor> {
        let mut candidates = self.descriptors.read().clone();
        let sources = self.sources.read().clone();
        for source in sources {
            candidates.extend(source.candidates(context));
        }
        let disabled = self.disabled.read();
        candidates.retain(|d| !disabled.contains(d.id()));
        candidates
    }

    /// The processor descriptor handling `elements`.
    ///
    /// Only descriptors whose enablement is `True` match. Among matches, a
    /// descriptor overriding the current winner replaces it; otherwise the
    /// first match in registration order wins.
    ///
    /// A lookup in which some enablement was `NotLoaded` is not cached, so it
    /// is decided again once the missing tester or adapter is activated.
    pub fn find_processor_descriptor(
        &self,
        elements: &[ElementRef],
    ) -> Option<ProcessorDescriptor> {
        let context = self.processor_context(elements);
        let key = context.cache_key();
        if let Some(cached) = self.processor_cache.lock().get(&key) {
            debug!(elements = elements.len(), "Processor lookup served from cache");
            return cached.clone();
        }

        let mut matches = Vec::new();
        let mut undecided = false;
        for descriptor in self.candidates(&context) {
            let Descriptor::Processor(descriptor) = descriptor else {
                continue;
            };
            match descriptor.matches(&context) {
                Ok(EvaluationResult::True) => matches.push(descriptor),
                Ok(EvaluationResult::NotLoaded) => undecided = true,
                Ok(EvaluationResult::False) => {}
                Err(err) => self.disable(descriptor.id(), &err.to_string()),
            }
        }
        let winner = select_processor(matches);
        if undecided {
            debug!(
                elements = elements.len(),
                "Processor lookup not cached: enablement not loaded"
            );
        } else {
            self.processor_cache.lock().put(key, winner.clone());
        }
        winner
    }

    /// Whether some processor handles `elements`
    pub fn has_processor(&self, elements: &[ElementRef]) -> bool {
        self.find_processor_descriptor(elements).is_some()
    }

    /// Instantiate the processor handling `elements`.
    ///
    /// A descriptor whose factory fails is disabled and the lookup repeated,
    /// so an overridden descriptor takes over from a broken override.
    pub fn create_processor(
        &self,
        elements: &[ElementRef],
    ) -> Result<Option<Box<dyn RefactoringProcessor>>> {
        while let Some(descriptor) = self.find_processor_descriptor(elements) {
            match descriptor.create(elements) {
                Ok(processor) => {
                    info!(descriptor = %descriptor.id(), "Created processor");
                    return Ok(Some(processor));
                }
                Err(err) => self.disable(descriptor.id(), &err.to_string()),
            }
        }
        Ok(None)
    }

    /// Context participants are matched against for one element.
    ///
    /// The element is the default variable; the processor id, the processor's
    /// elements and their projects are named variables. `test` expressions
    /// may force tester activation.
    pub fn participant_context(
        &self,
        processor: &ProcessorInfo,
        element: &ElementRef,
    ) -> EvaluationContext<'static> {
        let mut context =
            EvaluationContext::new(Value::from(element.clone()), self.environment.clone());
        context.set_allow_activation(true);
        context.add_variable(PROCESSOR_VARIABLE, processor.id.as_str());
        context.add_variable(ELEMENTS_VARIABLE, processor.elements.clone());
        let projects: BTreeSet<&str> = processor
            .elements
            .iter()
            .chain(std::iter::once(element))
            .filter_map(|e| e.project.as_deref())
            .collect();
        context.add_variable(
            AFFECTED_PROJECTS_VARIABLE,
            projects.into_iter().collect::<Vec<_>>(),
        );
        context
    }

    /// Participant descriptors of `kind` that may apply in `context`
    pub fn participant_descriptors(
        &self,
        kind: ParticipantKind,
        context: &EvaluationContext<'_>,
    ) -> Vec<ParticipantDescriptor> {
        self.candidates(context)
            .into_iter()
            .filter_map(|d| match d {
                Descriptor::Participant(d) if d.kind() == kind => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Load the participants for `requests` into `set`.
    ///
    /// A descriptor is a candidate when its enablement is `True` or
    /// `NotLoaded`. If `set` already holds a sharable instance of the
    /// descriptor for this processor, that instance receives the element
    /// instead of a new one being created. Load failures disable the
    /// descriptor and are reported as INFO entries in `status`.
    pub fn load_participants(
        &self,
        processor: &ProcessorInfo,
        requests: &[ParticipantRequest],
        set: &mut ParticipantSet,
        status: &mut RefactoringStatus,
    ) {
        for request in requests {
            let context = self.participant_context(processor, &request.element);
            for descriptor in self.participant_descriptors(request.arguments.kind(), &context) {
                if self.is_disabled(descriptor.id()) {
                    continue;
                }
                match descriptor.matches(&context) {
                    Ok(EvaluationResult::False) => continue,
                    Ok(_) => {}
                    Err(err) => {
                        self.report_failure(descriptor.id(), &err.to_string(), status);
                        continue;
                    }
                }

                if let Some(loaded) = set.shared_mut(descriptor.id(), &processor.id) {
                    if let Some(sharable) = loaded.participant_mut().as_sharable() {
                        debug!(
                            descriptor = %descriptor.id(),
                            element = %request.element,
                            "Added element to shared participant"
                        );
                        sharable.add_element(&request.element, &request.arguments);
                        continue;
                    }
                }

                let mut participant = match descriptor.create() {
                    Ok(participant) => participant,
                    Err(err) => {
                        self.report_failure(descriptor.id(), &err.to_string(), status);
                        continue;
                    }
                };
                match participant.initialize(processor, &request.element, &request.arguments) {
                    Ok(true) if participant.is_available() => {
                        debug!(
                            descriptor = %descriptor.id(),
                            element = %request.element,
                            "Loaded participant"
                        );
                        set.push(descriptor.id(), &processor.id, participant);
                    }
                    Ok(_) => {
                        debug!(descriptor = %descriptor.id(), "Participant declined element");
                    }
                    Err(err) => self.report_failure(descriptor.id(), &err.to_string(), status),
                }
            }
        }
    }

    fn report_failure(&self, id: &str, reason: &str, status: &mut RefactoringStatus) {
        self.disable(id, reason);
        status.add_info(format!("Participant '{}' was disabled: {}", id, reason));
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParticipantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticipantRegistry")
            .field("descriptors", &self.descriptors.read().len())
            .field("sources", &self.sources.read().len())
            .field("disabled", &self.disabled.read().len())
            .field("cached_lookups", &self.processor_cache.lock().len())
            .finish()
    }
}

/// Follow override declarations from the first match
fn select_processor(matches: Vec<ProcessorDescriptor>) -> Option<ProcessorDescriptor> {
    let mut winner = matches.first()?.clone();
    let mut visited = HashSet::new();
    visited.insert(winner.id().to_string());
    while let Some(overriding) = matches
        .iter()
        .find(|d| d.override_id() == Some(winner.id()) && !visited.contains(d.id()))
    {
        debug!(winner = %overriding.id(), overridden = %winner.id(), "Processor overridden");
        visited.insert(overriding.id().to_string());
        winner = overriding.clone();
    }
    Some(winner)
}
