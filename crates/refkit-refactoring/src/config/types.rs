//! Configuration types

use refkit_core::Severity;
use refkit_undo_redo::HistoryConfig;
use serde::{Deserialize, Serialize};

use crate::arguments::ParticipantKind;
use crate::expression::Expression;
use crate::registry::DEFAULT_PROCESSOR_CACHE_CAPACITY;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefactoringConfig {
    /// Undo history settings
    pub history: HistoryConfig,
    /// Registry settings
    pub registry: RegistryConfig,
    /// Execution policy
    pub execution: ExecutionConfig,
    /// Declarative processor and participant descriptors
    pub descriptors: Vec<DescriptorConfig>,
}

/// Registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of the processor lookup cache; at least 1
    pub processor_cache_capacity: usize,
    /// Descriptors disabled from the start of the session
    pub disabled_descriptors: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            processor_cache_capacity: DEFAULT_PROCESSOR_CACHE_CAPACITY,
            disabled_descriptors: Vec::new(),
        }
    }
}

/// How changes are performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Record the partial inverse of a failed perform on the undo stack
    pub continue_on_error: bool,
    /// Check change validity before performing
    pub validate_before_perform: bool,
    /// Condition severity at which no change is created; FATAL always stops
    pub stop_severity: Severity,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            validate_before_perform: true,
            stop_severity: Severity::Error,
        }
    }
}

/// What a configured descriptor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    /// A processor
    Processor,
    /// A rename participant
    Rename,
    /// A move participant
    Move,
    /// A delete participant
    Delete,
    /// A create participant
    Create,
    /// A copy participant
    Copy,
}

impl DescriptorKind {
    /// Participant kind, `None` for processors
    pub fn participant_kind(&self) -> Option<ParticipantKind> {
        match self {
            DescriptorKind::Processor => None,
            DescriptorKind::Rename => Some(ParticipantKind::Rename),
            DescriptorKind::Move => Some(ParticipantKind::Move),
            DescriptorKind::Delete => Some(ParticipantKind::Delete),
            DescriptorKind::Create => Some(ParticipantKind::Create),
            DescriptorKind::Copy => Some(ParticipantKind::Copy),
        }
    }
}

/// A declaratively configured descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Unique id
    pub id: String,
    /// Display name; defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    /// Processor or participant kind
    pub kind: DescriptorKind,
    /// Id of the processor descriptor this one overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_id: Option<String>,
    /// Name of the factory in the [`FactoryCatalog`](super::FactoryCatalog)
    pub factory: String,
    /// Enablement expression; always enabled when omitted
    #[serde(default)]
    pub enablement: Expression,
}

impl DescriptorConfig {
    /// Display name
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
