//! Error types for the refactoring pipeline

use refkit_core::{ChangeError, OperationCanceled, RefactoringStatus};
use refkit_undo_redo::UndoRedoError;
use thiserror::Error;

/// Result type for refactoring operations
pub type Result<T> = std::result::Result<T, RefactoringError>;

/// Errors that can occur while evaluating enablement expressions
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// No property tester handles the property
    #[error("No property tester for '{namespace}.{property}'")]
    NoTester {
        /// Tester namespace
        namespace: String,
        /// Property name
        property: String,
    },

    /// A deferred property tester could not be activated
    #[error("Property tester '{namespace}' failed to activate: {reason}")]
    TesterActivation {
        /// Tester namespace
        namespace: String,
        /// Why activation failed
        reason: String,
    },

    /// No adapter produces the type
    #[error("No adapter for type '{0}'")]
    NoAdapter(String),

    /// A deferred adapter could not be activated
    #[error("Adapter for '{type_name}' failed to activate: {reason}")]
    AdapterActivation {
        /// Requested target type
        type_name: String,
        /// Why activation failed
        reason: String,
    },

    /// A `with` expression names a variable the context does not define
    #[error("Variable not defined: {0}")]
    VariableNotDefined(String),

    /// A value has the wrong shape for the expression
    #[error("Expected {expected}, found {found}")]
    IncompatibleType {
        /// Expected shape
        expected: String,
        /// Actual type of the value
        found: String,
    },

    /// A `count` expression value is not one of `*`, `+`, `?`, `!` or a number
    #[error("Invalid count value: {0}")]
    InvalidCount(String),

    /// A property name lacks its namespace
    #[error("Property '{0}' must be qualified as namespace.property")]
    UnqualifiedProperty(String),
}

impl ExpressionError {
    /// Create a new IncompatibleType error
    pub fn incompatible(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::IncompatibleType {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Errors that can occur during refactoring operations
#[derive(Debug, Error)]
pub enum RefactoringError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The progress monitor was cancelled
    #[error("Refactoring cancelled")]
    Cancelled,

    /// An operation was requested in a state that does not allow it
    #[error("Invalid refactoring state: {0}")]
    InvalidState(String),

    /// The processor failed
    #[error("Processor error: {0}")]
    Processor(String),

    /// A participant failed
    #[error("Participant '{participant}' failed: {message}")]
    Participant {
        /// Participant name
        participant: String,
        /// Failure message
        message: String,
    },

    /// A descriptor's implementation could not be instantiated
    #[error("Failed to load descriptor '{id}': {reason}")]
    DescriptorLoad {
        /// Descriptor id
        id: String,
        /// Why loading failed
        reason: String,
    },

    /// The change reported a fatal validity status and was not performed
    #[error("Change can no longer be performed: {0}")]
    InvalidChange(RefactoringStatus),

    /// Performing the change failed
    #[error("Performing '{name}' failed: {source}")]
    PerformFailed {
        /// Change name
        name: String,
        /// Underlying failure
        #[source]
        source: ChangeError,
        /// Whether the partial inverse was recorded on the undo stack
        undo_recorded: bool,
    },

    /// Change error
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// Undo/redo error
    #[error(transparent)]
    UndoRedo(#[from] UndoRedoError),

    /// Expression evaluation error
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Other error
    #[error("{0}")]
    Other(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl RefactoringError {
    /// Create a new Participant error
    pub fn participant(participant: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Participant {
            participant: participant.into(),
            message: message.into(),
        }
    }

    /// Create a new Processor error
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor(message.into())
    }

    /// Create a new InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Whether this error stems from cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Change(err) | Self::PerformFailed { source: err, .. } => err.is_cancelled(),
            Self::UndoRedo(UndoRedoError::Cancelled) => true,
            _ => false,
        }
    }
}

impl From<OperationCanceled> for RefactoringError {
    fn from(_: OperationCanceled) -> Self {
        Self::Cancelled
    }
}
