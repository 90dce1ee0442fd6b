#![warn(missing_docs)]

//! Refkit Refactoring Pipeline
//!
//! Coordinates a primary mutation with an open-ended set of secondary
//! mutations, validates them in ordered phases and assembles them into one
//! reversible change.
//!
//! # Architecture
//!
//! - **Processor**: defines the primary mutation and the operation's identity
//! - **Participants**: secondary contributors selected per element by declarative
//!   enablement expressions with three-valued (`True`/`False`/`NotLoaded`) results
//! - **Registry**: resolves processors (with overrides and an LRU lookup cache) and
//!   participants (with sharable instances and session-wide disabling of broken
//!   descriptors)
//! - **Pipeline**: applicability, initial conditions, final conditions (plus
//!   participants derived from resource modifications), change creation
//! - **Operations**: perform a change or a whole refactoring and record the
//!   inverse on the undo history
//!
//! # Example
//!
//! ```ignore
//! use refkit_refactoring::{ParticipantRegistry, PerformRefactoringOperation, ProcessorBasedRefactoring};
//!
//! let registry = Arc::new(ParticipantRegistry::with_registered());
//! let refactoring = ProcessorBasedRefactoring::for_elements(&elements, registry, workspace.clone())?
//!     .ok_or("no refactoring available")?;
//! let outcome = PerformRefactoringOperation::new(refactoring)
//!     .with_undo_manager(undo_manager.clone())
//!     .run(&ProgressMonitor::new())?;
//! ```

pub mod arguments;
pub mod conditions;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod expression;
pub mod operation;
pub mod participant;
pub mod refactoring;
pub mod registry;
pub mod sharable;

// Re-export commonly used types
pub use arguments::{
    CopyArguments, CreateArguments, DeleteArguments, MoveArguments, ParticipantKind,
    RefactoringArguments, RenameArguments,
};
pub use conditions::{
    CheckConditionsContext, ConditionChecker, ResourceChangeChecker, ResourceModifications,
    ValidateEditChecker,
};
pub use config::{
    ConfigLoader, DescriptorConfig, DescriptorKind, ExecutionConfig, FactoryCatalog,
    RefactoringConfig, RegistryConfig,
};
pub use descriptor::{
    collect_registered_descriptors, registered_descriptor_groups, Descriptor, DescriptorFactory,
    ParticipantDescriptor, ParticipantFactory, ProcessorDescriptor, ProcessorFactory,
};
pub use error::{ExpressionError, RefactoringError, Result};
pub use expression::{
    CountSpec, EvaluationContext, EvaluationResult, Expression, ExpressionEnvironment,
    IterateOperator, Value,
};
pub use operation::{
    perform_in_background, ChangeExecution, CheckConditionsStyle, PerformChangeOperation,
    PerformRefactoringOperation, RefactoringOutcome,
};
pub use participant::{
    OperationStyle, ParticipantRequest, ProcessorInfo, RefactoringParticipant,
    RefactoringProcessor, SharableParticipant,
};
pub use refactoring::{ProcessorBasedRefactoring, RefactoringState};
pub use registry::{DescriptorSource, ParticipantRegistry};
pub use sharable::{LoadedParticipant, ParticipantSet, SharableParticipants};
