//! Configuration for the refactoring engine

pub mod catalog;
pub mod loader;
pub mod types;

pub use catalog::FactoryCatalog;
pub use loader::ConfigLoader;
pub use types::{DescriptorConfig, DescriptorKind, ExecutionConfig, RefactoringConfig, RegistryConfig};
