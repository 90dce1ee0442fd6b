//! Configuration loader for the refactoring engine

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use super::types::RefactoringConfig;
use crate::error::{RefactoringError, Result};

/// Loads engine configuration from files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub fn load_from_yaml(path: &Path) -> Result<RefactoringConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RefactoringError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| RefactoringError::ConfigError(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn load_from_json(path: &Path) -> Result<RefactoringConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RefactoringError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| RefactoringError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }

    /// Load configuration from a file (auto-detect format), then validate it
    pub fn load(path: &Path) -> Result<RefactoringConfig> {
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::load_from_yaml(path)?,
            Some("json") => Self::load_from_json(path)?,
            _ => {
                return Err(RefactoringError::ConfigError(
                    "Unsupported configuration file format".to_string(),
                ))
            }
        };
        Self::validate(&config)?;
        debug!(
            path = %path.display(),
            descriptors = config.descriptors.len(),
            "Loaded refactoring configuration"
        );
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(config: &RefactoringConfig) -> Result<()> {
        if config.registry.processor_cache_capacity == 0 {
            return Err(RefactoringError::InvalidConfiguration(
                "registry.processor_cache_capacity must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for descriptor in &config.descriptors {
            if descriptor.id.trim().is_empty() {
                return Err(RefactoringError::InvalidConfiguration(
                    "Descriptor id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.id.as_str()) {
                return Err(RefactoringError::InvalidConfiguration(format!(
                    "Duplicate descriptor id '{}'",
                    descriptor.id
                )));
            }
        }

        Ok(())
    }
}
