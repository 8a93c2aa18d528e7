// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Executor configuration

use crate::exec::relationship::RelationshipRules;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a [`QueryExecutor`](super::QueryExecutor) and the session
/// around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of gateway calls in flight at once
    pub worker_pool_size: usize,
    /// Initial namespace scope; empty means all namespaces
    pub namespace: String,
    pub debug: bool,
    pub relationships: RelationshipRules,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 1,
            namespace: "default".to_string(),
            debug: false,
            relationships: RelationshipRules::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_relationships(mut self, relationships: RelationshipRules) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        self.relationships
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("relationship rule: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.worker_pool_size, 1);
        assert_eq!(config.namespace, "default");
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ExecutorConfig::from_json_str(r#"{"worker_pool_size": 4}"#).unwrap();
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.namespace, "default");
        assert_eq!(config.relationships, RelationshipRules::default());
    }

    #[test]
    fn test_zero_pool_is_rejected() {
        let err = ExecutorConfig::from_json_str(r#"{"worker_pool_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_builders() {
        let config = ExecutorConfig::new()
            .with_worker_pool_size(2)
            .with_namespace("prod")
            .with_debug(true)
            .with_relationships(RelationshipRules::empty());
        assert_eq!(config.worker_pool_size, 2);
        assert_eq!(config.namespace, "prod");
        assert!(config.debug);
        assert!(config.relationships.rules().is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"namespace": "", "debug": true}}"#).unwrap();
        let config = ExecutorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.namespace, "");
        assert!(config.debug);

        assert!(matches!(
            ExecutorConfig::from_file("/nonexistent/kubecypher.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
