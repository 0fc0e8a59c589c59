//! Configuration for a simulated cluster.

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for the partitioned-dataset simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated worker nodes.
    pub node_count: usize,
    /// Maximum number of records held by one block.
    pub block_capacity: usize,
    /// Run node-local passes on the rayon thread pool.
    pub parallel_nodes: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_count: 4,
            block_capacity: 4,
            parallel_nodes: false,
        }
    }
}

impl SimulationConfig {
    /// Create a validated configuration with the given topology.
    pub fn new(node_count: usize, block_capacity: usize) -> Result<Self> {
        SimulationConfigBuilder::new()
            .node_count(node_count)
            .block_capacity(block_capacity)
            .build()
    }

    /// Check the invariants every dataset relies on.
    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(CommonError::configuration_error(
                "node_count must be at least 1",
            ));
        }
        if self.block_capacity == 0 {
            return Err(CommonError::configuration_error(
                "block_capacity must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CommonError::io_error_with_source(format!("reading {}", path.display()), e)
        })?;
        debug!("Loaded simulation config from {}", path.display());
        Self::from_json_str(&contents)
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }

    /// Set the number of nodes.
    pub fn node_count(mut self, node_count: usize) -> Self {
        self.config.node_count = node_count;
        self
    }

    /// Set the block capacity.
    pub fn block_capacity(mut self, block_capacity: usize) -> Self {
        self.config.block_capacity = block_capacity;
        self
    }

    /// Toggle parallel execution of node-local passes.
    pub fn parallel_nodes(mut self, parallel: bool) -> Self {
        self.config.parallel_nodes = parallel;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SimulationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = SimulationConfigBuilder::new().build().unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_builder_rejects_zero_nodes() {
        let err = SimulationConfigBuilder::new().node_count(0).build();
        assert!(matches!(err, Err(CommonError::ConfigurationError { .. })));
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert!(SimulationConfig::new(3, 0).is_err());
        assert_eq!(SimulationConfig::new(3, 2).unwrap().node_count, 3);
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = SimulationConfig::from_json_str(r#"{"node_count": 2}"#).unwrap();
        assert_eq!(config.node_count, 2);
        assert_eq!(config.block_capacity, 4);
        assert!(!config.parallel_nodes);
    }

    #[test]
    fn test_from_json_invalid_values() {
        let err = SimulationConfig::from_json_str(r#"{"block_capacity": 0}"#);
        assert!(matches!(err, Err(CommonError::ConfigurationError { .. })));

        let err = SimulationConfig::from_json_str(r#"{"node_count": "three"}"#);
        assert!(matches!(err, Err(CommonError::DeserializationError { .. })));

        let err = SimulationConfig::from_json_str("{not json");
        assert!(matches!(err, Err(CommonError::DeserializationError { .. })));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"node_count": 3, "block_capacity": 5, "parallel_nodes": true}}"#
        )
        .unwrap();

        let config = SimulationConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            SimulationConfig {
                node_count: 3,
                block_capacity: 5,
                parallel_nodes: true,
            }
        );
    }

    #[test]
    fn test_from_missing_file() {
        let err = SimulationConfig::from_file("/definitely/not/here.json");
        assert!(matches!(err, Err(CommonError::IoError { .. })));
    }
}
