//! Pool configuration

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default limit on dependency chain length
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 128;

/// Configuration for a [`DefPool`](crate::DefPool)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Longest dependency chain the loader will follow (default: 128)
    pub max_dependency_depth: usize,
    /// Reject descriptors whose embedded name differs from the id they were
    /// registered under (default: true)
    pub verify_unit_names: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            verify_unit_names: true,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dependency depth limit
    pub fn max_dependency_depth(mut self, depth: usize) -> Self {
        self.max_dependency_depth = depth;
        self
    }

    /// Enable or disable descriptor name verification
    pub fn verify_unit_names(mut self, verify: bool) -> Self {
        self.verify_unit_names = verify;
        self
    }

    /// Parse configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("YAML parse error: {}", e)))
    }

    /// Parse configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("JSON parse error: {}", e)))
    }

    /// Load configuration from a `.yaml`/`.yml` or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;

        if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }
}
