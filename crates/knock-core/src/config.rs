//! Kernel configuration
//!
//! Values are resolved from defaults, then an optional YAML file, then
//! `KNOCK_*` environment variables. Invalid environment values are logged
//! and ignored.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::CoreError;

/// Limits of the cascade engine and the node store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Maximum number of waves in one cascade
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of consequences in one cascade
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Maximum number of live nodes, unbounded when `None`
    #[serde(default)]
    pub max_nodes: Option<usize>,
}

fn default_max_depth() -> u32 {
    64
}

fn default_max_steps() -> usize {
    10_000
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_steps: default_max_steps(),
            max_nodes: None,
        }
    }
}

impl KernelConfig {
    /// Load configuration from the environment, starting from defaults
    pub fn load() -> Result<Self, CoreError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        info!(
            max_depth = config.max_depth,
            max_steps = config.max_steps,
            max_nodes = ?config.max_nodes,
            "Loaded kernel configuration"
        );
        Ok(config)
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load_with_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let mut config = Self::from_yaml_file(path)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        info!(
            file = %path.display(),
            max_depth = config.max_depth,
            max_steps = config.max_steps,
            max_nodes = ?config.max_nodes,
            "Loaded kernel configuration"
        );
        Ok(config)
    }

    /// Read a YAML file; missing keys fall back to defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML document; missing keys fall back to defaults
    pub fn from_yaml_str(content: &str) -> Result<Self, CoreError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `KNOCK_MAX_DEPTH`, `KNOCK_MAX_STEPS` and `KNOCK_MAX_NODES` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("KNOCK_MAX_DEPTH") {
            match value.parse::<u32>() {
                Ok(depth) => self.max_depth = depth,
                Err(_) => warn!("Invalid KNOCK_MAX_DEPTH value: {}", value),
            }
        }

        if let Some(value) = lookup("KNOCK_MAX_STEPS") {
            match value.parse::<usize>() {
                Ok(steps) => self.max_steps = steps,
                Err(_) => warn!("Invalid KNOCK_MAX_STEPS value: {}", value),
            }
        }

        if let Some(value) = lookup("KNOCK_MAX_NODES") {
            if value.eq_ignore_ascii_case("none") || value.is_empty() {
                self.max_nodes = None;
            } else {
                match value.parse::<usize>() {
                    Ok(nodes) => self.max_nodes = Some(nodes),
                    Err(_) => warn!("Invalid KNOCK_MAX_NODES value: {}", value),
                }
            }
        }
    }

    /// Check the limits are usable
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_depth == 0 {
            return Err(CoreError::ConfigurationError(
                "max_depth must be greater than zero".to_string(),
            ));
        }

        if self.max_steps == 0 {
            return Err(CoreError::ConfigurationError(
                "max_steps must be greater than zero".to_string(),
            ));
        }

        if self.max_nodes == Some(0) {
            return Err(CoreError::ConfigurationError(
                "max_nodes must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }
}
