//! Host configuration
//!
//! Read from `KNOCK_RULES_FILE`, `KNOCK_CONFIG_FILE`, `KNOCK_TIMESTAMP`,
//! `KNOCK_SEED`, `LOG_FILTER` and `LOG_JSON`. Values that do not parse are reported back
//! to the caller so they can be logged once logging is up.

use std::env;
use std::path::PathBuf;

/// What the host runs and how it logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Rules file, the built-in rule set when `None`
    pub rules_file: Option<PathBuf>,

    /// YAML file with kernel limits, defaults and `KNOCK_MAX_*` only when `None`
    pub config_file: Option<PathBuf>,

    /// Timestamp assigned to the node before initialization
    pub timestamp: i64,

    /// Seed passed to `initialize`
    pub seed: i64,

    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    pub json_logs: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            config_file: None,
            timestamp: 0,
            seed: 1,
            log_filter: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl HostConfig {
    /// Load configuration from environment variables
    ///
    /// Returns the configuration and one message per rejected value.
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut rejected = Vec::new();

        if let Some(path) = lookup("KNOCK_RULES_FILE").filter(|p| !p.is_empty()) {
            config.rules_file = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("KNOCK_CONFIG_FILE").filter(|p| !p.is_empty()) {
            config.config_file = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("KNOCK_TIMESTAMP") {
            match value.parse::<i64>() {
                Ok(timestamp) => config.timestamp = timestamp,
                Err(_) => rejected.push(format!("Invalid KNOCK_TIMESTAMP value: {}", value)),
            }
        }

        if let Some(value) = lookup("KNOCK_SEED") {
            match value.parse::<i64>() {
                Ok(seed) => config.seed = seed,
                Err(_) => rejected.push(format!("Invalid KNOCK_SEED value: {}", value)),
            }
        }

        if let Some(filter) = lookup("LOG_FILTER").filter(|f| !f.is_empty()) {
            config.log_filter = filter;
        }

        if let Some(value) = lookup("LOG_JSON") {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.json_logs = true,
                "0" | "false" | "no" | "" => config.json_logs = false,
                _ => rejected.push(format!("Invalid LOG_JSON value: {}", value)),
            }
        }

        (config, rejected)
    }
}
