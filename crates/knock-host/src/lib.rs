//! # Knock Host
//!
//! Creates a node, anchors it at a timestamp, initializes it with a seed and
//! prints the consequences: first their count, then one line each.

pub mod config;
pub mod logging;

pub use config::HostConfig;

use anyhow::Context;
use knock_core::{ExecutionContext, KernelConfig, RuleRegistry};
use std::io::Write;
use tracing::info;

/// Rule set used when no rules file is configured
pub const DEFAULT_RULES: &str = include_str!("../rules/default.yaml");

/// Load the configured rule set, or the built-in one
pub fn load_registry(config: &HostConfig) -> anyhow::Result<RuleRegistry> {
    match &config.rules_file {
        Some(path) => knock_rules::load_rules_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display())),
        None => knock_rules::load_rules(DEFAULT_RULES).context("Built-in rule set is invalid"),
    }
}

/// Kernel limits: the configured YAML file when set, then `KNOCK_MAX_*` overrides
pub fn load_kernel_config(config: &HostConfig) -> anyhow::Result<KernelConfig> {
    match &config.config_file {
        Some(path) => KernelConfig::load_with_file(path).with_context(|| {
            format!(
                "Failed to load kernel configuration from {}",
                path.display()
            )
        }),
        None => KernelConfig::load().context("Failed to load kernel configuration"),
    }
}

/// Run one node through `initialize` and write its consequences to `out`
pub fn run<W: Write>(
    config: &HostConfig,
    kernel_config: KernelConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    let context = ExecutionContext::enter(registry, kernel_config)
        .context("Failed to start the kernel")?;

    let node = context.kernel().create_node()?;
    node.set_timestamp(config.timestamp)?;
    let consequences = node.initialize(config.seed)?;

    info!(
        node = %node.id(),
        consequences = consequences.len(),
        "Node initialized"
    );

    writeln!(out, "{}", consequences.len())?;
    for consequence in &consequences {
        writeln!(out, "{}", consequence)?;
    }
    out.flush()?;

    Ok(())
}
