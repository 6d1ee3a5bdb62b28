//! Structured logging for the host.
//!
//! Logs always go to stderr; stdout only carries consequences.

use anyhow::Context;
use std::io;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::HostConfig;

/// Build the filter: `RUST_LOG` wins, then the configured filter
pub fn build_filter(config: &HostConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log filter '{}'", config.log_filter)),
    }
}

/// Initialize structured logging
pub fn init_logging(config: &HostConfig) -> anyhow::Result<()> {
    let env_filter = build_filter(config)?;

    let json_layer = config.json_logs.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(io::stderr)
    });

    let pretty_layer = (!config.json_logs).then(|| {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(io::stderr)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    info!(
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}
