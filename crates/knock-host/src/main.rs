use anyhow::{Context, Result};
use knock_host::{logging, HostConfig};
use tracing::warn;

fn main() -> Result<()> {
    let (config, rejected) = HostConfig::from_env();

    logging::init_logging(&config).context("Failed to initialize logging")?;
    for message in &rejected {
        warn!("{}", message);
    }

    let kernel_config = knock_host::load_kernel_config(&config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    knock_host::run(&config, kernel_config, &mut out)?;

    Ok(())
}
