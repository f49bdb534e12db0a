//! Logging setup

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Later calls keep the first
/// subscriber, so tests may call this freely.
pub fn setup_logging(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|err| anyhow!("invalid log filter {:?}: {}", default_level, err))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();

    Ok(())
}
