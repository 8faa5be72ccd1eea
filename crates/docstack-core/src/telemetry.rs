//! Tracing subscriber setup.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::error::DocstackResult;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when it is set; otherwise `log_level` is used as the
/// filter directive.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or a
/// global subscriber has already been installed.
pub fn init_tracing(log_level: &str) -> DocstackResult<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(log_level, "tracing subscriber installed");
    Ok(())
}
