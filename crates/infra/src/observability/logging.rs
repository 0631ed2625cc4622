//! Structured logging initialization

use cwpp_domain::{CwppError, LoggingConfig, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise `config.level`.
///
/// # Errors
/// Returns `CwppError::Config` if the configured level is not a valid
/// filter directive
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CwppError::Config(format!("Failed to create log filter: {e}")))
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed; the existing
/// one is left in place.
///
/// # Errors
/// Returns `CwppError::Config` if the filter directive is invalid
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().with_target(true).compact()).try_init().is_ok()
    };
    Ok(installed)
}
