//! Logging setup.
//!
//! The library only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init_logging`].

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{MockError, Result};

/// Build the event filter: `RUST_LOG` when set, else the configured level.
///
/// # Errors
///
/// Returns [`MockError::Config`] if the configured directive is invalid.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.trim())
        .map_err(|e| MockError::config(format!("invalid log level '{}': {e}", config.level)))
}

/// Install a global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`MockError::Config`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| MockError::config(format!("initialize logging subscriber: {e}")))
}
