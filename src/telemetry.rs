//! Tracing subscriber setup for the `lectern` binary.

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| TelemetryError::Filter(e.to_string()))?,
    };
    let subscriber = fmt().with_env_filter(filter).with_target(true);

    match config.format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string())),
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string())),
    }
}
