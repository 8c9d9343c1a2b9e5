//! Application configuration module
//!
//! Configuration is loaded from environment variables (and a `.env` file in
//! development) using the `config` and `dotenvy` crates. Variables carry
//! the `LECTERN` prefix and nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use lectern::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Checkpointing every {:?}", config.live.checkpoint_interval());
//! ```

mod database;
mod error;
mod live;
mod logging;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use live::LiveConfig;
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    /// PostgreSQL session store
    pub database: DatabaseConfig,

    /// Live registry, checkpointer and topics
    #[serde(default)]
    pub live: LiveConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `LECTERN__DATABASE__URL=...` -> `database.url = ...`
    /// - `LECTERN__LIVE__CHECKPOINT_INTERVAL_SECS=10` -> `live.checkpoint_interval_secs = 10`
    /// - `LECTERN__LOGGING__FORMAT=json` -> `logging.format = json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LECTERN")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.live.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
