//! Application configuration module
//!
//! Configuration is read from environment variables with the `PREMIUM_BILLING`
//! prefix; nested values use a double underscore as separator.
//!
//! # Example
//!
//! ```no_run
//! use premium_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod gateway;
mod links;
mod scheduler;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use links::LinksConfig;
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Every section has defaults, so missing required values surface from
/// [`AppConfig::validate()`] rather than from deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener (host, port, environment, timeouts)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL pool
    #[serde(default)]
    pub database: DatabaseConfig,

    /// YooKassa credentials and limits
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Recurring billing loop
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Gift links, return redirect, notification relay
    #[serde(default)]
    pub links: LinksConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PREMIUM_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `PREMIUM_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PREMIUM_BILLING__GATEWAY__SHOP_ID=...` -> `gateway.shop_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PREMIUM_BILLING")
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
    /// Returns the first `ValidationError` found, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate(self.is_production())?;
        self.scheduler.validate()?;
        self.links.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
