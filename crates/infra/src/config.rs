//! Configuration loading.
//!
//! Layers, lowest precedence first:
//! 1. Defaults in code
//! 2. `config/<STOCKFLOW_ENVIRONMENT>.toml` (optional)
//! 3. Environment variables, e.g. `STOCKFLOW__SERVER__PORT=9090`

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use stockflow_observability::LogConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub log: LogConfig,
    pub concurrency: ConcurrencyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    /// How long a per-key lock is waited for before giving up.
    pub lock_timeout_ms: u64,
    /// Attempts per command when optimistic concurrency conflicts occur.
    pub max_attempts: u32,
}

impl ConcurrencyConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Settings {
    /// Load settings from `.env`, the optional environment file and `STOCKFLOW__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let environment = std::env::var("STOCKFLOW_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::builder(&environment)?
            .add_source(
                Environment::with_prefix("STOCKFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("log.level", "info")?
            .set_default("log.format", "json")?
            .set_default("concurrency.lock_timeout_ms", 2000)?
            .set_default("concurrency.max_attempts", 3)
            .map(|b| b.add_source(File::with_name(&format!("config/{environment}")).required(false)))
    }
}
