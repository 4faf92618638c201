//! Configuration loading
//!
//! Layers embedded defaults, optional files, and the environment.

use super::AppConfig;
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    deserialize(builder(environment()))
}

pub(super) fn environment() -> Environment {
    // CONDUIT_ROUTER__CACHE__TTL_SECS -> router.cache.ttl_secs
    Environment::with_prefix("CONDUIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub(super) fn builder(environment: Environment) -> ConfigBuilder<DefaultState> {
    let profile = std::env::var("CONDUIT_ENV").unwrap_or_else(|_| "development".to_string());
    Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{profile}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(environment)
}

pub(super) fn deserialize(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig> {
    let config: AppConfig = builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    config.validate()?;
    Ok(config)
}
