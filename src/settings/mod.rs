//! Application configuration
//!
//! The router's own sections live under `[router]`; `[cli]` holds the
//! defaults the command line falls back to.

mod loader;

pub use loader::load_config;

use anyhow::{Context, Result};
use conduit_router::{CallerTier, RouterConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cli: CliConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

/// Command-line defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Caller id attributed to requests issued from the CLI
    pub caller_id: String,
    /// Tier used when `--tier` is not given
    pub tier: CallerTier,
    /// Health check period for long-running commands
    pub health_interval_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            caller_id: "cli".to_string(),
            tier: CallerTier::Premium,
            health_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Reject configurations the router cannot start with
    pub fn validate(&self) -> Result<()> {
        self.router.validate().context("Invalid router configuration")?;
        if self.cli.caller_id.trim().is_empty() {
            anyhow::bail!("cli.caller_id must not be empty");
        }

        let is_production = std::env::var("CONDUIT_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        if is_production {
            if !self.router.rate_limit.enabled {
                warn!("Rate limiting is DISABLED in production");
            }
            if self.router.execution.emergency_provider.is_none() {
                warn!("No emergency provider configured; unexpected pipeline errors surface to callers");
            }
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}
