//! Router configuration
//!
//! Every section deserializes with defaults, so a partial TOML document (or
//! none at all) yields a working router.

use crate::cache::CacheConfig;
use crate::error::{Error, Result};
use crate::executor::ExecutionConfig;
use crate::health::HealthConfig;
use crate::registry::{builtin_providers, CapabilityRegistry, ProviderCapability};
use crate::requirements::RequirementPolicy;
use crate::selector::ScoringWeights;
use crate::usage::{RateLimitSettings, UsageConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete router configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Selector weights
    pub scoring: ScoringWeights,
    /// Requirement resolution policy
    pub requirements: RequirementPolicy,
    /// Health monitor thresholds
    pub health: HealthConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// Per-caller rate limiting
    pub rate_limit: RateLimitSettings,
    /// Fallback chain
    pub execution: ExecutionConfig,
    /// Usage log and quotas
    pub usage: UsageConfig,
    /// Registry entries; the built-in table when empty
    pub providers: Vec<ProviderCapability>,
}

impl RouterConfig {
    /// Registry entries, falling back to the built-in table
    #[must_use]
    pub fn effective_providers(&self) -> Vec<ProviderCapability> {
        if self.providers.is_empty() {
            builtin_providers()
        } else {
            self.providers.clone()
        }
    }

    /// Build the capability registry
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on duplicate provider ids.
    pub fn build_registry(&self) -> Result<CapabilityRegistry> {
        CapabilityRegistry::new(self.effective_providers())
    }

    /// Check the configuration for values the router cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let providers = self.effective_providers();
        let mut seen = HashSet::new();
        for p in &providers {
            if p.id.trim().is_empty() {
                return Err(Error::Config("provider id must not be empty".to_string()));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(Error::Config(format!("duplicate provider id: {}", p.id)));
            }
            if !(0.0..=100.0).contains(&p.quality) || !(0.0..=100.0).contains(&p.speed) {
                return Err(Error::Config(format!(
                    "provider {}: quality and speed must be within 0-100",
                    p.id
                )));
            }
        }

        if let Some(emergency) = &self.execution.emergency_provider {
            if !seen.contains(emergency.as_str()) {
                return Err(Error::Config(format!(
                    "unknown emergency provider: {emergency}"
                )));
            }
        }
        if self.execution.invoke_timeout_ms == 0 {
            return Err(Error::Config("execution.invoke_timeout_ms must be positive".to_string()));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be positive".to_string()));
        }
        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            return Err(Error::Config("rate_limit.window_secs must be positive".to_string()));
        }
        if self.health.ttl_secs == 0 || self.health.failure_threshold == 0 {
            return Err(Error::Config(
                "health.ttl_secs and health.failure_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
