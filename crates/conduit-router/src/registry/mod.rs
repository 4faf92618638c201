//! Capability Registry
//!
//! Configurable table of provider capability records. Entries are loaded once
//! at construction; afterwards only the `active` flag (administrative
//! enable/disable) and the reliability stats (refreshed by the health monitor)
//! change.
//!
//! # Module Structure
//!
//! - `defaults`: Built-in provider table

mod defaults;


pub use defaults::builtin_providers;

use crate::error::{Error, Result};
use crate::task::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info};

// ============================================================================
// Capability Types
// ============================================================================

/// Qualitative feature a provider is good at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Multi-step logical reasoning
    Reasoning,
    /// Emotionally aware responses
    Empathy,
    /// Open-ended generation
    Creativity,
    /// Structured analysis
    Analysis,
    /// Information retrieval and synthesis
    Research,
    /// Plans, schedules and roadmaps
    Planning,
}

impl Feature {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Empathy => "empathy",
            Self::Creativity => "creativity",
            Self::Analysis => "analysis",
            Self::Research => "research",
            Self::Planning => "planning",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed reliability of a provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityStats {
    /// Uptime percentage (0-100)
    pub uptime: f64,
    /// Average response time in milliseconds
    pub avg_latency_ms: u64,
    /// Error rate percentage (0-100)
    pub error_rate: f64,
}

impl Default for ReliabilityStats {
    fn default() -> Self {
        Self {
            uptime: 99.0,
            avg_latency_ms: 1000,
            error_rate: 1.0,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Capability record for a single provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapability {
    /// Provider identifier (e.g. "gpt-4o")
    pub id: String,
    /// Speed rating (0-100)
    pub speed: f64,
    /// Quality rating (0-100)
    pub quality: f64,
    /// Cost per unit of work (USD per token)
    pub cost_per_unit: f64,
    /// Flat cost per request (USD)
    #[serde(default)]
    pub cost_per_request: f64,
    /// Maximum context size in units
    pub context_window: u64,
    /// Accepts image input
    #[serde(default)]
    pub multimodal: bool,
    /// Task types this provider is strong at
    #[serde(default)]
    pub strengths: Vec<TaskType>,
    /// Qualitative features
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Supported languages (ISO 639-1)
    #[serde(default)]
    pub languages: Vec<String>,
    /// Reliability stats
    #[serde(default)]
    pub reliability: ReliabilityStats,
    /// Administrative enable flag
    #[serde(default = "default_true")]
    pub active: bool,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Concrete model version passed to the adapter
    #[serde(default)]
    pub model_version: Option<String>,
}

impl ProviderCapability {
    /// Whether this provider is explicitly strong at a task
    #[must_use]
    pub fn is_strong_at(&self, task: TaskType) -> bool {
        self.strengths.contains(&task)
    }

    /// Whether this provider supports a feature
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Structural check for context-window and multimodal constraints
    #[must_use]
    pub fn satisfies(&self, required_units: Option<u64>, require_multimodal: bool) -> bool {
        if require_multimodal && !self.multimodal {
            return false;
        }
        required_units.is_none_or(|units| units <= self.context_window)
    }

    /// Cost of `units` units of work
    #[must_use]
    pub fn cost_for(&self, units: u64) -> f64 {
        self.cost_per_unit * units as f64 + self.cost_per_request
    }

    /// Model name handed to the adapter
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model_version.as_deref().unwrap_or(&self.id)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Provider capability table
#[derive(Debug)]
pub struct CapabilityRegistry {
    entries: RwLock<BTreeMap<String, ProviderCapability>>,
}

impl CapabilityRegistry {
    /// Create a registry from a list of capability records
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on an empty or duplicate provider id.
    pub fn new(providers: Vec<ProviderCapability>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for provider in providers {
            if provider.id.trim().is_empty() {
                return Err(Error::Config("provider id must not be empty".to_string()));
            }
            if entries.contains_key(&provider.id) {
                return Err(Error::Config(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
            debug!(provider = %provider.id, active = provider.active, "Registering provider");
            entries.insert(provider.id.clone(), provider);
        }

        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Registry loaded with the built-in provider table
    #[must_use]
    pub fn builtin() -> Self {
        let entries = builtin_providers()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ProviderCapability>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ProviderCapability>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of every active entry, ordered by id
    #[must_use]
    pub fn all_active(&self) -> Vec<ProviderCapability> {
        self.read().values().filter(|p| p.active).cloned().collect()
    }

    /// Snapshot of every entry, ordered by id
    #[must_use]
    pub fn all(&self) -> Vec<ProviderCapability> {
        self.read().values().cloned().collect()
    }

    /// Look up a provider by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProviderCapability> {
        self.read().get(id).cloned()
    }

    /// Whether a provider id is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether a provider can structurally satisfy context/multimodal constraints
    #[must_use]
    pub fn can_satisfy(&self, id: &str, required_units: Option<u64>, require_multimodal: bool) -> bool {
        self.read()
            .get(id)
            .is_some_and(|p| p.satisfies(required_units, require_multimodal))
    }

    /// Whether a provider's context window fits `context_len` units
    #[must_use]
    pub fn can_handle_context(&self, id: &str, context_len: u64) -> bool {
        self.can_satisfy(id, Some(context_len), false)
    }

    /// Active providers supporting a feature
    #[must_use]
    pub fn providers_for_feature(&self, feature: Feature) -> Vec<String> {
        self.read()
            .values()
            .filter(|p| p.active && p.has_feature(feature))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Active providers explicitly strong at a task
    #[must_use]
    pub fn providers_for_task(&self, task: TaskType) -> Vec<String> {
        self.read()
            .values()
            .filter(|p| p.active && p.is_strong_at(task))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Cost of `units` units on provider `id`
    #[must_use]
    pub fn calculate_cost(&self, id: &str, units: u64) -> Option<f64> {
        self.read().get(id).map(|p| p.cost_for(units))
    }

    /// Expected latency for a request of `context_len` units
    ///
    /// Longer contexts scale the base latency by up to 3x.
    #[must_use]
    pub fn estimate_latency(&self, id: &str, context_len: u64) -> Option<u64> {
        self.read().get(id).map(|p| {
            let factor = (context_len as f64 / 10_000.0).min(2.0);
            (p.reliability.avg_latency_ms as f64 * (1.0 + factor)).round() as u64
        })
    }

    /// Enable or disable a provider; returns false for an unknown id
    pub fn set_active(&self, id: &str, active: bool) -> bool {
        match self.write().get_mut(id) {
            Some(p) => {
                if p.active != active {
                    info!(provider = %id, active, "Provider active flag changed");
                }
                p.active = active;
                true
            }
            None => false,
        }
    }

    /// Replace a provider's reliability stats; returns false for an unknown id
    pub fn refresh_reliability(&self, id: &str, stats: ReliabilityStats) -> bool {
        match self.write().get_mut(id) {
            Some(p) => {
                p.reliability = stats;
                true
            }
            None => false,
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
