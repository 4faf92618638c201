//! Caller context passed alongside every routed request

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Caller subscription tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerTier {
    /// Strict cost ceiling
    #[default]
    Free,
    /// Relaxed cost ceiling
    Premium,
    /// No cost ceiling, quality bonus
    Enterprise,
}

impl CallerTier {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for CallerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown caller tier: {other}")),
        }
    }
}

/// Metadata key: explicit system prompt
pub const META_SYSTEM_PROMPT: &str = "system_prompt";
/// Metadata key: `"true"` escalates urgency to high
pub const META_URGENT: &str = "urgent";
/// Metadata key: explicit urgency (`low`, `medium`, `high`)
pub const META_URGENCY: &str = "urgency";
/// Metadata key: expected work size in units, overrides the estimate
pub const META_EXPECTED_LENGTH: &str = "expected_length";
/// Metadata key: request language (ISO 639-1)
pub const META_LANGUAGE: &str = "language";

/// Who is calling and with which hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteContext {
    /// Caller identifier, used for rate limiting and usage attribution
    pub caller_id: String,
    /// Caller tier
    #[serde(default)]
    pub tier: CallerTier,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RouteContext {
    /// Create a context for a caller
    #[must_use]
    pub fn new(caller_id: impl Into<String>, tier: CallerTier) -> Self {
        Self {
            caller_id: caller_id.into(),
            tier,
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata value for a key
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Whether a metadata key is set to a truthy value
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.meta(key)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Caller-supplied system prompt
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.meta(META_SYSTEM_PROMPT).filter(|s| !s.trim().is_empty())
    }

    /// Caller-supplied expected work size
    #[must_use]
    pub fn expected_length(&self) -> Option<u64> {
        self.meta(META_EXPECTED_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .filter(|n| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!("Premium".parse::<CallerTier>(), Ok(CallerTier::Premium));
        assert!("gold".parse::<CallerTier>().is_err());
    }

    #[test]
    fn test_metadata_helpers() {
        let ctx = RouteContext::new("u1", CallerTier::Free)
            .with_metadata(META_URGENT, "TRUE")
            .with_metadata(META_EXPECTED_LENGTH, "2500")
            .with_metadata(META_SYSTEM_PROMPT, "  ");

        assert!(ctx.flag(META_URGENT));
        assert!(!ctx.flag("missing"));
        assert_eq!(ctx.expected_length(), Some(2500));
        assert_eq!(ctx.system_prompt(), None);
    }
}
