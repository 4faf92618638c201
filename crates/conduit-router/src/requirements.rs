//! Requirement Resolver
//!
//! Deterministic mapping from a [`RequestAnalysis`] and caller tier to the
//! [`Requirements`] the selector filters and scores against.

use crate::analyzer::{RequestAnalysis, Urgency};
use crate::context::CallerTier;
use crate::registry::Feature;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ============================================================================
// Requirements
// ============================================================================

/// Hard and soft constraints for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    /// Per-unit cost ceiling
    pub max_cost: Option<f64>,
    /// Average latency ceiling in milliseconds
    pub max_latency_ms: Option<u64>,
    /// Quality floor (always a hard filter)
    pub min_quality: f64,
    /// Features the provider should support
    pub required_features: BTreeSet<Feature>,
    /// Provider must accept image input
    pub require_multimodal: bool,
    /// Expected work size in units; bounded by the provider context window
    pub estimated_units: Option<u64>,
    /// Caller tier
    pub tier: CallerTier,
    /// Providers already tried for this request
    pub excluded: HashSet<String>,
    /// Treat `max_cost` as a hard filter instead of a score term
    pub enforce_cost_ceiling: bool,
    /// Treat `max_latency_ms` as a hard filter instead of a score term
    pub enforce_latency_ceiling: bool,
}

impl Requirements {
    /// Requirements with no ceilings and no feature preferences
    #[must_use]
    pub fn unconstrained(tier: CallerTier) -> Self {
        Self {
            max_cost: None,
            max_latency_ms: None,
            min_quality: 0.0,
            required_features: BTreeSet::new(),
            require_multimodal: false,
            estimated_units: None,
            tier,
            excluded: HashSet::new(),
            enforce_cost_ceiling: false,
            enforce_latency_ceiling: false,
        }
    }

    /// Exclude a provider for the rest of this request
    pub fn exclude(&mut self, provider: impl Into<String>) {
        self.excluded.insert(provider.into());
    }

    /// Whether a provider was already tried
    #[must_use]
    pub fn is_excluded(&self, provider: &str) -> bool {
        self.excluded.contains(provider)
    }

    /// Set the per-unit cost ceiling
    #[must_use]
    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    /// Set the latency ceiling
    #[must_use]
    pub fn with_max_latency(mut self, ms: u64) -> Self {
        self.max_latency_ms = Some(ms);
        self
    }

    /// Set the quality floor
    #[must_use]
    pub fn with_min_quality(mut self, quality: f64) -> Self {
        self.min_quality = quality;
        self
    }

    /// Require a feature
    #[must_use]
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.required_features.insert(feature);
        self
    }

    /// Require image input support
    #[must_use]
    pub fn with_multimodal(mut self) -> Self {
        self.require_multimodal = true;
        self
    }

    /// Set the expected work size
    #[must_use]
    pub fn with_estimated_units(mut self, units: u64) -> Self {
        self.estimated_units = Some(units);
        self
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Thresholds used by [`resolve`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementPolicy {
    /// Complexity above which the high quality floor applies
    pub high_complexity: u8,
    /// Complexity above which the medium quality floor applies
    pub medium_complexity: u8,
    /// Quality floor for high complexity
    pub high_quality_floor: f64,
    /// Quality floor for medium complexity
    pub medium_quality_floor: f64,
    /// Quality floor otherwise
    pub base_quality_floor: f64,
    /// Emotional score above which empathy is required
    pub empathy_threshold: u8,
    /// Free-tier per-unit cost ceiling
    pub free_max_cost: Option<f64>,
    /// Premium-tier per-unit cost ceiling
    pub premium_max_cost: Option<f64>,
    /// Enterprise-tier per-unit cost ceiling
    pub enterprise_max_cost: Option<f64>,
    /// Latency ceiling for high urgency
    pub high_urgency_latency_ms: Option<u64>,
    /// Latency ceiling for medium urgency
    pub medium_urgency_latency_ms: Option<u64>,
    /// Latency ceiling for low urgency
    pub low_urgency_latency_ms: Option<u64>,
    /// Enforce the cost ceiling as a hard filter
    pub enforce_cost_ceiling: bool,
    /// Enforce the latency ceiling as a hard filter
    pub enforce_latency_ceiling: bool,
    /// Require multimodal support when the prompt mentions images
    pub multimodal_on_images: bool,
}

impl Default for RequirementPolicy {
    fn default() -> Self {
        Self {
            high_complexity: 7,
            medium_complexity: 4,
            high_quality_floor: 90.0,
            medium_quality_floor: 80.0,
            base_quality_floor: 70.0,
            empathy_threshold: 6,
            free_max_cost: Some(0.000_005),
            premium_max_cost: Some(0.000_015),
            enterprise_max_cost: None,
            high_urgency_latency_ms: Some(2000),
            medium_urgency_latency_ms: Some(5000),
            low_urgency_latency_ms: None,
            enforce_cost_ceiling: false,
            enforce_latency_ceiling: false,
            multimodal_on_images: true,
        }
    }
}

impl RequirementPolicy {
    /// Quality floor for a complexity score
    #[must_use]
    pub fn quality_floor(&self, complexity: u8) -> f64 {
        if complexity > self.high_complexity {
            self.high_quality_floor
        } else if complexity > self.medium_complexity {
            self.medium_quality_floor
        } else {
            self.base_quality_floor
        }
    }

    /// Cost ceiling for a tier
    #[must_use]
    pub fn cost_ceiling(&self, tier: CallerTier) -> Option<f64> {
        match tier {
            CallerTier::Free => self.free_max_cost,
            CallerTier::Premium => self.premium_max_cost,
            CallerTier::Enterprise => self.enterprise_max_cost,
        }
    }

    /// Latency ceiling for an urgency level
    #[must_use]
    pub fn latency_ceiling(&self, urgency: Urgency) -> Option<u64> {
        match urgency {
            Urgency::High => self.high_urgency_latency_ms,
            Urgency::Medium => self.medium_urgency_latency_ms,
            Urgency::Low => self.low_urgency_latency_ms,
        }
    }
}

/// Translate an analysis into requirements
#[must_use]
pub fn resolve(analysis: &RequestAnalysis, policy: &RequirementPolicy) -> Requirements {
    let mut features = BTreeSet::new();
    for (flag, feature) in [
        (
            analysis.requires_empathy || analysis.emotional_content > policy.empathy_threshold,
            Feature::Empathy,
        ),
        (analysis.requires_reasoning, Feature::Reasoning),
        (analysis.requires_creativity, Feature::Creativity),
        (analysis.requires_research, Feature::Research),
        (analysis.requires_planning, Feature::Planning),
    ] {
        if flag {
            features.insert(feature);
        }
    }

    Requirements {
        max_cost: policy.cost_ceiling(analysis.tier),
        max_latency_ms: policy.latency_ceiling(analysis.urgency),
        min_quality: policy.quality_floor(analysis.complexity),
        required_features: features,
        require_multimodal: policy.multimodal_on_images && analysis.has_images,
        estimated_units: Some(analysis.expected_units),
        tier: analysis.tier,
        excluded: HashSet::new(),
        enforce_cost_ceiling: policy.enforce_cost_ceiling,
        enforce_latency_ceiling: policy.enforce_latency_ceiling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::context::RouteContext;

    fn analysis(complexity: u8, tier: CallerTier, urgency: Urgency) -> RequestAnalysis {
        let mut a = analyze("hello", &RouteContext::new("u", tier));
        a.complexity = complexity;
        a.urgency = urgency;
        a
    }

    #[test]
    fn test_quality_floor_tracks_complexity() {
        let policy = RequirementPolicy::default();
        let high = resolve(&analysis(8, CallerTier::Free, Urgency::Medium), &policy);
        let mid = resolve(&analysis(5, CallerTier::Free, Urgency::Medium), &policy);
        let low = resolve(&analysis(4, CallerTier::Free, Urgency::Medium), &policy);
        assert_eq!(high.min_quality, 90.0);
        assert_eq!(mid.min_quality, 80.0);
        assert_eq!(low.min_quality, 70.0);
    }

    #[test]
    fn test_tier_cost_ceilings() {
        let policy = RequirementPolicy::default();
        let free = resolve(&analysis(5, CallerTier::Free, Urgency::Medium), &policy);
        let premium = resolve(&analysis(5, CallerTier::Premium, Urgency::Medium), &policy);
        let enterprise = resolve(&analysis(5, CallerTier::Enterprise, Urgency::Medium), &policy);
        assert_eq!(free.max_cost, Some(0.000_005));
        assert_eq!(premium.max_cost, Some(0.000_015));
        assert_eq!(enterprise.max_cost, None);
        assert_eq!(enterprise.tier, CallerTier::Enterprise);
    }

    #[test]
    fn test_urgency_latency_ceilings() {
        let policy = RequirementPolicy::default();
        let high = resolve(&analysis(5, CallerTier::Free, Urgency::High), &policy);
        let low = resolve(&analysis(5, CallerTier::Free, Urgency::Low), &policy);
        assert_eq!(high.max_latency_ms, Some(2000));
        assert_eq!(low.max_latency_ms, None);
    }

    #[test]
    fn test_features_from_signals() {
        let ctx = RouteContext::new("u", CallerTier::Free);
        let a = analyze("Please explain the latest research and plan my roadmap", &ctx);
        let req = resolve(&a, &RequirementPolicy::default());
        assert!(req.required_features.contains(&Feature::Reasoning));
        assert!(req.required_features.contains(&Feature::Research));
        assert!(req.required_features.contains(&Feature::Planning));
        assert!(!req.required_features.contains(&Feature::Empathy));

        let mut emotional = a.clone();
        emotional.emotional_content = 7;
        emotional.requires_empathy = false;
        let req = resolve(&emotional, &RequirementPolicy::default());
        assert!(req.required_features.contains(&Feature::Empathy));
    }

    #[test]
    fn test_empathy_keywords_require_empathy() {
        let ctx = RouteContext::new("u", CallerTier::Free);
        let a = analyze("Any advice on building trust", &ctx);
        assert!(a.requires_empathy);
        assert!(a.emotional_content <= RequirementPolicy::default().empathy_threshold);
        let req = resolve(&a, &RequirementPolicy::default());
        assert!(req.required_features.contains(&Feature::Empathy));
    }

    #[test]
    fn test_images_require_multimodal() {
        let ctx = RouteContext::new("u", CallerTier::Free);
        let req = resolve(&analyze("what is in this photo", &ctx), &RequirementPolicy::default());
        assert!(req.require_multimodal);
    }

    #[test]
    fn test_exclusion_set() {
        let mut req = Requirements::unconstrained(CallerTier::Free);
        assert!(!req.is_excluded("p1"));
        req.exclude("p1");
        assert!(req.is_excluded("p1"));
    }
}
