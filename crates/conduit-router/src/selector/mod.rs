//! Selector
//!
//! Filters registry entries through the hard constraints, scores survivors
//! with a weighted sum, and returns them ranked.
//!
//! Hard filters (elimination, not penalty): inactive, excluded for this
//! request, health verdict down, context window too small, multimodal
//! missing, quality below the floor, and the cost/latency ceilings when the
//! requirements mark them enforced.
//!
//! Score terms, with the default weights:
//!
//! | Term     | Weight | Basis                                                  |
//! |----------|--------|--------------------------------------------------------|
//! | Task     | 40/20  | explicit strength / related-task strength              |
//! | Quality  | 30     | quality rating / 100                                   |
//! | Speed    | 15     | headroom under latency ceiling, else speed rating      |
//! | Cost     | 15     | headroom under cost ceiling, else under reference cost |
//! | Features | 10     | fraction of required features supported                |
//!
//! The tier adjustment (free x0.8 for expensive providers, premium +5,
//! enterprise +10) applies next, then the total is multiplied by
//! `uptime / 100`.

#[cfg(test)]
mod tests;

use crate::context::CallerTier;
use crate::error::{Error, Result};
use crate::health::Verdicts;
use crate::registry::ProviderCapability;
use crate::requirements::Requirements;
use crate::task::TaskType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Work size assumed when a request carries no estimate
pub const DEFAULT_ESTIMATED_UNITS: u64 = 1000;

// ============================================================================
// Weights
// ============================================================================

/// Scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Bonus for an explicit task strength
    pub task_match: f64,
    /// Bonus for a related-task strength
    pub related_task: f64,
    /// Maximum quality term
    pub quality: f64,
    /// Maximum speed term
    pub speed: f64,
    /// Maximum cost term
    pub cost: f64,
    /// Maximum feature term
    pub feature: f64,
    /// Per-unit cost used as the reference when no ceiling is given
    pub reference_cost: f64,
    /// Per-unit cost above which free-tier callers pay the multiplier
    pub free_tier_expensive_threshold: f64,
    /// Free-tier multiplier for expensive providers
    pub free_tier_multiplier: f64,
    /// Flat premium-tier bonus
    pub premium_bonus: f64,
    /// Flat enterprise-tier bonus
    pub enterprise_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            task_match: 40.0,
            related_task: 20.0,
            quality: 30.0,
            speed: 15.0,
            cost: 15.0,
            feature: 10.0,
            reference_cost: 0.000_01,
            free_tier_expensive_threshold: 0.000_005,
            free_tier_multiplier: 0.8,
            premium_bonus: 5.0,
            enterprise_bonus: 10.0,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Per-term contributions to a provider's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Task-specialization term
    pub task: f64,
    /// Quality term
    pub quality: f64,
    /// Speed/latency term
    pub speed: f64,
    /// Cost term
    pub cost: f64,
    /// Feature-match term
    pub features: f64,
    /// Score after the tier adjustment, before reliability
    pub tier_adjusted: f64,
    /// Final score
    pub total: f64,
}

/// Chosen provider with justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Provider id
    pub provider: String,
    /// Final score
    pub score: f64,
    /// Human-readable justification
    pub reason: String,
    /// Cost of the estimated work
    pub estimated_cost: f64,
    /// Expected latency
    pub estimated_latency_ms: u64,
    /// Confidence from the score gap to the next candidate (50-100)
    pub confidence: f64,
    /// Per-term contributions
    pub breakdown: ScoreBreakdown,
}

/// Ranked survivors of the hard filters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    /// Top candidate
    pub best: SelectionResult,
    /// Remaining candidates in rank order
    pub runners_up: Vec<SelectionResult>,
}

impl Ranking {
    /// Number of ranked candidates
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.runners_up.len()
    }

    /// Always false; a ranking has at least one candidate
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Candidates in rank order
    pub fn iter(&self) -> impl Iterator<Item = &SelectionResult> {
        std::iter::once(&self.best).chain(self.runners_up.iter())
    }
}

/// Why a candidate was eliminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Administratively disabled
    Inactive,
    /// Already tried for this request
    Excluded,
    /// Health verdict is down
    Unhealthy,
    /// Context window smaller than the work
    ContextWindow,
    /// No image support
    Multimodal,
    /// Quality below the floor
    Quality,
    /// Cost above an enforced ceiling
    Cost,
    /// Latency above an enforced ceiling
    Latency,
}

impl Rejection {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Excluded => "excluded",
            Self::Unhealthy => "unhealthy",
            Self::ContextWindow => "context_window",
            Self::Multimodal => "multimodal",
            Self::Quality => "quality",
            Self::Cost => "cost",
            Self::Latency => "latency",
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Scores and ranks providers against requirements
#[derive(Debug, Clone, Default)]
pub struct Selector {
    weights: ScoringWeights,
}

impl Selector {
    /// Create a selector with the given weights
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Active weights
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// First hard filter a provider fails, if any
    #[must_use]
    pub fn rejection(
        &self,
        requirements: &Requirements,
        provider: &ProviderCapability,
        verdicts: &Verdicts,
    ) -> Option<Rejection> {
        if !provider.active {
            return Some(Rejection::Inactive);
        }
        if requirements.is_excluded(&provider.id) {
            return Some(Rejection::Excluded);
        }
        if !verdicts.get(&provider.id).copied().unwrap_or(true) {
            return Some(Rejection::Unhealthy);
        }
        if requirements
            .estimated_units
            .is_some_and(|units| units > provider.context_window)
        {
            return Some(Rejection::ContextWindow);
        }
        if requirements.require_multimodal && !provider.multimodal {
            return Some(Rejection::Multimodal);
        }
        if provider.quality < requirements.min_quality {
            return Some(Rejection::Quality);
        }
        if requirements.enforce_cost_ceiling
            && requirements
                .max_cost
                .is_some_and(|max| provider.cost_per_unit > max)
        {
            return Some(Rejection::Cost);
        }
        if requirements.enforce_latency_ceiling
            && requirements
                .max_latency_ms
                .is_some_and(|max| provider.reliability.avg_latency_ms > max)
        {
            return Some(Rejection::Latency);
        }
        None
    }

    /// Weighted score for one provider
    #[must_use]
    pub fn score(
        &self,
        task: TaskType,
        requirements: &Requirements,
        provider: &ProviderCapability,
    ) -> ScoreBreakdown {
        let w = &self.weights;
        let mut b = ScoreBreakdown::default();

        b.task = if provider.is_strong_at(task) {
            w.task_match
        } else if task.related_tasks().iter().any(|t| provider.is_strong_at(*t)) {
            w.related_task
        } else {
            0.0
        };

        b.quality = provider.quality / 100.0 * w.quality;

        let latency = provider.reliability.avg_latency_ms as f64;
        b.speed = match requirements.max_latency_ms {
            Some(max) if max > 0 => ((max as f64 - latency) / max as f64).max(0.0) * w.speed,
            _ => provider.speed / 100.0 * w.speed,
        };

        let reference = match requirements.max_cost {
            Some(max) if max > 0.0 => max,
            _ => w.reference_cost,
        };
        b.cost = if reference > 0.0 {
            ((reference - provider.cost_per_unit) / reference).max(0.0) * w.cost
        } else {
            0.0
        };

        if !requirements.required_features.is_empty() {
            let matched = requirements
                .required_features
                .iter()
                .filter(|f| provider.has_feature(**f))
                .count();
            b.features = matched as f64 / requirements.required_features.len() as f64 * w.feature;
        }

        let mut score = b.task + b.quality + b.speed + b.cost + b.features;
        match requirements.tier {
            CallerTier::Free => {
                if provider.cost_per_unit > w.free_tier_expensive_threshold {
                    score *= w.free_tier_multiplier;
                }
            }
            CallerTier::Premium => score += w.premium_bonus,
            CallerTier::Enterprise => score += w.enterprise_bonus,
        }
        b.tier_adjusted = score;
        b.total = score * provider.reliability.uptime / 100.0;
        b
    }

    fn reason(
        &self,
        task: TaskType,
        requirements: &Requirements,
        provider: &ProviderCapability,
        b: &ScoreBreakdown,
    ) -> String {
        let mut parts = Vec::new();
        if provider.is_strong_at(task) {
            parts.push(format!("specialized for {task}"));
        } else if b.task > 0.0 {
            parts.push(format!("strong at tasks related to {task}"));
        }
        if provider.quality >= 90.0 {
            parts.push(format!("high quality ({:.0}/100)", provider.quality));
        }
        if b.speed >= self.weights.speed * 0.66 {
            parts.push(format!(
                "fast response (~{}ms)",
                provider.reliability.avg_latency_ms
            ));
        }
        if b.cost >= self.weights.cost * 0.66 {
            parts.push("cost-effective".to_string());
        }
        if !requirements.required_features.is_empty() {
            let matched = requirements
                .required_features
                .iter()
                .filter(|f| provider.has_feature(**f))
                .count();
            parts.push(format!(
                "supports {matched}/{} required features",
                requirements.required_features.len()
            ));
        }
        if parts.is_empty() {
            "best available option".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn to_result(
        &self,
        task: TaskType,
        requirements: &Requirements,
        provider: &ProviderCapability,
        breakdown: ScoreBreakdown,
    ) -> SelectionResult {
        let units = requirements
            .estimated_units
            .unwrap_or(DEFAULT_ESTIMATED_UNITS);
        let factor = (units as f64 / 10_000.0).min(2.0);
        SelectionResult {
            provider: provider.id.clone(),
            score: breakdown.total,
            reason: self.reason(task, requirements, provider, &breakdown),
            estimated_cost: provider.cost_for(units),
            estimated_latency_ms: (provider.reliability.avg_latency_ms as f64 * (1.0 + factor))
                .round() as u64,
            confidence: 100.0,
            breakdown,
        }
    }

    /// Rank every provider surviving the hard filters
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuitableProvider`] when nothing survives.
    pub fn rank(
        &self,
        task: TaskType,
        requirements: &Requirements,
        candidates: &[ProviderCapability],
        verdicts: &Verdicts,
    ) -> Result<Ranking> {
        let mut scored: Vec<SelectionResult> = candidates
            .iter()
            .filter(|p| match self.rejection(requirements, p, verdicts) {
                Some(reason) => {
                    debug!(provider = %p.id, reason = reason.as_str(), "Provider filtered out");
                    false
                }
                None => true,
            })
            .map(|p| self.to_result(task, requirements, p, self.score(task, requirements, p)))
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.provider.cmp(&b.provider))
        });

        for i in 0..scored.len() {
            let gap = scored
                .get(i + 1)
                .map_or(100.0, |next| scored[i].score - next.score);
            scored[i].confidence = (gap + 50.0).clamp(50.0, 100.0);
        }

        let mut iter = scored.into_iter();
        let best = iter.next().ok_or_else(|| Error::exhausted(None))?;
        let runners_up: Vec<SelectionResult> = iter.collect();

        info!(
            task = %task,
            provider = %best.provider,
            score = %format!("{:.2}", best.score),
            confidence = %format!("{:.1}", best.confidence),
            candidates = runners_up.len() + 1,
            reason = %best.reason,
            "Provider selected"
        );

        Ok(Ranking { best, runners_up })
    }

    /// Best provider for the requirements
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuitableProvider`] when nothing survives.
    pub fn select(
        &self,
        task: TaskType,
        requirements: &Requirements,
        candidates: &[ProviderCapability],
        verdicts: &Verdicts,
    ) -> Result<SelectionResult> {
        self.rank(task, requirements, candidates, verdicts)
            .map(|r| r.best)
    }

    /// Up to `n` choices, each selected with the previous choices excluded
    #[must_use]
    pub fn recommendations(
        &self,
        task: TaskType,
        requirements: &Requirements,
        candidates: &[ProviderCapability],
        verdicts: &Verdicts,
        n: usize,
    ) -> Vec<SelectionResult> {
        let mut requirements = requirements.clone();
        let mut picks = Vec::with_capacity(n);
        while picks.len() < n {
            match self.select(task, &requirements, candidates, verdicts) {
                Ok(pick) => {
                    requirements.exclude(pick.provider.clone());
                    picks.push(pick);
                }
                Err(_) => break,
            }
        }
        picks
    }
}
