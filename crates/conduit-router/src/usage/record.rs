//! Usage records and aggregate types

use crate::task::TaskType;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One provider invocation, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Record ID
    pub id: u64,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    /// Provider invoked
    pub provider: String,
    /// Task type
    pub task: TaskType,
    /// Caller
    pub caller_id: String,
    /// Units consumed
    pub units: u64,
    /// Cost (USD)
    pub cost: f64,
    /// Attempt duration
    pub duration_ms: u64,
    /// Output accepted
    pub success: bool,
    /// Attempt happened after an earlier provider failed
    pub used_fallback: bool,
    /// First provider that failed in this request
    pub original_provider: Option<String>,
    /// Quality estimate (0-10), 0 on failure
    pub quality: f64,
    /// Request complexity score
    pub complexity: u8,
    /// Request emotional-content score
    pub emotional: u8,
    /// Selector justification
    pub selection_reason: String,
    /// Error kind on failure
    pub error_kind: Option<String>,
}

/// Input to [`UsageTracker::record_attempt`](super::UsageTracker::record_attempt)
#[derive(Debug, Clone, PartialEq)]
pub struct UsageAttempt {
    /// Provider invoked
    pub provider: String,
    /// Task type
    pub task: TaskType,
    /// Caller
    pub caller_id: String,
    /// Units consumed
    pub units: u64,
    /// Cost (USD)
    pub cost: f64,
    /// Attempt duration
    pub duration_ms: u64,
    /// Output accepted
    pub success: bool,
    /// First provider that failed in this request, when this is a fallback
    pub original_provider: Option<String>,
    /// Quality estimate (0-10)
    pub quality: f64,
    /// Request complexity score
    pub complexity: u8,
    /// Request emotional-content score
    pub emotional: u8,
    /// Selector justification
    pub selection_reason: String,
    /// Error kind on failure
    pub error_kind: Option<String>,
}

impl UsageAttempt {
    /// Empty attempt for `provider`; callers fill in the outcome
    #[must_use]
    pub fn new(provider: impl Into<String>, task: TaskType, caller_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            task,
            caller_id: caller_id.into(),
            units: 0,
            cost: 0.0,
            duration_ms: 0,
            success: false,
            original_provider: None,
            quality: 0.0,
            complexity: 0,
            emotional: 0,
            selection_reason: String::new(),
            error_kind: None,
        }
    }
}

// ============================================================================
// Windows
// ============================================================================

/// Aggregation window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Last hour
    Hour,
    /// Last 24 hours
    #[default]
    Day,
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
}

impl TimeWindow {
    /// Window length
    #[must_use]
    pub fn duration(&self) -> ChronoDuration {
        match self {
            Self::Hour => ChronoDuration::hours(1),
            Self::Day => ChronoDuration::days(1),
            Self::Week => ChronoDuration::days(7),
            Self::Month => ChronoDuration::days(30),
        }
    }

    /// Start of the window ending at `now`
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Per-provider performance over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsageStats {
    /// Provider id
    pub provider: String,
    /// Attempts
    pub requests: u64,
    /// Successful attempts
    pub successes: u64,
    /// Success percentage
    pub success_rate: f64,
    /// Average attempt duration
    pub avg_duration_ms: f64,
    /// Average quality estimate (failed attempts count as 0)
    pub avg_quality: f64,
    /// Total cost (USD)
    pub total_cost: f64,
    /// Total units
    pub total_units: u64,
    /// Percentage of attempts that were fallbacks
    pub fallback_rate: f64,
}

/// Direction of spend relative to the previous window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTrend {
    /// More than 110% of the previous window
    Increasing,
    /// Within 90-110% of the previous window
    #[default]
    Stable,
    /// Less than 90% of the previous window
    Decreasing,
}

/// Spend breakdown over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalytics {
    /// Window analysed
    pub window: TimeWindow,
    /// Total cost (USD)
    pub total_cost: f64,
    /// Attempts
    pub requests: u64,
    /// Mean cost per attempt
    pub average_cost_per_request: f64,
    /// Cost by provider
    pub by_provider: BTreeMap<String, f64>,
    /// Cost by task type
    pub by_task: BTreeMap<TaskType, f64>,
    /// Cost by caller
    pub by_caller: BTreeMap<String, f64>,
    /// Total cost of the preceding window
    pub previous_total_cost: f64,
    /// Trend vs. the preceding window
    pub trend: CostTrend,
}

/// Per-caller activity over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerUsageStats {
    /// Caller id
    pub caller_id: String,
    /// Attempts
    pub requests: u64,
    /// Successful attempts
    pub successes: u64,
    /// Success percentage
    pub success_rate: f64,
    /// Average attempt duration
    pub avg_duration_ms: f64,
    /// Total cost (USD)
    pub total_cost: f64,
    /// Total units
    pub total_units: u64,
    /// Attempts by provider
    pub by_provider: BTreeMap<String, u64>,
    /// Attempts by task
    pub by_task: BTreeMap<TaskType, u64>,
    /// Most used successful provider
    pub favorite_provider: Option<String>,
}

/// Daily quota status for a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimitStatus {
    /// Both quotas have headroom
    pub within_limits: bool,
    /// Rough requests left today (cost headroom counted at $0.01 each)
    pub remaining: u64,
    /// Attempts since UTC midnight
    pub requests_today: u64,
    /// Daily attempt quota
    pub request_limit: u64,
    /// Spend since UTC midnight
    pub cost_today: f64,
    /// Daily spend quota
    pub cost_limit: f64,
    /// Next UTC midnight
    pub resets_at: DateTime<Utc>,
}

/// Retrospective ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPerformance {
    /// Provider id
    pub provider: String,
    /// Composite score
    pub score: f64,
    /// Success percentage
    pub success_rate: f64,
    /// Average quality estimate
    pub avg_quality: f64,
    /// Average attempt duration
    pub avg_duration_ms: f64,
    /// Total cost (USD)
    pub total_cost: f64,
    /// Attempts
    pub requests: u64,
}
