//! Usage Tracker
//!
//! Every provider attempt lands in an append-only in-memory log. The log
//! feeds per-provider, per-task, per-caller and per-window aggregates, the
//! daily tier quotas, and the retrospective top-provider ranking. Request
//! throttling lives here too because it is keyed by the same caller ids.
//!
//! # Module Structure
//!
//! - `record` - log entries and aggregate shapes
//! - `rate_limiter` - windowed per-caller counters
//! - `tracker` - [`UsageTracker`] itself

mod rate_limiter;
mod record;
mod tracker;


pub use rate_limiter::{RateLimitDecision, RateLimitSettings, RateLimiter};
pub use record::{
    CallerUsageStats, CostAnalytics, CostTrend, ProviderPerformance, ProviderUsageStats,
    TimeWindow, UsageAttempt, UsageLimitStatus, UsageRecord,
};
pub use tracker::{TierQuota, UsageConfig, UsageTracker};
