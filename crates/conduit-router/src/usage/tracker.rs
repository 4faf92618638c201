//! Append-only usage log with rolling aggregates

use super::rate_limiter::{RateLimitDecision, RateLimitSettings, RateLimiter};
use super::record::{
    CallerUsageStats, CostAnalytics, CostTrend, ProviderPerformance, ProviderUsageStats,
    TimeWindow, UsageAttempt, UsageLimitStatus, UsageRecord,
};
use crate::context::CallerTier;
use crate::task::TaskType;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Window used by [`UsageTracker::top_providers_for_task`]
const TOP_PROVIDERS_DAYS: i64 = 7;

/// Cost headroom counted as one request when estimating remaining quota
const REMAINING_COST_PER_REQUEST: f64 = 0.01;

// ============================================================================
// Config
// ============================================================================

/// Daily quota for one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierQuota {
    /// Attempts per UTC day
    pub daily_requests: u64,
    /// Spend per UTC day (USD)
    pub daily_cost: f64,
}

/// Usage tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Records kept in memory before the oldest are dropped
    pub max_records: usize,
    /// Retention used by [`UsageTracker::cleanup_expired`]
    pub retention_days: u32,
    /// Free-tier quota
    pub free: TierQuota,
    /// Premium-tier quota
    pub premium: TierQuota,
    /// Enterprise-tier quota
    pub enterprise: TierQuota,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            retention_days: 30,
            free: TierQuota {
                daily_requests: 100,
                daily_cost: 5.0,
            },
            premium: TierQuota {
                daily_requests: 1000,
                daily_cost: 50.0,
            },
            enterprise: TierQuota {
                daily_requests: 10_000,
                daily_cost: 500.0,
            },
        }
    }
}

impl UsageConfig {
    /// Quota for a tier
    #[must_use]
    pub fn quota(&self, tier: CallerTier) -> TierQuota {
        match tier {
            CallerTier::Free => self.free,
            CallerTier::Premium => self.premium,
            CallerTier::Enterprise => self.enterprise,
        }
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Usage log, aggregates, and rate limiting
#[derive(Debug)]
pub struct UsageTracker {
    config: UsageConfig,
    rate_limit: RateLimitSettings,
    limiter: RateLimiter,
    records: RwLock<Vec<UsageRecord>>,
    next_id: AtomicU64,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(UsageConfig::default(), RateLimitSettings::default())
    }
}

impl UsageTracker {
    /// Create a tracker
    #[must_use]
    pub fn new(config: UsageConfig, rate_limit: RateLimitSettings) -> Self {
        let limiter = RateLimiter::new(rate_limit.window(), rate_limit.sliding);
        Self {
            config,
            rate_limit,
            limiter,
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &UsageConfig {
        &self.config
    }

    /// Append one attempt to the log
    pub async fn record_attempt(&self, attempt: UsageAttempt) -> UsageRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = UsageRecord {
            id,
            timestamp: Utc::now(),
            used_fallback: attempt.original_provider.is_some(),
            provider: attempt.provider,
            task: attempt.task,
            caller_id: attempt.caller_id,
            units: attempt.units,
            cost: attempt.cost,
            duration_ms: attempt.duration_ms,
            success: attempt.success,
            original_provider: attempt.original_provider,
            quality: attempt.quality,
            complexity: attempt.complexity,
            emotional: attempt.emotional,
            selection_reason: attempt.selection_reason,
            error_kind: attempt.error_kind,
        };

        debug!(
            id = record.id,
            provider = %record.provider,
            task = %record.task,
            success = record.success,
            fallback = record.used_fallback,
            cost = record.cost,
            "Usage recorded"
        );

        let mut records = self.records.write().await;
        records.push(record.clone());
        if records.len() > self.config.max_records {
            let drain_count = records.len() - self.config.max_records;
            records.drain(0..drain_count);
        }

        record
    }

    /// Check and count one request against the default limit
    pub async fn check_rate_limit(&self, caller_id: &str, scope: &str) -> RateLimitDecision {
        self.check_rate_limit_for(caller_id, scope, None).await
    }

    /// Check and count one request against the limit for `tier`
    pub async fn check_rate_limit_for(
        &self,
        caller_id: &str,
        scope: &str,
        tier: Option<CallerTier>,
    ) -> RateLimitDecision {
        if !self.rate_limit.enabled {
            return RateLimitDecision {
                allowed: true,
                remaining: u32::MAX,
                retry_after: Duration::ZERO,
                current: 0,
            };
        }

        let limit = self.rate_limit.limit_for(tier);
        let key = format!("{caller_id}:{scope}");
        let decision = self.limiter.acquire(&key, limit).await;
        if !decision.allowed {
            warn!(
                caller = %caller_id,
                scope = %scope,
                limit,
                retry_after_secs = decision.retry_after.as_secs(),
                "Rate limit exceeded"
            );
        }
        decision
    }

    // ------------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------------

    /// Performance of one provider, optionally for one task
    pub async fn provider_stats(
        &self,
        provider: &str,
        task: Option<TaskType>,
        window: TimeWindow,
    ) -> ProviderUsageStats {
        let since = window.since(Utc::now());
        let records = self.records.read().await;
        let matching: Vec<&UsageRecord> = records
            .iter()
            .filter(|r| r.timestamp >= since && r.provider == provider)
            .filter(|r| task.is_none_or(|t| r.task == t))
            .collect();

        let mut stats = ProviderUsageStats {
            provider: provider.to_string(),
            ..Default::default()
        };
        if matching.is_empty() {
            return stats;
        }

        let n = matching.len() as f64;
        stats.requests = matching.len() as u64;
        stats.successes = matching.iter().filter(|r| r.success).count() as u64;
        stats.success_rate = stats.successes as f64 / n * 100.0;
        stats.avg_duration_ms = matching.iter().map(|r| r.duration_ms as f64).sum::<f64>() / n;
        stats.avg_quality = matching.iter().map(|r| r.quality).sum::<f64>() / n;
        stats.total_cost = matching.iter().map(|r| r.cost).sum();
        stats.total_units = matching.iter().map(|r| r.units).sum();
        stats.fallback_rate = matching.iter().filter(|r| r.used_fallback).count() as f64 / n * 100.0;
        stats
    }

    /// Spend over `window`, compared with the window before it
    pub async fn cost_analytics(&self, window: TimeWindow) -> CostAnalytics {
        let now = Utc::now();
        let since = window.since(now);
        let previous_since = since - window.duration();
        let records = self.records.read().await;

        let mut analytics = CostAnalytics {
            window,
            ..Default::default()
        };

        for record in records.iter() {
            if record.timestamp >= since {
                analytics.total_cost += record.cost;
                analytics.requests += 1;
                *analytics
                    .by_provider
                    .entry(record.provider.clone())
                    .or_default() += record.cost;
                *analytics.by_task.entry(record.task).or_default() += record.cost;
                if !record.caller_id.is_empty() {
                    *analytics
                        .by_caller
                        .entry(record.caller_id.clone())
                        .or_default() += record.cost;
                }
            } else if record.timestamp >= previous_since {
                analytics.previous_total_cost += record.cost;
            }
        }

        if analytics.requests > 0 {
            analytics.average_cost_per_request = analytics.total_cost / analytics.requests as f64;
        }
        analytics.trend = if analytics.total_cost > analytics.previous_total_cost * 1.1 {
            CostTrend::Increasing
        } else if analytics.total_cost < analytics.previous_total_cost * 0.9 {
            CostTrend::Decreasing
        } else {
            CostTrend::Stable
        };
        analytics
    }

    /// Activity of one caller over `window`
    pub async fn caller_stats(&self, caller_id: &str, window: TimeWindow) -> CallerUsageStats {
        let since = window.since(Utc::now());
        let records = self.records.read().await;

        let mut stats = CallerUsageStats {
            caller_id: caller_id.to_string(),
            ..Default::default()
        };
        let mut total_duration = 0u64;
        let mut successful_by_provider: BTreeMap<&str, u64> = BTreeMap::new();

        for record in records
            .iter()
            .filter(|r| r.timestamp >= since && r.caller_id == caller_id)
        {
            stats.requests += 1;
            stats.total_cost += record.cost;
            stats.total_units += record.units;
            total_duration += record.duration_ms;
            *stats.by_provider.entry(record.provider.clone()).or_default() += 1;
            *stats.by_task.entry(record.task).or_default() += 1;
            if record.success {
                stats.successes += 1;
                *successful_by_provider.entry(record.provider.as_str()).or_default() += 1;
            }
        }

        if stats.requests > 0 {
            stats.success_rate = stats.successes as f64 / stats.requests as f64 * 100.0;
            stats.avg_duration_ms = total_duration as f64 / stats.requests as f64;
        }
        // BTreeMap order makes the tie-break alphabetical
        stats.favorite_provider = successful_by_provider
            .into_iter()
            .fold(None, |best: Option<(&str, u64)>, (p, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((p, n)),
            })
            .map(|(p, _)| p.to_string());
        stats
    }

    /// Daily quota status for a caller
    pub async fn check_usage_limits(&self, caller_id: &str, tier: CallerTier) -> UsageLimitStatus {
        let now = Utc::now();
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let quota = self.config.quota(tier);

        let records = self.records.read().await;
        let (requests_today, cost_today) = records
            .iter()
            .filter(|r| r.timestamp >= midnight && r.caller_id == caller_id)
            .fold((0u64, 0.0f64), |(n, c), r| (n + 1, c + r.cost));

        let by_requests = quota.daily_requests.saturating_sub(requests_today);
        let by_cost = ((quota.daily_cost - cost_today) / REMAINING_COST_PER_REQUEST)
            .floor()
            .max(0.0) as u64;

        UsageLimitStatus {
            within_limits: requests_today < quota.daily_requests && cost_today < quota.daily_cost,
            remaining: by_requests.min(by_cost),
            requests_today,
            request_limit: quota.daily_requests,
            cost_today,
            cost_limit: quota.daily_cost,
            resets_at: midnight + ChronoDuration::days(1),
        }
    }

    /// Best providers for a task over the last week, by composite score
    ///
    /// score = success_rate * 0.4 + avg_quality * 0.3 + max(0, 100 - avg_ms / 10) * 0.3
    pub async fn top_providers_for_task(&self, task: TaskType, limit: usize) -> Vec<ProviderPerformance> {
        let since = Utc::now() - ChronoDuration::days(TOP_PROVIDERS_DAYS);
        let records = self.records.read().await;

        #[derive(Default)]
        struct Acc {
            requests: u64,
            successes: u64,
            duration: u64,
            quality: f64,
            cost: f64,
        }

        let mut by_provider: HashMap<&str, Acc> = HashMap::new();
        for record in records
            .iter()
            .filter(|r| r.timestamp >= since && r.task == task)
        {
            let acc = by_provider.entry(record.provider.as_str()).or_default();
            acc.requests += 1;
            acc.duration += record.duration_ms;
            acc.quality += record.quality;
            acc.cost += record.cost;
            if record.success {
                acc.successes += 1;
            }
        }

        let mut ranked: Vec<ProviderPerformance> = by_provider
            .into_iter()
            .map(|(provider, acc)| {
                let n = acc.requests as f64;
                let success_rate = acc.successes as f64 / n * 100.0;
                let avg_quality = acc.quality / n;
                let avg_duration_ms = acc.duration as f64 / n;
                let speed = (100.0 - avg_duration_ms / 10.0).max(0.0);
                ProviderPerformance {
                    provider: provider.to_string(),
                    score: success_rate * 0.4 + avg_quality * 0.3 + speed * 0.3,
                    success_rate,
                    avg_quality,
                    avg_duration_ms,
                    total_cost: acc.cost,
                    requests: acc.requests,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.provider.cmp(&b.provider))
        });
        ranked.truncate(limit);
        ranked
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Most recent `limit` records, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<UsageRecord> {
        let records = self.records.read().await;
        let start = records.len().saturating_sub(limit);
        records[start..].to_vec()
    }

    /// Every record in the log
    pub async fn records(&self) -> Vec<UsageRecord> {
        self.records.read().await.clone()
    }

    /// Number of records in the log
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Replace the log, e.g. with records loaded from external storage
    pub async fn restore(&self, mut restored: Vec<UsageRecord>) {
        restored.sort_by_key(|r| r.timestamp);
        let max_id = restored.iter().map(|r| r.id).max().unwrap_or(0);
        self.next_id.fetch_max(max_id + 1, Ordering::SeqCst);
        *self.records.write().await = restored;
    }

    /// Drop records older than `retention`; returns how many
    pub async fn cleanup(&self, retention: ChronoDuration) -> usize {
        let cutoff: DateTime<Utc> = Utc::now() - retention;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff);
        let removed = before - records.len();
        drop(records);

        let idle_keys = self.limiter.cleanup().await;
        debug!(removed, idle_keys, "Usage log cleaned up");
        removed
    }

    /// [`cleanup`](Self::cleanup) with the configured retention
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup(ChronoDuration::days(i64::from(self.config.retention_days)))
            .await
    }
}
