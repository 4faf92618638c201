//! Health Monitor
//!
//! Maintains a [`HealthRecord`] per provider from lightweight probes and real
//! call outcomes, and exposes the include/exclude verdict the selector reads.
//!
//! State machine per provider: `unknown -> healthy <-> degraded <-> down`.
//! - A success resets the consecutive-failure counter and moves one step
//!   toward healthy (`unknown` goes straight to healthy).
//! - A failure increments the counter; the provider goes down once the
//!   counter reaches `failure_threshold`, the rolling error rate exceeds
//!   `error_rate_threshold`, or the rolling average latency exceeds
//!   `latency_ceiling_ms`. Otherwise it is degraded.
//!
//! Records stay fresh for `ttl_secs`. A missing or stale record is probed
//! synchronously before the selection that needs it. Probe errors never
//! escape; they only degrade the record.

mod prober;


pub use prober::{AdapterProber, Prober, HEALTH_CHECK_PROMPT};

#[cfg(test)]
pub use prober::MockProber;

use crate::registry::{CapabilityRegistry, ReliabilityStats};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Include/exclude decision per provider id (`true` = eligible)
pub type Verdicts = HashMap<String, bool>;

// ============================================================================
// Configuration
// ============================================================================

/// Health monitor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures that mark a provider down
    pub failure_threshold: u32,
    /// Rolling error rate (percent) above which a provider is down
    pub error_rate_threshold: f64,
    /// Samples required before the error-rate rule applies
    pub error_rate_min_samples: usize,
    /// Rolling average latency above which a provider is down
    pub latency_ceiling_ms: u64,
    /// How long a record stays fresh
    pub ttl_secs: u64,
    /// Rolling window size in samples
    pub window_size: usize,
    /// Samples required before registry reliability is refreshed
    pub min_samples: usize,
    /// Bound on a single probe
    pub probe_timeout_ms: u64,
    /// Probe missing or stale records before selection
    pub probe_on_miss: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            error_rate_threshold: 50.0,
            error_rate_min_samples: 5,
            latency_ceiling_ms: 10_000,
            ttl_secs: 300,
            window_size: 20,
            min_samples: 10,
            probe_timeout_ms: 10_000,
            probe_on_miss: true,
        }
    }
}

impl HealthConfig {
    /// Freshness bound
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Probe bound
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

// ============================================================================
// Health Record
// ============================================================================

/// Provider health status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never observed
    #[default]
    Unknown,
    /// Recent observations succeeded
    Healthy,
    /// Some recent failures, still eligible
    Degraded,
    /// Not eligible for selection
    Down,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    success: bool,
    latency_ms: u64,
}

/// Rolling health state of one provider
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    /// Provider id
    pub provider: String,
    /// Current status
    pub status: HealthStatus,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Failure percentage over the rolling window
    pub error_rate: f64,
    /// Average latency over the rolling window
    pub avg_latency_ms: u64,
    /// When the record was last updated
    pub last_checked: Option<DateTime<Utc>>,
    /// Most recent failure message
    pub last_error: Option<String>,
    /// Observations recorded since creation
    pub total_checks: u64,
    #[serde(skip)]
    samples: VecDeque<Sample>,
    #[serde(skip)]
    checked_at: Option<Instant>,
}

impl HealthRecord {
    fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            status: HealthStatus::Unknown,
            consecutive_failures: 0,
            error_rate: 0.0,
            avg_latency_ms: 0,
            last_checked: None,
            last_error: None,
            total_checks: 0,
            samples: VecDeque::new(),
            checked_at: None,
        }
    }

    /// Whether the selector may choose this provider
    #[must_use]
    pub fn is_included(&self) -> bool {
        self.status != HealthStatus::Down
    }

    /// Number of samples in the rolling window
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.checked_at.is_some_and(|at| at.elapsed() < ttl)
    }

    fn push_sample(&mut self, sample: Sample, window: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > window.max(1) {
            self.samples.pop_front();
        }

        let n = self.samples.len() as f64;
        let failures = self.samples.iter().filter(|s| !s.success).count() as f64;
        self.error_rate = failures / n * 100.0;
        self.avg_latency_ms =
            (self.samples.iter().map(|s| s.latency_ms).sum::<u64>() as f64 / n).round() as u64;
    }

    fn apply(&mut self, outcome: &Outcome, config: &HealthConfig) {
        self.push_sample(
            Sample {
                success: outcome.success,
                latency_ms: outcome.latency_ms,
            },
            config.window_size,
        );
        self.total_checks += 1;
        self.last_checked = Some(Utc::now());
        self.checked_at = Some(Instant::now());

        if outcome.success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.last_error.clone_from(&outcome.error);
        }

        // Rolling rules hold regardless of the latest outcome
        let rate_exceeded = self.samples.len() >= config.error_rate_min_samples
            && self.error_rate > config.error_rate_threshold;
        let too_slow = self.avg_latency_ms > config.latency_ceiling_ms;

        self.status = if rate_exceeded || too_slow {
            HealthStatus::Down
        } else if outcome.success {
            match self.status {
                HealthStatus::Down => HealthStatus::Degraded,
                HealthStatus::Unknown | HealthStatus::Degraded | HealthStatus::Healthy => {
                    HealthStatus::Healthy
                }
            }
        } else if self.consecutive_failures >= config.failure_threshold {
            HealthStatus::Down
        } else {
            HealthStatus::Degraded
        };
    }

    fn reliability(&self) -> ReliabilityStats {
        ReliabilityStats {
            uptime: 100.0 - self.error_rate,
            avg_latency_ms: self.avg_latency_ms,
            error_rate: self.error_rate,
        }
    }
}

struct Outcome {
    success: bool,
    latency_ms: u64,
    error: Option<String>,
}

// ============================================================================
// Reports
// ============================================================================

/// Result of probing one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    /// Provider id
    pub provider: String,
    /// Status after the probe
    pub status: HealthStatus,
    /// Probe latency
    pub latency_ms: u64,
    /// Probe error, if any
    pub error: Option<String>,
}

/// Aggregate health across providers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthSummary {
    /// Providers with a record
    pub total: usize,
    /// Healthy count
    pub healthy: usize,
    /// Degraded count
    pub degraded: usize,
    /// Down count
    pub down: usize,
    /// Unknown count
    pub unknown: usize,
    /// Mean of per-provider average latency
    pub avg_latency_ms: u64,
    /// Percentage of providers currently healthy
    pub overall_uptime: f64,
}

// ============================================================================
// Monitor
// ============================================================================

/// Per-provider health tracker
pub struct HealthMonitor {
    config: HealthConfig,
    records: DashMap<String, HealthRecord>,
    registry: Arc<CapabilityRegistry>,
    prober: Arc<dyn Prober>,
}

impl HealthMonitor {
    /// Create a monitor
    #[must_use]
    pub fn new(
        config: HealthConfig,
        registry: Arc<CapabilityRegistry>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            config,
            records: DashMap::new(),
            registry,
            prober,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Current status of a provider
    #[must_use]
    pub fn status(&self, provider: &str) -> HealthStatus {
        self.records
            .get(provider)
            .map_or(HealthStatus::Unknown, |r| r.status)
    }

    /// Copy of a provider's record
    #[must_use]
    pub fn record(&self, provider: &str) -> Option<HealthRecord> {
        self.records.get(provider).map(|r| r.clone())
    }

    /// Whether a provider is eligible, from cached state only
    #[must_use]
    pub fn is_included(&self, provider: &str) -> bool {
        self.records.get(provider).is_none_or(|r| r.is_included())
    }

    /// Verdicts for `providers`, probing missing or stale records first
    #[instrument(skip(self, providers), fields(count = providers.len()))]
    pub async fn verdicts(&self, providers: &[String]) -> Verdicts {
        if self.config.probe_on_miss {
            let ttl = self.config.ttl();
            let stale: Vec<String> = providers
                .iter()
                .filter(|id| !self.records.get(*id).is_some_and(|r| r.is_fresh(ttl)))
                .cloned()
                .collect();

            if !stale.is_empty() {
                debug!(stale = stale.len(), "Probing stale health records");
                join_all(stale.iter().map(|id| self.probe(id))).await;
            }
        }

        providers
            .iter()
            .map(|id| (id.clone(), self.is_included(id)))
            .collect()
    }

    /// Record the outcome of a real call or probe
    pub fn record_outcome(
        &self,
        provider: &str,
        success: bool,
        latency_ms: u64,
        error: Option<String>,
    ) -> HealthStatus {
        self.apply(
            provider,
            Outcome {
                success,
                latency_ms,
                error,
            },
        )
    }

    fn apply(&self, provider: &str, outcome: Outcome) -> HealthStatus {
        let (before, after, reliability) = {
            let mut record = self
                .records
                .entry(provider.to_string())
                .or_insert_with(|| HealthRecord::new(provider));
            let before = record.status;
            record.apply(&outcome, &self.config);
            let reliability = (record.sample_count() >= self.config.min_samples)
                .then(|| record.reliability());
            (before, record.status, reliability)
        };

        if before != after {
            match after {
                HealthStatus::Down => warn!(
                    provider = %provider,
                    from = %before,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "Provider marked down"
                ),
                _ => info!(provider = %provider, from = %before, to = %after, "Provider health changed"),
            }
        }

        if let Some(stats) = reliability {
            self.registry.refresh_reliability(provider, stats);
        }

        after
    }

    async fn probe(&self, provider: &str) -> HealthCheckResult {
        let outcome = match self.registry.get(provider) {
            Some(capability) => {
                let started = Instant::now();
                let result =
                    tokio::time::timeout(self.config.probe_timeout(), self.prober.probe(&capability))
                        .await;
                let elapsed = started.elapsed().as_millis() as u64;
                match result {
                    Ok(Ok(latency_ms)) => Outcome {
                        success: true,
                        latency_ms,
                        error: None,
                    },
                    Ok(Err(e)) => Outcome {
                        success: false,
                        latency_ms: elapsed,
                        error: Some(e),
                    },
                    Err(_) => Outcome {
                        success: false,
                        latency_ms: elapsed,
                        error: Some(format!(
                            "probe timed out after {}ms",
                            self.config.probe_timeout_ms
                        )),
                    },
                }
            }
            None => Outcome {
                success: false,
                latency_ms: 0,
                error: Some("provider not registered".to_string()),
            },
        };

        debug!(
            provider = %provider,
            success = outcome.success,
            latency_ms = outcome.latency_ms,
            "Health probe finished"
        );

        let latency_ms = outcome.latency_ms;
        let error = outcome.error.clone();
        let status = self.apply(provider, outcome);
        HealthCheckResult {
            provider: provider.to_string(),
            status,
            latency_ms,
            error,
        }
    }

    /// Probe every active provider concurrently
    #[instrument(skip(self))]
    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        let ids: Vec<String> = self
            .registry
            .all_active()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let results = join_all(ids.iter().map(|id| self.probe(id))).await;

        let down = results
            .iter()
            .filter(|r| r.status == HealthStatus::Down)
            .count();
        info!(checked = results.len(), down, "Health checks complete");
        results
    }

    /// Run [`run_health_checks`](Self::run_health_checks) every `interval` until cancelled
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Periodic health checks stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_health_checks().await;
                    }
                }
            }
        })
    }

    /// Aggregate view over all records
    #[must_use]
    pub fn summary(&self) -> HealthSummary {
        let mut summary = HealthSummary::default();
        let mut latency_total = 0u64;
        let mut latency_count = 0u64;

        for record in &self.records {
            summary.total += 1;
            match record.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Down => summary.down += 1,
                HealthStatus::Unknown => summary.unknown += 1,
            }
            if record.sample_count() > 0 {
                latency_total += record.avg_latency_ms;
                latency_count += 1;
            }
        }

        if latency_count > 0 {
            summary.avg_latency_ms = latency_total / latency_count;
        }
        if summary.total > 0 {
            summary.overall_uptime = summary.healthy as f64 / summary.total as f64 * 100.0;
        }
        summary
    }

    /// All records, ordered by provider id
    #[must_use]
    pub fn snapshot(&self) -> Vec<HealthRecord> {
        let mut records: Vec<HealthRecord> = self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        records
    }
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}
