//! Per-caller request throttling
//!
//! Sliding (or fixed) window counters keyed by `caller:scope`. The check and
//! the increment happen under one write lock, so concurrent requests can
//! never push a key past its limit.

use crate::context::CallerTier;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

// ============================================================================
// Config
// ============================================================================

/// Rate limit configuration (deserializable from TOML)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests allowed per window per caller per scope
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Sliding window (vs. fixed window)
    #[serde(default = "default_true")]
    pub sliding: bool,
    /// Per-tier overrides of `max_requests`, keyed by tier name
    #[serde(default)]
    pub tier_overrides: HashMap<String, u32>,
}

fn default_true() -> bool {
    true
}
fn default_max_requests() -> u32 {
    100
}
fn default_window_secs() -> u64 {
    3600
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sliding: true,
            tier_overrides: HashMap::new(),
        }
    }
}

impl RateLimitSettings {
    /// Window length
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Limit for a tier
    #[must_use]
    pub fn limit_for(&self, tier: Option<CallerTier>) -> u32 {
        tier.and_then(|t| self.tier_overrides.get(t.as_str()).copied())
            .unwrap_or(self.max_requests)
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until a slot frees up (zero when allowed)
    pub retry_after: Duration,
    /// Requests counted in the current window, including this one if allowed
    pub current: u32,
}

// ============================================================================
// Limiter
// ============================================================================

#[derive(Debug, Default)]
struct Bucket {
    /// Sliding mode: one timestamp per request
    hits: VecDeque<Instant>,
    /// Fixed mode: window start and count
    window_start: Option<Instant>,
    count: u32,
}

/// In-memory windowed rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    sliding: bool,
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(window: Duration, sliding: bool) -> Self {
        Self {
            window,
            sliding,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Check and count one request for `key` in a single step
    pub async fn acquire(&self, key: &str, limit: u32) -> RateLimitDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(key.to_string()).or_default();

        if self.sliding {
            while bucket
                .hits
                .front()
                .is_some_and(|t| now.duration_since(*t) >= self.window)
            {
                bucket.hits.pop_front();
            }

            let current = bucket.hits.len() as u32;
            if current < limit {
                bucket.hits.push_back(now);
                RateLimitDecision {
                    allowed: true,
                    remaining: limit - current - 1,
                    retry_after: Duration::ZERO,
                    current: current + 1,
                }
            } else {
                let retry_after = bucket.hits.front().map_or(self.window, |oldest| {
                    self.window.saturating_sub(now.duration_since(*oldest))
                });
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    retry_after,
                    current,
                }
            }
        } else {
            let start = match bucket.window_start {
                Some(start) if now.duration_since(start) < self.window => start,
                _ => {
                    bucket.window_start = Some(now);
                    bucket.count = 0;
                    now
                }
            };

            if bucket.count < limit {
                bucket.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: limit - bucket.count,
                    retry_after: Duration::ZERO,
                    current: bucket.count,
                }
            } else {
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    retry_after: self.window.saturating_sub(now.duration_since(start)),
                    current: bucket.count,
                }
            }
        }
    }

    /// Requests currently counted for `key`
    pub async fn usage(&self, key: &str) -> u32 {
        let now = Instant::now();
        let buckets = self.buckets.read().await;
        buckets.get(key).map_or(0, |b| {
            if self.sliding {
                b.hits
                    .iter()
                    .filter(|t| now.duration_since(**t) < self.window)
                    .count() as u32
            } else if b
                .window_start
                .is_some_and(|s| now.duration_since(s) < self.window)
            {
                b.count
            } else {
                0
            }
        })
    }

    /// Forget a key
    pub async fn reset(&self, key: &str) {
        self.buckets.write().await.remove(key);
    }

    /// Drop keys with no requests inside the window; returns how many
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, b| {
            if self.sliding {
                b.hits.retain(|t| now.duration_since(*t) < self.window);
                !b.hits.is_empty()
            } else {
                b.window_start
                    .is_some_and(|s| now.duration_since(s) < self.window)
            }
        });
        before - buckets.len()
    }
}
