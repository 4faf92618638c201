//! Response cache
//!
//! Keys are the SHA-256 of `(task, tier, prompt)`. Entries carry a TTL and a
//! set of tags (`provider:<id>`, `task:<task>`, `tier:<tier>`) so that
//! disabling a provider can purge everything it produced. Only successful
//! responses are ever written.

use crate::context::CallerTier;
use crate::task::TaskType;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Entry count above which the oldest entries are evicted
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// A memoized provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Prompt that produced the response
    pub prompt: String,
    /// Response text
    pub content: String,
    /// Provider that produced it
    pub provider: String,
    /// Tokens consumed
    pub tokens_used: u64,
    /// Write time
    pub cached_at: DateTime<Utc>,
    /// Caller tier
    pub tier: CallerTier,
    /// Task type
    pub task: TaskType,
}

impl CachedResponse {
    /// Standard tags for this response
    #[must_use]
    pub fn default_tags(&self) -> Vec<String> {
        vec![
            provider_tag(&self.provider),
            format!("task:{}", self.task),
            format!("tier:{}", self.tier),
        ]
    }
}

/// Tag attached to every response a provider produced
#[must_use]
pub fn provider_tag(provider: &str) -> String {
    format!("provider:{provider}")
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries (expired ones not yet purged included)
    pub entries: usize,
    /// Lookups served
    pub hits: u64,
    /// Lookups not served
    pub misses: u64,
}

impl CacheStats {
    /// Hit percentage
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug)]
struct Entry {
    response: CachedResponse,
    tags: Vec<String>,
    inserted: Instant,
    expires_at: Instant,
}

/// Concurrent TTL cache of provider responses
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: DashMap<String, Entry>,
    tags: DashMap<String, HashSet<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResponseCache {
    /// Create a cache
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            tags: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stable signature of a request
    #[must_use]
    pub fn key(task: TaskType, tier: CallerTier, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(task.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(tier.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(prompt.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Cached response for the request, if present and fresh
    pub fn get(&self, task: TaskType, tier: CallerTier, prompt: &str) -> Option<CachedResponse> {
        if !self.config.enabled {
            return None;
        }
        let key = Self::key(task, tier, prompt);
        let now = Instant::now();

        let (found, expired) = match self.entries.get(&key) {
            Some(entry) if entry.expires_at > now => (Some(entry.response.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            self.remove(&key);
        }

        match found {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(task = %task, tier = %tier, provider = %response.provider, "Cache hit");
                Some(response)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(task = %task, tier = %tier, expired, "Cache miss");
                None
            }
        }
    }

    /// Store a response with the configured TTL and its standard tags
    pub fn put(&self, response: CachedResponse) {
        let tags = response.default_tags();
        self.put_with(response, self.config.ttl(), tags);
    }

    /// Store a response with an explicit TTL and tag set
    pub fn put_with(&self, response: CachedResponse, ttl: Duration, tags: Vec<String>) {
        if !self.config.enabled {
            return;
        }
        let key = Self::key(response.task, response.tier, &response.prompt);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.make_room();
        }
        // replacing an entry must not leave stale tag links
        self.remove(&key);

        for tag in &tags {
            self.tags.entry(tag.clone()).or_default().insert(key.clone());
        }
        let now = Instant::now();
        self.entries.insert(
            key,
            Entry {
                response,
                tags,
                inserted: now,
                expires_at: now + ttl,
            },
        );
    }

    fn make_room(&self) {
        self.purge_expired();
        while self.config.max_entries > 0 && self.entries.len() >= self.config.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.inserted)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    debug!(key = %key, "Evicting oldest cache entry");
                    self.remove(&key);
                }
                None => break,
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        let Some((_, entry)) = self.entries.remove(key) else {
            return false;
        };
        for tag in &entry.tags {
            if let Some(mut keys) = self.tags.get_mut(tag) {
                keys.remove(key);
            }
            self.tags.remove_if(tag, |_, keys| keys.is_empty());
        }
        true
    }

    /// Drop every entry carrying `tag`; returns how many
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let Some((_, keys)) = self.tags.remove(tag) else {
            return 0;
        };
        let removed = keys.iter().filter(|k| self.remove(k)).count();
        debug!(tag = %tag, removed, "Cache tag invalidated");
        removed
    }

    /// Drop every entry carrying any of `tags`; returns how many
    pub fn invalidate_tags(&self, tags: &[String]) -> usize {
        tags.iter().map(|t| self.invalidate_tag(t)).sum()
    }

    /// Drop expired entries; returns how many
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();
        expired.iter().filter(|k| self.remove(k)).count()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.clear();
        self.tags.clear();
    }

    /// Entry count
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(prompt: &str, provider: &str) -> CachedResponse {
        CachedResponse {
            prompt: prompt.to_string(),
            content: format!("answer to {prompt}"),
            provider: provider.to_string(),
            tokens_used: 42,
            cached_at: Utc::now(),
            tier: CallerTier::Free,
            task: TaskType::Research,
        }
    }

    #[test]
    fn test_key_depends_on_task_tier_and_prompt() {
        let base = ResponseCache::key(TaskType::Research, CallerTier::Free, "hello");
        assert_eq!(base.len(), 64);
        assert_eq!(base, ResponseCache::key(TaskType::Research, CallerTier::Free, "hello"));
        assert_ne!(base, ResponseCache::key(TaskType::Roadmap, CallerTier::Free, "hello"));
        assert_ne!(base, ResponseCache::key(TaskType::Research, CallerTier::Premium, "hello"));
        assert_ne!(base, ResponseCache::key(TaskType::Research, CallerTier::Free, "hello!"));
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ResponseCache::default();
        assert!(cache.get(TaskType::Research, CallerTier::Free, "q").is_none());

        cache.put(response("q", "p1"));
        let hit = cache.get(TaskType::Research, CallerTier::Free, "q").unwrap();
        assert_eq!(hit.content, "answer to q");
        assert!(cache.get(TaskType::Research, CallerTier::Premium, "q").is_none());

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 1, misses: 2 });
        assert!((stats.hit_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = ResponseCache::default();
        let r = response("q", "p1");
        let tags = r.default_tags();
        cache.put_with(r, Duration::ZERO, tags);
        assert!(cache.get(TaskType::Research, CallerTier::Free, "q").is_none());
        assert!(cache.is_empty());

        cache.put_with(response("a", "p1"), Duration::ZERO, Vec::new());
        cache.put(response("b", "p1"));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_provider_tag() {
        let cache = ResponseCache::default();
        cache.put(response("a", "p1"));
        cache.put(response("b", "p1"));
        cache.put(response("c", "p2"));

        assert_eq!(cache.invalidate_tag(&provider_tag("p1")), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(TaskType::Research, CallerTier::Free, "c").is_some());
        assert_eq!(cache.invalidate_tag(&provider_tag("p1")), 0);

        assert_eq!(cache.invalidate_tags(&["task:research".to_string()]), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite_moves_tags() {
        let cache = ResponseCache::default();
        cache.put(response("a", "p1"));
        cache.put(response("a", "p2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_tag(&provider_tag("p1")), 0);
        assert_eq!(cache.invalidate_tag(&provider_tag("p2")), 1);
    }

    #[test]
    fn test_capacity_evicts_expired_then_oldest() {
        let cache = ResponseCache::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        cache.put(response("first", "p1"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put(response("second", "p1"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put(response("third", "p1"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(TaskType::Research, CallerTier::Free, "first").is_none());
        assert!(cache.get(TaskType::Research, CallerTier::Free, "third").is_some());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ResponseCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        cache.put(response("q", "p1"));
        assert!(cache.is_empty());
        assert!(cache.get(TaskType::Research, CallerTier::Free, "q").is_none());
    }
}
