//! Conduit Router - capability-aware provider routing
//!
//! This crate picks a backend provider for each generation request and
//! recovers when that provider is unhealthy, refuses, or fails:
//! - Analyzer: keyword signals (complexity, emotion, domain, urgency) from a prompt
//! - Token: cl100k_base token counts for request sizing
//! - Requirements: analysis + caller tier to cost/latency/quality constraints
//! - Registry: provider capability table (built-in or configured)
//! - Health: per-provider state machine fed by probes and real calls
//! - Selector: hard filters, weighted scoring, ranked results
//! - Executor: bounded fallback chain with refusal and shape classification
//! - Cache: TTL response cache with tag invalidation
//! - Usage: attempt log, analytics, quotas, and rate limiting
//! - Router: the `route` entry point tying them together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod analyzer;
pub mod cache;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod extract;
pub mod health;
pub mod registry;
pub mod requirements;
pub mod router;
pub mod selector;
pub mod task;
pub mod token;
pub mod usage;

pub use adapter::{AdapterResponse, InvokeOptions, MockAdapter, MockBehavior, ProviderAdapter, TransportError};
pub use analyzer::{analyze, Domain, RequestAnalysis, Sentiment, Urgency};
pub use cache::{CacheConfig, CacheStats, CachedResponse, ResponseCache};
pub use classify::{ClassifierChain, Classification, OutputClassifier, RefusalClassifier, ShapeClassifier};
pub use config::RouterConfig;
pub use context::{CallerTier, RouteContext};
pub use error::{Error, Result};
pub use executor::{estimate_quality, ExecutionConfig, ExecutionCoordinator, ExecutionOutcome, ExecutionRequest};
pub use extract::{extract_json, extract_json_as, JsonStrategy};
pub use health::{
    AdapterProber, HealthCheckResult, HealthConfig, HealthMonitor, HealthRecord, HealthStatus,
    HealthSummary, Prober, Verdicts,
};
pub use registry::{builtin_providers, CapabilityRegistry, Feature, ProviderCapability, ReliabilityStats};
pub use requirements::{resolve, RequirementPolicy, Requirements};
pub use router::{RouteResponse, Router};
pub use selector::{Ranking, ScoreBreakdown, ScoringWeights, SelectionResult, Selector};
pub use task::{TaskType, TokenBudget};
pub use token::{count_tokens, TokenCounter};
pub use usage::{
    CostAnalytics, CostTrend, RateLimitSettings, TimeWindow, UsageConfig, UsageRecord, UsageTracker,
};
