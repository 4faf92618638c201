//! Router facade
//!
//! The caller-facing entry point. [`Router::route`] runs the whole pipeline:
//!
//! 1. cache lookup (a hit returns immediately)
//! 2. rate-limit check (a denial returns before any provider is invoked)
//! 3. context analysis, joined with a health prefetch
//! 4. requirement resolution
//! 5. the fallback chain; an internal failure or panic in it gets one
//!    attempt on the emergency provider
//! 6. cache write on success
//!
//! Components are constructed once and shared through `Arc`, so several
//! routers (or background health checks) can observe the same state.

use crate::adapter::ProviderAdapter;
use crate::analyzer::{analyze, RequestAnalysis};
use crate::cache::{provider_tag, CachedResponse, ResponseCache};
use crate::config::RouterConfig;
use crate::context::{CallerTier, RouteContext};
use crate::error::{Error, Result};
use crate::executor::{ExecutionCoordinator, ExecutionOutcome, ExecutionRequest};
use crate::health::{AdapterProber, HealthMonitor, Prober, Verdicts};
use crate::registry::CapabilityRegistry;
use crate::requirements::{resolve, Requirements};
use crate::selector::{Ranking, SelectionResult, Selector};
use crate::task::TaskType;
use crate::usage::UsageTracker;
use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of a routed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// Generated content
    pub content: String,
    /// Provider that produced it
    pub provider_used: String,
    /// Units consumed
    pub tokens_used: u64,
}

/// Capability-aware provider router
pub struct Router {
    config: RouterConfig,
    registry: Arc<CapabilityRegistry>,
    health: Arc<HealthMonitor>,
    usage: Arc<UsageTracker>,
    cache: Arc<ResponseCache>,
    coordinator: ExecutionCoordinator,
}

impl Router {
    /// Build a router whose health probes go through `adapter`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: RouterConfig, adapter: Arc<dyn ProviderAdapter>) -> Result<Self> {
        let prober = Arc::new(AdapterProber::new(adapter.clone()));
        Self::with_prober(config, adapter, prober)
    }

    /// Build a router with a custom health prober
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_prober(
        config: RouterConfig,
        adapter: Arc<dyn ProviderAdapter>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(config.build_registry()?);
        let health = Arc::new(HealthMonitor::new(
            config.health.clone(),
            registry.clone(),
            prober,
        ));
        let usage = Arc::new(UsageTracker::new(
            config.usage.clone(),
            config.rate_limit.clone(),
        ));
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let coordinator = ExecutionCoordinator::new(
            config.execution.clone(),
            Selector::new(config.scoring.clone()),
            registry.clone(),
            health.clone(),
            usage.clone(),
            adapter,
        )?;

        info!(
            providers = registry.len(),
            cache = config.cache.enabled,
            rate_limit = config.rate_limit.enabled,
            "Router initialized"
        );

        Ok(Self {
            config,
            registry,
            health,
            usage,
            cache,
            coordinator,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Capability registry
    #[must_use]
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Health monitor
    #[must_use]
    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Usage tracker
    #[must_use]
    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    /// Response cache
    #[must_use]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    /// Route a request
    ///
    /// # Errors
    ///
    /// See [`route_with_cancel`](Self::route_with_cancel).
    pub async fn route(&self, task: TaskType, prompt: &str, context: &RouteContext) -> Result<RouteResponse> {
        self.route_with_cancel(task, prompt, context, &CancellationToken::new())
            .await
    }

    /// Route a request, abandoning it when `cancel` fires
    ///
    /// # Errors
    ///
    /// - [`Error::RateLimitExceeded`] before any provider is invoked
    /// - [`Error::NoSuitableProvider`] when every candidate failed or none fit
    /// - [`Error::Cancelled`] when `cancel` fires
    #[instrument(
        skip(self, prompt, context, cancel),
        fields(request_id = %Uuid::new_v4(), task = %task, caller = %context.caller_id, tier = %context.tier)
    )]
    pub async fn route_with_cancel(
        &self,
        task: TaskType,
        prompt: &str,
        context: &RouteContext,
        cancel: &CancellationToken,
    ) -> Result<RouteResponse> {
        if let Some(hit) = self.cache.get(task, context.tier, prompt) {
            return Ok(RouteResponse {
                content: hit.content,
                provider_used: hit.provider,
                tokens_used: hit.tokens_used,
            });
        }

        let scope = format!("route:{task}");
        let decision = self
            .usage
            .check_rate_limit_for(&context.caller_id, &scope, Some(context.tier))
            .await;
        if !decision.allowed {
            return Err(Error::RateLimitExceeded {
                retry_after: decision.retry_after,
            });
        }

        let active: Vec<String> = self
            .registry
            .all_active()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let (analysis, _) = tokio::join!(
            async { analyze(prompt, context) },
            self.health.verdicts(&active)
        );
        let requirements = resolve(&analysis, &self.config.requirements);
        debug!(analysis = %analysis.summary(), "Request analyzed");

        let request = ExecutionRequest {
            task,
            prompt,
            context,
            analysis: &analysis,
        };
        let chain = AssertUnwindSafe(self.coordinator.execute(&request, requirements, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Error::Internal(panic_message(payload.as_ref()))));
        let outcome = match chain {
            Ok(outcome) => outcome,
            Err(Error::Internal(message)) => self.emergency(&request, &message, cancel).await?,
            Err(e) => return Err(e),
        };

        self.cache.put(CachedResponse {
            prompt: prompt.to_string(),
            content: outcome.content.clone(),
            provider: outcome.provider.clone(),
            tokens_used: outcome.tokens_used,
            cached_at: Utc::now(),
            tier: context.tier,
            task,
        });

        Ok(RouteResponse {
            content: outcome.content,
            provider_used: outcome.provider,
            tokens_used: outcome.tokens_used,
        })
    }

    async fn emergency(
        &self,
        request: &ExecutionRequest<'_>,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let Some(provider) = self.config.execution.emergency_provider.as_deref() else {
            return Err(Error::Internal(message.to_string()));
        };
        warn!(provider = %provider, error = %message, "Pipeline failed, trying emergency provider");
        AssertUnwindSafe(self.coordinator.execute_on(provider, request, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Error::Internal(panic_message(payload.as_ref()))))
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::exhausted(Some(other)),
            })
    }

    /// Analysis and requirements for a prompt, without invoking anything
    #[must_use]
    pub fn plan(&self, prompt: &str, context: &RouteContext) -> (RequestAnalysis, Requirements) {
        let analysis = analyze(prompt, context);
        let requirements = resolve(&analysis, &self.config.requirements);
        (analysis, requirements)
    }

    /// Rank providers for a prompt from cached health state
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuitableProvider`] when nothing survives the filters.
    pub fn rank(
        &self,
        task: TaskType,
        prompt: &str,
        context: &RouteContext,
        excluded: &[String],
    ) -> Result<Ranking> {
        let (_, mut requirements) = self.plan(prompt, context);
        for id in excluded {
            requirements.exclude(id.clone());
        }
        let candidates = self.registry.all_active();
        self.coordinator.selector().rank(
            task,
            &requirements,
            &candidates,
            &self.cached_verdicts(),
        )
    }

    /// Up to `n` provider recommendations for a task and tier
    ///
    /// Quality floors follow the tier: enterprise 90, premium 80, free 70.
    #[must_use]
    pub fn recommendations(&self, task: TaskType, tier: CallerTier, n: usize) -> Vec<SelectionResult> {
        let floor = match tier {
            CallerTier::Enterprise => 90.0,
            CallerTier::Premium => 80.0,
            CallerTier::Free => 70.0,
        };
        let requirements = Requirements::unconstrained(tier).with_min_quality(floor);
        self.coordinator.selector().recommendations(
            task,
            &requirements,
            &self.registry.all_active(),
            &self.cached_verdicts(),
            n,
        )
    }

    fn cached_verdicts(&self) -> Verdicts {
        self.registry
            .all()
            .into_iter()
            .map(|p| {
                let included = self.health.is_included(&p.id);
                (p.id, included)
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    /// Administratively disable a provider and purge its cached responses
    pub fn disable_provider(&self, id: &str) -> bool {
        if !self.registry.set_active(id, false) {
            return false;
        }
        let purged = self.cache.invalidate_tag(&provider_tag(id));
        info!(provider = %id, purged, "Provider disabled");
        true
    }

    /// Re-enable a provider
    pub fn enable_provider(&self, id: &str) -> bool {
        let known = self.registry.set_active(id, true);
        if known {
            info!(provider = %id, "Provider enabled");
        }
        known
    }

    /// Start periodic health checks until `cancel` fires
    pub fn spawn_health_checks(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        self.health.clone().spawn_periodic(interval, cancel)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("fallback chain panicked: {detail}")
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("providers", &self.registry.len())
            .field("cache", &self.cache.stats())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
