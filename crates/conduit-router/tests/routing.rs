//! End-to-end routing behavior against the scripted adapter

use conduit_router::{
    AdapterResponse, CallerTier, Error, Feature, HealthStatus, InvokeOptions, MockAdapter,
    MockBehavior, ProviderAdapter, ProviderCapability, ReliabilityStats, Requirements,
    RouteContext, Router, RouterConfig, Selector, TaskType, TransportError, Verdicts,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PROMPT: &str = "Summarize the water cycle";

fn provider(id: &str, quality: f64, cost_per_unit: f64) -> ProviderCapability {
    ProviderCapability {
        id: id.to_string(),
        speed: 80.0,
        quality,
        cost_per_unit,
        cost_per_request: 0.0,
        context_window: 64_000,
        multimodal: false,
        strengths: vec![TaskType::Research, TaskType::MentorChat],
        features: vec![Feature::Research, Feature::Reasoning],
        languages: vec!["en".to_string()],
        reliability: ReliabilityStats {
            uptime: 100.0,
            avg_latency_ms: 800,
            error_rate: 0.0,
        },
        active: true,
        description: String::new(),
        model_version: None,
    }
}

fn config() -> RouterConfig {
    let mut config = RouterConfig {
        providers: vec![
            provider("p1", 98.0, 0.000_002),
            provider("p2", 95.0, 0.000_002),
            provider("p3", 92.0, 0.000_002),
        ],
        ..RouterConfig::default()
    };
    config.health.probe_on_miss = false;
    config.execution.emergency_provider = None;
    config
}

fn router_with(config: RouterConfig) -> (Router, Arc<MockAdapter>) {
    let adapter = Arc::new(MockAdapter::new());
    let router = Router::new(config, adapter.clone()).unwrap();
    (router, adapter)
}

fn caller() -> RouteContext {
    RouteContext::new("student-1", CallerTier::Premium)
}

#[test]
fn scenario_a_quality_and_task_match_beat_cheapness() {
    let mut p1 = provider("p1", 90.0, 0.000_03);
    p1.strengths = vec![TaskType::Research];
    let mut p2 = provider("p2", 60.0, 0.000_000_1);
    p2.strengths = vec![TaskType::Emotion];

    let best = Selector::default()
        .select(
            TaskType::Research,
            &Requirements::unconstrained(CallerTier::Enterprise),
            &[p2, p1],
            &Verdicts::new(),
        )
        .unwrap();
    assert_eq!(best.provider, "p1");
}

#[tokio::test]
async fn scenario_b_refusal_falls_back_to_next_provider() {
    let (router, adapter) = router_with(config());
    adapter.push(
        "p1",
        MockBehavior::Respond("I cannot help with that request.".to_string()),
    );

    let response = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(response.provider_used, "p2");
    assert_eq!(adapter.call_log(), vec!["p1", "p2"]);

    let records = router.usage().records().await;
    let last = records.last().unwrap();
    assert!(last.success);
    assert!(last.used_fallback);
    assert_eq!(last.original_provider.as_deref(), Some("p1"));
}

#[test]
fn scenario_c_free_tier_penalizes_expensive_provider() {
    let expensive = provider("expensive", 85.0, 0.000_01);
    let cheap = provider("cheap", 85.0, 0.000_001);
    let requirements = Requirements::unconstrained(CallerTier::Free).with_max_cost(0.000_005);
    let selector = Selector::default();

    let e = selector.score(TaskType::Research, &requirements, &expensive);
    let c = selector.score(TaskType::Research, &requirements, &cheap);
    assert!(e.total < c.total);
}

#[tokio::test]
async fn scenario_d_rate_limited_caller_never_reaches_a_provider() {
    let mut config = config();
    config.rate_limit.max_requests = 0;
    let (router, adapter) = router_with(config);

    let err = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitExceeded { .. }));
    assert_eq!(adapter.total_calls(), 0);
    assert!(router.usage().is_empty().await);
}

#[tokio::test]
async fn rate_limit_applies_after_budget_is_spent() {
    let mut config = config();
    config.rate_limit.max_requests = 1;
    let (router, adapter) = router_with(config);

    router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    let err = router
        .route(TaskType::Research, "A different question", &caller())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimitExceeded { .. }));
    assert_eq!(adapter.total_calls(), 1);
    assert_eq!(router.usage().len().await, 1);
}

#[tokio::test]
async fn excluded_providers_are_never_retried() {
    let (router, adapter) = router_with(config());
    for id in ["p1", "p2", "p3"] {
        adapter.set_default(id, MockBehavior::Fail("connection reset".to_string()));
    }

    let err = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap_err();
    assert!(matches!(err, Error::NoSuitableProvider { last_error: Some(_) }));
    for id in ["p1", "p2", "p3"] {
        assert_eq!(adapter.calls(id), 1, "{id}");
    }
    // failures are never cached
    assert!(router.cache().is_empty());
}

#[tokio::test]
async fn down_provider_is_excluded_regardless_of_score() {
    let (router, adapter) = router_with(config());
    for _ in 0..3 {
        router
            .health()
            .record_outcome("p1", false, 100, Some("503".to_string()));
    }
    assert_eq!(router.health().status("p1"), HealthStatus::Down);

    let response = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(response.provider_used, "p2");
    assert_eq!(adapter.calls("p1"), 0);
}

#[tokio::test]
async fn cache_hit_skips_the_pipeline_and_is_idempotent() {
    let (router, adapter) = router_with(config());

    let first = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    let second = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(adapter.total_calls(), 1);
    assert_eq!(router.usage().len().await, 1);
    assert_eq!(router.cache().stats().hits, 1);

    // tier is part of the signature
    let free = RouteContext::new("student-1", CallerTier::Free);
    router.route(TaskType::Research, PROMPT, &free).await.unwrap();
    assert_eq!(adapter.total_calls(), 2);
}

#[tokio::test]
async fn disabling_a_provider_purges_its_cached_responses() {
    let (router, adapter) = router_with(config());
    let first = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(first.provider_used, "p1");

    assert!(router.disable_provider("p1"));
    assert!(router.cache().is_empty());

    let second = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(second.provider_used, "p2");
    assert_eq!(adapter.calls("p1"), 1);

    assert!(router.enable_provider("p1"));
    assert!(!router.disable_provider("unknown"));
}

#[tokio::test]
async fn cancelled_request_makes_no_attempts() {
    let (router, adapter) = router_with(config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = router
        .route_with_cancel(TaskType::Research, PROMPT, &caller(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(adapter.total_calls(), 0);
}

#[test]
fn recommendations_respect_tier_quality_floor() {
    let (router, _) = router_with(RouterConfig::default());
    let picks = router.recommendations(TaskType::Research, CallerTier::Enterprise, 3);
    assert!(!picks.is_empty());
    for pick in &picks {
        let p = router.registry().get(&pick.provider).unwrap();
        assert!(p.quality >= 90.0, "{}", pick.provider);
    }
}

/// Panics for every provider except the one it serves
struct OnlyServes(&'static str);

#[async_trait::async_trait]
impl ProviderAdapter for OnlyServes {
    async fn invoke(
        &self,
        provider_id: &str,
        _prompt: &str,
        _options: &InvokeOptions,
    ) -> Result<AdapterResponse, TransportError> {
        if provider_id != self.0 {
            panic!("adapter for {provider_id} crashed");
        }
        Ok(AdapterResponse {
            content: format!("answer from {provider_id}"),
            tokens_used: 12,
        })
    }
}

fn builtin_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.health.probe_on_miss = false;
    config
}

#[tokio::test]
async fn crashed_pipeline_falls_back_to_emergency_provider() {
    let router = Router::new(builtin_config(), Arc::new(OnlyServes("gpt-4o"))).unwrap();

    let response = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(response.provider_used, "gpt-4o");
    assert_eq!(response.content, "answer from gpt-4o");

    let records = router.usage().records().await;
    let last = records.last().unwrap();
    assert_eq!(last.provider, "gpt-4o");
    assert!(last.success);
}

#[tokio::test]
async fn crashed_pipeline_without_emergency_provider_is_internal() {
    let mut config = builtin_config();
    config.execution.emergency_provider = None;
    let router = Router::new(config, Arc::new(OnlyServes("nobody"))).unwrap();

    let err = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap_err();
    match err {
        Error::Internal(message) => assert!(message.contains("crashed"), "{message}"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(router.cache().is_empty());
}

#[tokio::test]
async fn crashed_emergency_provider_reports_exhaustion() {
    let router = Router::new(builtin_config(), Arc::new(OnlyServes("nobody"))).unwrap();

    let err = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap_err();
    assert!(matches!(err, Error::NoSuitableProvider { last_error: Some(_) }));
}

#[tokio::test]
async fn slow_but_successful_provider_leaves_rotation() {
    let (router, adapter) = router_with(config());
    for _ in 0..5 {
        router.health().record_outcome("p1", true, 15_000, None);
    }
    assert_eq!(router.health().status("p1"), HealthStatus::Down);

    let response = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(response.provider_used, "p2");
    assert_eq!(adapter.calls("p1"), 0);
}

#[tokio::test]
async fn single_success_does_not_readmit_failing_provider() {
    let (router, adapter) = router_with(config());
    for _ in 0..6 {
        router
            .health()
            .record_outcome("p1", false, 100, Some("503".to_string()));
    }
    router.health().record_outcome("p1", true, 100, None);
    assert_eq!(router.health().status("p1"), HealthStatus::Down);

    let response = router.route(TaskType::Research, PROMPT, &caller()).await.unwrap();
    assert_eq!(response.provider_used, "p2");
    assert_eq!(adapter.calls("p1"), 0);
}
