use super::*;
use crate::adapter::{MockAdapter, MockBehavior};
use crate::analyzer::analyze;
use crate::context::{CallerTier, META_SYSTEM_PROMPT};
use crate::health::{AdapterProber, HealthConfig, HealthStatus};
use crate::registry::{Feature, ReliabilityStats};

fn provider(id: &str, quality: f64) -> ProviderCapability {
    ProviderCapability {
        id: id.to_string(),
        speed: 70.0,
        quality,
        cost_per_unit: 0.000_001,
        cost_per_request: 0.0,
        context_window: 32_000,
        multimodal: false,
        strengths: vec![TaskType::Research, TaskType::Roadmap],
        features: vec![Feature::Research],
        languages: vec!["en".to_string()],
        reliability: ReliabilityStats {
            uptime: 100.0,
            avg_latency_ms: 1000,
            error_rate: 0.0,
        },
        active: true,
        description: String::new(),
        model_version: Some(format!("{id}-model")),
    }
}

struct Fixture {
    adapter: Arc<MockAdapter>,
    health: Arc<HealthMonitor>,
    usage: Arc<UsageTracker>,
    coordinator: ExecutionCoordinator,
}

fn fixture_with(config: ExecutionConfig) -> Fixture {
    let adapter = Arc::new(MockAdapter::new());
    let registry = Arc::new(
        CapabilityRegistry::new(vec![
            provider("p1", 95.0),
            provider("p2", 85.0),
            provider("p3", 75.0),
        ])
        .unwrap(),
    );
    let health = Arc::new(HealthMonitor::new(
        HealthConfig {
            probe_on_miss: false,
            ..HealthConfig::default()
        },
        registry.clone(),
        Arc::new(AdapterProber::new(adapter.clone())),
    ));
    let usage = Arc::new(UsageTracker::default());
    let coordinator = ExecutionCoordinator::new(
        config,
        Selector::default(),
        registry,
        health.clone(),
        usage.clone(),
        adapter.clone(),
    )
    .unwrap();
    Fixture {
        adapter,
        health,
        usage,
        coordinator,
    }
}

fn fixture() -> Fixture {
    fixture_with(ExecutionConfig::default())
}

fn open() -> Requirements {
    Requirements::unconstrained(CallerTier::Premium)
}

async fn run(fx: &Fixture, task: TaskType, prompt: &str) -> Result<ExecutionOutcome> {
    let context = RouteContext::new("u1", CallerTier::Premium);
    let analysis = analyze(prompt, &context);
    let request = ExecutionRequest {
        task,
        prompt,
        context: &context,
        analysis: &analysis,
    };
    fx.coordinator
        .execute(&request, open(), &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_first_choice_succeeds() {
    let fx = fixture();
    let outcome = run(&fx, TaskType::Research, "Explain photosynthesis").await.unwrap();

    assert_eq!(outcome.provider, "p1");
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.original_provider, None);
    assert_eq!(outcome.content, "mock response from p1");
    assert!(outcome.selection.is_some());

    let records = fx.usage.records().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert!(!records[0].used_fallback);
    assert!(records[0].cost > 0.0);
    assert_eq!(fx.health.status("p1"), HealthStatus::Healthy);
}

#[tokio::test]
async fn test_refusal_falls_back_and_records_origin() {
    let fx = fixture();
    fx.adapter.push(
        "p1",
        MockBehavior::Respond("I'm sorry, I can't help with that.".to_string()),
    );

    let outcome = run(&fx, TaskType::Research, "Explain photosynthesis").await.unwrap();
    assert_eq!(outcome.provider, "p2");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.original_provider.as_deref(), Some("p1"));

    let records = fx.usage.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].provider, "p1");
    assert!(!records[0].success);
    assert_eq!(records[0].error_kind.as_deref(), Some("refusal"));

    let last = &records[1];
    assert_eq!(last.provider, "p2");
    assert!(last.success);
    assert!(last.used_fallback);
    assert_eq!(last.original_provider.as_deref(), Some("p1"));

    assert_eq!(fx.health.status("p1"), HealthStatus::Degraded);
}

#[tokio::test]
async fn test_exhaustion_tries_each_provider_once() {
    let fx = fixture();
    for id in ["p1", "p2", "p3"] {
        fx.adapter.set_default(id, MockBehavior::Fail("502 bad gateway".to_string()));
    }

    let err = run(&fx, TaskType::Research, "Explain photosynthesis").await.unwrap_err();
    match err {
        Error::NoSuitableProvider { last_error } => {
            assert_eq!(last_error.map(|e| e.kind()), Some("transport_failure"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.adapter.call_log(), vec!["p1", "p2", "p3"]);
    assert_eq!(fx.usage.len().await, 3);
}

#[tokio::test]
async fn test_timeout_is_a_hard_failure() {
    let fx = fixture_with(ExecutionConfig {
        invoke_timeout_ms: 20,
        ..ExecutionConfig::default()
    });
    fx.adapter.push("p1", MockBehavior::Hang);

    let outcome = run(&fx, TaskType::Research, "Explain photosynthesis").await.unwrap();
    assert_eq!(outcome.provider, "p2");
    let records = fx.usage.records().await;
    assert_eq!(records[0].error_kind.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_structured_task_rejects_prose() {
    let fx = fixture();
    fx.adapter
        .push("p1", MockBehavior::Respond("Week 1: read a book".to_string()));
    fx.adapter
        .push("p2", MockBehavior::Respond("{\"weeks\": [1, 2]}".to_string()));

    let outcome = run(&fx, TaskType::Roadmap, "Make me a study roadmap").await.unwrap();
    assert_eq!(outcome.provider, "p2");
    assert_eq!(outcome.content, "{\"weeks\": [1, 2]}");
    let records = fx.usage.records().await;
    assert_eq!(records[0].error_kind.as_deref(), Some("malformed_output"));
}

#[tokio::test]
async fn test_down_provider_is_skipped() {
    let fx = fixture();
    for _ in 0..3 {
        fx.health.record_outcome("p1", false, 100, Some("503".into()));
    }
    assert_eq!(fx.health.status("p1"), HealthStatus::Down);

    let outcome = run(&fx, TaskType::Research, "Explain photosynthesis").await.unwrap();
    assert_eq!(outcome.provider, "p2");
    assert_eq!(fx.adapter.calls("p1"), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let fx = fixture();
    let context = RouteContext::new("u1", CallerTier::Premium);
    let analysis = analyze("hi", &context);
    let request = ExecutionRequest {
        task: TaskType::Research,
        prompt: "hi",
        context: &context,
        analysis: &analysis,
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fx.coordinator.execute(&request, open(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(fx.adapter.total_calls(), 0);
}

#[tokio::test]
async fn test_cancel_abandons_in_flight_call() {
    let fx = fixture();
    fx.adapter.push("p1", MockBehavior::Hang);
    let context = RouteContext::new("u1", CallerTier::Premium);
    let analysis = analyze("hi", &context);
    let request = ExecutionRequest {
        task: TaskType::Research,
        prompt: "hi",
        context: &context,
        analysis: &analysis,
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = fx.coordinator.execute(&request, open(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(fx.adapter.call_log(), vec!["p1"]);
    assert!(fx.usage.is_empty().await);
}

#[tokio::test]
async fn test_execute_on_fixed_provider() {
    let fx = fixture();
    let context = RouteContext::new("u1", CallerTier::Free);
    let analysis = analyze("hi", &context);
    let request = ExecutionRequest {
        task: TaskType::MentorChat,
        prompt: "hi",
        context: &context,
        analysis: &analysis,
    };

    let outcome = fx
        .coordinator
        .execute_on("p3", &request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.provider, "p3");
    assert!(outcome.selection.is_none());

    let err = fx
        .coordinator
        .execute_on("unknown", &request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoSuitableProvider { .. }));
}

#[test]
fn test_invoke_options_follow_task_and_context() {
    let mut config = ExecutionConfig::default();
    config
        .system_prompts
        .insert("roadmap".to_string(), "You plan studies.".to_string());
    let fx = fixture_with(config);
    let p1 = provider("p1", 90.0);

    let plain = RouteContext::new("u1", CallerTier::Premium);
    let analysis = analyze("plan", &plain);
    let request = ExecutionRequest {
        task: TaskType::Roadmap,
        prompt: "plan",
        context: &plain,
        analysis: &analysis,
    };
    let options = fx.coordinator.options(&p1, &request);
    assert_eq!(options.model, "p1-model");
    assert_eq!(options.max_tokens, 4096);
    assert_eq!(options.system_prompt.as_deref(), Some("You plan studies."));

    let custom = RouteContext::new("u1", CallerTier::Premium)
        .with_metadata(META_SYSTEM_PROMPT, "Be brief.");
    let request = ExecutionRequest {
        context: &custom,
        ..request
    };
    let options = fx.coordinator.options(&p1, &request);
    assert_eq!(options.system_prompt.as_deref(), Some("Be brief."));
}
