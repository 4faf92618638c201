use super::*;
use crate::registry::{builtin_providers, Feature, ReliabilityStats};

fn provider(id: &str, quality: f64, cost: f64) -> ProviderCapability {
    ProviderCapability {
        id: id.to_string(),
        speed: 70.0,
        quality,
        cost_per_unit: cost,
        cost_per_request: 0.0,
        context_window: 32_000,
        multimodal: false,
        strengths: vec![TaskType::Research],
        features: vec![Feature::Reasoning],
        languages: vec!["en".to_string()],
        reliability: ReliabilityStats {
            uptime: 100.0,
            avg_latency_ms: 1000,
            error_rate: 0.0,
        },
        active: true,
        description: String::new(),
        model_version: None,
    }
}

fn open() -> Requirements {
    Requirements::unconstrained(CallerTier::Premium)
}

fn ids(ranking: &Ranking) -> Vec<&str> {
    ranking.iter().map(|r| r.provider.as_str()).collect()
}

#[test]
fn test_quality_and_task_match_win_without_ceilings() {
    let p1 = provider("p1", 90.0, 0.000_02);
    let mut p2 = provider("p2", 60.0, 0.000_000_1);
    p2.strengths = vec![TaskType::Emotion];

    let ranking = Selector::default()
        .rank(TaskType::Research, &open(), &[p2, p1], &Verdicts::new())
        .unwrap();
    assert_eq!(ranking.best.provider, "p1");
    assert_eq!(ids(&ranking), vec!["p1", "p2"]);
}

#[test]
fn test_free_tier_prefers_cheaper_identical_provider() {
    let expensive = provider("expensive", 85.0, 0.000_01);
    let cheap = provider("cheap", 85.0, 0.000_001);
    let req = Requirements::unconstrained(CallerTier::Free).with_max_cost(0.000_005);
    let selector = Selector::default();

    let e = selector.score(TaskType::Research, &req, &expensive);
    let c = selector.score(TaskType::Research, &req, &cheap);
    assert!(e.total < c.total);
    assert_eq!(e.cost, 0.0);
    assert!((c.cost - 12.0).abs() < 1e-9);
    // free-tier multiplier applied to the expensive one only
    assert!((e.tier_adjusted - (e.task + e.quality + e.speed) * 0.8).abs() < 1e-9);
}

#[test]
fn test_related_task_partial_credit() {
    let mut p = provider("p", 80.0, 0.0);
    p.strengths = vec![TaskType::Insights];
    let b = Selector::default().score(TaskType::Roadmap, &open(), &p);
    assert_eq!(b.task, 20.0);

    p.strengths = vec![TaskType::PracticeQuestions];
    let b = Selector::default().score(TaskType::Roadmap, &open(), &p);
    assert_eq!(b.task, 0.0);
}

#[test]
fn test_speed_term_uses_latency_headroom() {
    let p = provider("p", 80.0, 0.0);
    let selector = Selector::default();

    let with_ceiling = selector.score(TaskType::Research, &open().with_max_latency(2000), &p);
    assert!((with_ceiling.speed - 7.5).abs() < 1e-9);

    let without = selector.score(TaskType::Research, &open(), &p);
    assert!((without.speed - 10.5).abs() < 1e-9);

    let over = selector.score(TaskType::Research, &open().with_max_latency(500), &p);
    assert_eq!(over.speed, 0.0);
}

#[test]
fn test_feature_fraction() {
    let mut p = provider("p", 80.0, 0.0);
    p.features = vec![Feature::Reasoning, Feature::Research];
    let req = open()
        .with_feature(Feature::Reasoning)
        .with_feature(Feature::Empathy);
    let b = Selector::default().score(TaskType::Research, &req, &p);
    assert!((b.features - 5.0).abs() < 1e-9);
}

#[test]
fn test_reliability_multiplier() {
    let mut p = provider("p", 80.0, 0.0);
    let full = Selector::default().score(TaskType::Research, &open(), &p);
    p.reliability.uptime = 50.0;
    let half = Selector::default().score(TaskType::Research, &open(), &p);
    assert!((half.total - full.total / 2.0).abs() < 1e-9);
}

#[test]
fn test_tier_bonuses() {
    let p = provider("p", 80.0, 0.0);
    let selector = Selector::default();
    let free = selector.score(TaskType::Research, &Requirements::unconstrained(CallerTier::Free), &p);
    let premium = selector.score(TaskType::Research, &open(), &p);
    let enterprise = selector.score(
        TaskType::Research,
        &Requirements::unconstrained(CallerTier::Enterprise),
        &p,
    );
    assert!((premium.total - free.total - 5.0).abs() < 1e-9);
    assert!((enterprise.total - free.total - 10.0).abs() < 1e-9);
}

#[test]
fn test_hard_filters_eliminate() {
    let mut inactive = provider("inactive", 99.0, 0.0);
    inactive.active = false;
    let mut small = provider("small", 99.0, 0.0);
    small.context_window = 100;
    let low_quality = provider("low", 50.0, 0.0);
    let unhealthy = provider("unhealthy", 99.0, 0.0);
    let excluded = provider("excluded", 99.0, 0.0);
    let ok = provider("ok", 75.0, 0.0);

    let mut req = open().with_min_quality(70.0).with_estimated_units(1_000);
    req.exclude("excluded");
    let verdicts: Verdicts = [("unhealthy".to_string(), false)].into_iter().collect();

    let ranking = Selector::default()
        .rank(
            TaskType::Research,
            &req,
            &[inactive, small, low_quality, unhealthy, excluded, ok],
            &verdicts,
        )
        .unwrap();
    assert_eq!(ids(&ranking), vec!["ok"]);
}

#[test]
fn test_multimodal_filter() {
    let text = provider("text", 95.0, 0.0);
    let mut vision = provider("vision", 70.0, 0.0);
    vision.multimodal = true;

    let best = Selector::default()
        .select(
            TaskType::Research,
            &open().with_multimodal(),
            &[text, vision],
            &Verdicts::new(),
        )
        .unwrap();
    assert_eq!(best.provider, "vision");
}

#[test]
fn test_enforced_ceilings_are_hard() {
    let mut slow = provider("slow", 95.0, 0.0);
    slow.reliability.avg_latency_ms = 8000;
    let pricey = provider("pricey", 95.0, 0.001);
    let ok = provider("ok", 75.0, 0.000_001);

    let mut req = open().with_max_cost(0.000_01).with_max_latency(5000);
    let candidates = [slow, pricey, ok];

    // soft by default: all three survive
    let soft = Selector::default()
        .rank(TaskType::Research, &req, &candidates, &Verdicts::new())
        .unwrap();
    assert_eq!(soft.len(), 3);

    req.enforce_cost_ceiling = true;
    req.enforce_latency_ceiling = true;
    let hard = Selector::default()
        .rank(TaskType::Research, &req, &candidates, &Verdicts::new())
        .unwrap();
    assert_eq!(ids(&hard), vec!["ok"]);
}

#[test]
fn test_no_survivor_is_no_suitable_provider() {
    let mut req = open();
    req.exclude("p1");
    let err = Selector::default()
        .rank(
            TaskType::Research,
            &req,
            &[provider("p1", 90.0, 0.0)],
            &Verdicts::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NoSuitableProvider { last_error: None }));
}

#[test]
fn test_ties_broken_by_id() {
    let a = provider("alpha", 80.0, 0.0);
    let b = provider("bravo", 80.0, 0.0);
    let ranking = Selector::default()
        .rank(TaskType::Research, &open(), &[b, a], &Verdicts::new())
        .unwrap();
    assert_eq!(ids(&ranking), vec!["alpha", "bravo"]);
    // zero gap
    assert_eq!(ranking.best.confidence, 50.0);
}

#[test]
fn test_confidence_single_survivor_and_clamp() {
    let only = Selector::default()
        .select(
            TaskType::Research,
            &open(),
            &[provider("p1", 90.0, 0.0)],
            &Verdicts::new(),
        )
        .unwrap();
    assert_eq!(only.confidence, 100.0);

    let mut weak = provider("weak", 10.0, 0.0);
    weak.strengths.clear();
    let ranking = Selector::default()
        .rank(
            TaskType::Research,
            &open(),
            &[provider("strong", 95.0, 0.0), weak],
            &Verdicts::new(),
        )
        .unwrap();
    assert_eq!(ranking.best.confidence, 100.0);
    let gap = ranking.best.score - ranking.runners_up[0].score;
    assert!(gap > 50.0);
}

#[test]
fn test_estimates() {
    let mut p = provider("p", 80.0, 0.000_002);
    p.reliability.avg_latency_ms = 1000;
    let selector = Selector::default();

    let default_units = selector
        .select(TaskType::Research, &open(), &[p.clone()], &Verdicts::new())
        .unwrap();
    assert!((default_units.estimated_cost - 0.002).abs() < 1e-12);
    assert_eq!(default_units.estimated_latency_ms, 1100);

    let large = selector
        .select(
            TaskType::Research,
            &open().with_estimated_units(20_000),
            &[p],
            &Verdicts::new(),
        )
        .unwrap();
    assert_eq!(large.estimated_latency_ms, 3000);
}

#[test]
fn test_reason_mentions_specialization() {
    let best = Selector::default()
        .select(
            TaskType::Research,
            &open().with_feature(Feature::Reasoning),
            &[provider("p", 95.0, 0.0)],
            &Verdicts::new(),
        )
        .unwrap();
    assert!(best.reason.contains("specialized for research"));
    assert!(best.reason.contains("high quality"));
    assert!(best.reason.contains("supports 1/1 required features"));
}

#[test]
fn test_recommendations_exclude_previous_picks() {
    let providers = builtin_providers();
    let req = Requirements::unconstrained(CallerTier::Enterprise).with_min_quality(90.0);
    let picks =
        Selector::default().recommendations(TaskType::Roadmap, &req, &providers, &Verdicts::new(), 3);

    assert_eq!(picks.len(), 3);
    let mut ids: Vec<_> = picks.iter().map(|p| p.provider.clone()).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(picks.iter().all(|p| p.provider != "o1-preview"));
    assert!(picks.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_builtin_emotion_prefers_empathic_providers() {
    let providers = builtin_providers();
    let req = Requirements::unconstrained(CallerTier::Enterprise).with_feature(Feature::Empathy);
    let best = Selector::default()
        .select(TaskType::Emotion, &req, &providers, &Verdicts::new())
        .unwrap();
    let chosen = providers.iter().find(|p| p.id == best.provider).unwrap();
    assert!(chosen.has_feature(Feature::Empathy));
}
