//! CLI commands: `conduit analyze`, `conduit select`, `conduit recommend`
//!
//! Dry runs over the selection pipeline. Nothing is invoked, so health
//! data is whatever the fresh monitor holds (every provider unknown).

use super::CallerArgs;
use crate::settings::AppConfig;
use conduit_router::{CallerTier, MockAdapter, Router, SelectionResult, TaskType};
use std::sync::Arc;

fn router(config: &AppConfig) -> anyhow::Result<Router> {
    Ok(Router::new(config.router.clone(), Arc::new(MockAdapter::new()))?)
}

/// Print the analysis and resolved requirements for a prompt.
pub fn analyze(config: &AppConfig, prompt: &str, caller: &CallerArgs) -> anyhow::Result<()> {
    let router = router(config)?;
    let (analysis, requirements) = router.plan(prompt, &caller.context(config));

    println!();
    println!("  Analysis");
    println!("  {}", analysis.summary());
    println!();
    println!("  Requirements");
    println!("  min quality      {:.0}", requirements.min_quality);
    println!(
        "  max cost/unit    {}{}",
        requirements
            .max_cost
            .map_or_else(|| "none".to_string(), |c| format!("${c:.7}")),
        if requirements.enforce_cost_ceiling { " (hard)" } else { "" }
    );
    println!(
        "  max latency      {}{}",
        requirements
            .max_latency_ms
            .map_or_else(|| "none".to_string(), |ms| format!("{ms}ms")),
        if requirements.enforce_latency_ceiling { " (hard)" } else { "" }
    );
    println!(
        "  features         {}",
        requirements
            .required_features
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    println!("  multimodal       {}", requirements.require_multimodal);
    if let Some(units) = requirements.estimated_units {
        println!("  estimated units  {units}");
    }
    println!();
    Ok(())
}

/// Print the top-ranked providers for a prompt.
pub fn select(
    config: &AppConfig,
    task: TaskType,
    prompt: &str,
    caller: &CallerArgs,
    exclude: &[String],
    top: usize,
) -> anyhow::Result<()> {
    let router = router(config)?;
    let ranking = router.rank(task, prompt, &caller.context(config), exclude)?;

    println!();
    println!("  Ranking for {task} ({} eligible)", ranking.len());
    print_results(ranking.iter().take(top.max(1)));
    println!("  Selected: {} ({})", ranking.best.provider, ranking.best.reason);
    println!();
    Ok(())
}

/// Print provider recommendations for a task and tier.
pub fn recommend(config: &AppConfig, task: TaskType, tier: CallerTier, count: usize) -> anyhow::Result<()> {
    let router = router(config)?;
    let picks = router.recommendations(task, tier, count);

    println!();
    println!("  Recommendations for {task} ({tier} tier)");
    if picks.is_empty() {
        println!("  (no provider meets the tier's quality floor)");
    } else {
        print_results(picks.iter());
    }
    println!();
    Ok(())
}

fn print_results<'a>(results: impl Iterator<Item = &'a SelectionResult>) {
    println!("  {}", "-".repeat(84));
    println!(
        "  {:<4} {:<26} {:>7} {:>10} {:>12} {:>10}",
        "#", "Provider", "Score", "Confidence", "Est. cost", "Latency"
    );
    println!("  {}", "-".repeat(84));
    for (i, r) in results.enumerate() {
        println!(
            "  {:<4} {:<26} {:>7.1} {:>9.0}% {:>12} {:>8}ms",
            i + 1,
            r.provider,
            r.score,
            r.confidence,
            format!("${:.5}", r.estimated_cost),
            r.estimated_latency_ms
        );
    }
    println!("  {}", "-".repeat(84));
}
