//! CLI commands: `conduit simulate` and `conduit health`
//!
//! Both run the real pipeline against the scripted adapter, so fallback,
//! health transitions, caching and usage accounting can be observed
//! without any backend.

use super::{CallerArgs, ScriptArgs};
use crate::settings::AppConfig;
use conduit_router::{Router, TaskType, TimeWindow};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Route `prompt` `repeat` times and report what happened.
pub async fn run(
    config: &AppConfig,
    task: TaskType,
    prompt: &str,
    caller: &CallerArgs,
    script: &ScriptArgs,
    repeat: usize,
) -> anyhow::Result<()> {
    let adapter = Arc::new(script.adapter(config));
    let router = Router::new(config.router.clone(), adapter.clone())?;
    let context = caller.context(config);

    println!();
    for round in 1..=repeat.max(1) {
        match router.route(task, prompt, &context).await {
            Ok(response) => {
                println!(
                    "  [{round}] {} ({} units): {}",
                    response.provider_used, response.tokens_used, response.content
                );
            }
            Err(e) => println!("  [{round}] failed ({}): {e}", e.kind()),
        }
    }

    let records = router.usage().records().await;
    println!();
    println!("  Attempts ({})", records.len());
    println!("  {}", "-".repeat(84));
    println!(
        "  {:<4} {:<26} {:<8} {:<18} {:>10} {:>8}",
        "#", "Provider", "Result", "Error", "Cost", "Quality"
    );
    println!("  {}", "-".repeat(84));
    for r in &records {
        println!(
            "  {:<4} {:<26} {:<8} {:<18} {:>10} {:>8.1}",
            r.id,
            r.provider,
            if r.success { "ok" } else { "failed" },
            r.error_kind.as_deref().unwrap_or("-"),
            format!("${:.6}", r.cost),
            r.quality
        );
    }
    println!("  {}", "-".repeat(84));

    let analytics = router.usage().cost_analytics(TimeWindow::Day).await;
    let cache = router.cache().stats();
    println!(
        "  Cost: ${:.6}  |  Adapter calls: {}  |  Cache hits: {}/{}",
        analytics.total_cost,
        adapter.total_calls(),
        cache.hits,
        cache.hits + cache.misses
    );

    let limits = router
        .usage()
        .check_usage_limits(&context.caller_id, context.tier)
        .await;
    println!(
        "  Today: {}/{} requests, ${:.4}/${:.2}",
        limits.requests_today, limits.request_limit, limits.cost_today, limits.cost_limit
    );
    println!();
    Ok(())
}

/// Probe every active provider and print the resulting states.
///
/// With `watch`, probes repeat every `cli.health_interval_secs` until Ctrl-C.
pub async fn health(config: &AppConfig, script: &ScriptArgs, json: bool, watch: bool) -> anyhow::Result<()> {
    let router = Router::new(config.router.clone(), Arc::new(script.adapter(config)))?;
    let mut results = router.health().run_health_checks().await;
    results.sort_by(|a, b| a.provider.cmp(&b.provider));

    if watch {
        let interval = Duration::from_secs(config.cli.health_interval_secs.max(1));
        let cancel = CancellationToken::new();
        let handle = router.spawn_health_checks(interval, cancel.clone());
        info!(interval_secs = interval.as_secs(), "Watching provider health, Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        cancel.cancel();
        handle.await?;
    }
    let summary = router.health().summary();

    if json {
        let output = serde_json::json!({
            "providers": results,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  Provider Health");
    println!("  {}", "-".repeat(72));
    println!("  {:<26} {:<10} {:>8}  Error", "Provider", "Status", "Latency");
    println!("  {}", "-".repeat(72));
    for r in &results {
        println!(
            "  {:<26} {:<10} {:>6}ms  {}",
            r.provider,
            r.status.to_string(),
            r.latency_ms,
            r.error.as_deref().unwrap_or("")
        );
    }
    println!("  {}", "-".repeat(72));
    println!(
        "  Healthy: {}  |  Degraded: {}  |  Down: {}  |  Uptime: {:.0}%",
        summary.healthy, summary.degraded, summary.down, summary.overall_uptime
    );
    println!();
    Ok(())
}
