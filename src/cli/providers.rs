//! CLI command: `conduit providers`
//!
//! Prints the capability registry the router would start with.

use crate::settings::AppConfig;
use conduit_router::ProviderCapability;

/// Run the providers subcommand.
pub fn run(config: &AppConfig, all: bool, json: bool) -> anyhow::Result<()> {
    let registry = config.router.build_registry()?;
    let mut providers = if all {
        registry.all()
    } else {
        registry.all_active()
    };
    providers.sort_by(|a, b| a.id.cmp(&b.id));

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    println!();
    println!("  Providers ({})", providers.len());
    println!("  {}", "-".repeat(96));
    println!(
        "  {:<26} {:>7} {:>7} {:>12} {:>9} {:>8}  Strengths",
        "Provider", "Quality", "Speed", "Cost/unit", "Context", "Latency"
    );
    println!("  {}", "-".repeat(96));
    for p in &providers {
        println!(
            "  {:<26} {:>7.0} {:>7.0} {:>12} {:>9} {:>6}ms  {}{}",
            p.id,
            p.quality,
            p.speed,
            format_cost(p),
            p.context_window,
            p.reliability.avg_latency_ms,
            p.strengths
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(","),
            if p.active { "" } else { " (inactive)" }
        );
    }
    println!();
    Ok(())
}

fn format_cost(p: &ProviderCapability) -> String {
    if p.cost_per_request > 0.0 {
        format!("${:.4}/req", p.cost_per_request)
    } else {
        format!("${:.7}", p.cost_per_unit)
    }
}
