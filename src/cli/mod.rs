//! CLI module for Conduit
//!
//! Offline commands over the router:
//! - `providers`: the capability table
//! - `analyze` / `select` / `recommend`: what the router would do, without invoking anything
//! - `simulate` / `health`: the full pipeline against scripted providers
//! - `config`: the effective configuration

use crate::settings::{self, AppConfig};
use clap::{Args, Parser, Subcommand};
use conduit_router::{CallerTier, MockAdapter, MockBehavior, RouteContext, TaskType};
use std::path::PathBuf;
use tracing::warn;

pub mod plan;
pub mod providers;
pub mod simulate;

/// Conduit provider router CLI
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(about = "Capability-aware provider routing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered providers
    Providers {
        /// Include inactive providers
        #[arg(long)]
        all: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show the analysis and requirements derived from a prompt
    Analyze {
        prompt: String,
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Rank providers for a prompt
    Select {
        prompt: String,
        #[arg(long)]
        task: TaskType,
        #[command(flatten)]
        caller: CallerArgs,
        /// Provider to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Number of ranked providers to show
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
    /// Recommend providers for a task and tier
    Recommend {
        #[arg(long)]
        task: TaskType,
        #[arg(long)]
        tier: Option<CallerTier>,
        #[arg(short, long, default_value_t = 3)]
        count: usize,
    },
    /// Route a prompt through scripted providers
    Simulate {
        prompt: String,
        #[arg(long)]
        task: TaskType,
        #[command(flatten)]
        caller: CallerArgs,
        #[command(flatten)]
        script: ScriptArgs,
        /// Send the same request this many times
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
    /// Probe every active provider once
    Health {
        #[command(flatten)]
        script: ScriptArgs,
        /// JSON output
        #[arg(long)]
        json: bool,
        /// Keep probing until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Who is asking
#[derive(Args, Debug, Clone, Default)]
pub struct CallerArgs {
    /// Caller tier (defaults to `cli.tier`)
    #[arg(long)]
    pub tier: Option<CallerTier>,
    /// Caller id (defaults to `cli.caller_id`)
    #[arg(long)]
    pub caller: Option<String>,
    /// Context metadata as key=value (repeatable)
    #[arg(long = "meta", value_parser = parse_meta)]
    pub metadata: Vec<(String, String)>,
}

impl CallerArgs {
    pub fn context(&self, config: &AppConfig) -> RouteContext {
        let caller = self
            .caller
            .clone()
            .unwrap_or_else(|| config.cli.caller_id.clone());
        let mut context = RouteContext::new(caller, self.tier.unwrap_or(config.cli.tier));
        for (key, value) in &self.metadata {
            context = context.with_metadata(key.clone(), value.clone());
        }
        context
    }
}

/// Scripted provider behavior
#[derive(Args, Debug, Clone, Default)]
pub struct ScriptArgs {
    /// Provider that refuses every request (repeatable)
    #[arg(long)]
    pub refuse: Vec<String>,
    /// Provider whose transport fails (repeatable)
    #[arg(long)]
    pub fail: Vec<String>,
    /// Provider that never answers (repeatable)
    #[arg(long)]
    pub hang: Vec<String>,
}

impl ScriptArgs {
    pub fn adapter(&self, config: &AppConfig) -> MockAdapter {
        let known = config.router.effective_providers();
        let mut adapter = MockAdapter::new();
        let scripted = [
            (&self.refuse, MockBehavior::Respond("I'm sorry, I can't help with that.".to_string())),
            (&self.fail, MockBehavior::Fail("simulated outage".to_string())),
            (&self.hang, MockBehavior::Hang),
        ];
        for (ids, behavior) in scripted {
            for id in ids {
                if !known.iter().any(|p| &p.id == id) {
                    warn!(provider = %id, "Scripted provider is not registered");
                }
                adapter = adapter.with_default(id, behavior.clone());
            }
        }
        adapter
    }
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {raw}"))
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let config = settings::load_config()?;
    match command {
        Commands::Providers { all, json } => providers::run(&config, all, json),
        Commands::Analyze { prompt, caller } => plan::analyze(&config, &prompt, &caller),
        Commands::Select {
            prompt,
            task,
            caller,
            exclude,
            top,
        } => plan::select(&config, task, &prompt, &caller, &exclude, top),
        Commands::Recommend { task, tier, count } => {
            plan::recommend(&config, task, tier.unwrap_or(config.cli.tier), count)
        }
        Commands::Simulate {
            prompt,
            task,
            caller,
            script,
            repeat,
        } => simulate::run(&config, task, &prompt, &caller, &script, repeat).await,
        Commands::Health { script, json, watch } => {
            simulate::health(&config, &script, json, watch).await
        }
        Commands::Config { output } => match output {
            Some(path) => {
                config.save(&path)?;
                println!("Configuration written to {}", path.display());
                Ok(())
            }
            None => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
        },
    }
}
