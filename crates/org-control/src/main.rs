//! CLI for org-control
//!
//! Run `org-control --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use org_control::{config, created_after, GhClient, Orchestrator, PrState, Selection};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "org-control")]
#[command(about = "Check GitHub PRs and set labels by type and category")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, value_name = "PATH", env = "ORG_CONTROL_CONFIG", default_value = "config.json")]
    cfg_file: PathBuf,

    /// Process only the pull request with this number
    #[arg(long, value_name = "NUMBER")]
    pr: Option<u64>,

    /// State of the pull requests to process
    #[arg(long, value_enum, default_value_t = PrState::Open)]
    pr_state: PrState,

    /// Process only pull requests created in the last MINUTES
    #[arg(long, value_name = "MINUTES")]
    newer: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration overrides, e.g. DRY_RUN=true
    #[arg(value_name = "NAME[=VALUE]")]
    overrides: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = config::init(&cli.cfg_file, &cli.overrides)
        .with_context(|| format!("Invalid configuration in {}", cli.cfg_file.display()))?;
    for (name, url) in config.proxy_exports() {
        println!("Set proxy: {name}={url}");
    }
    if config.dry_run() {
        println!("Dry run: labels will be reported, not written");
    }

    let client = GhClient::from_config(config);
    let orchestrator = Orchestrator::new(config, &client)?;

    let selection = cli
        .pr
        .map_or(Selection::State(cli.pr_state), Selection::Single);
    let pulls = orchestrator.collect(selection).await?;
    if let Selection::State(state) = selection {
        println!("\nPRs count ({state}): {}", pulls.len());
    }

    let cutoff = cli.newer.map(|minutes| created_after(Utc::now(), minutes));
    if let Some(after) = cutoff {
        println!("PRs created after: {after}");
    }

    let summary = orchestrator
        .process_all(pulls, cutoff, |outcome| println!("\n{outcome}"))
        .await;

    println!("\n{summary}");
    Ok(())
}
