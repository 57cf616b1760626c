//! # Pressroom Publisher
//!
//! Publishes scheduled posts. `publisher run` fires a publication tick on a
//! cron schedule until Ctrl-C; `publisher once` runs a single tick and prints
//! the report as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};

mod background;
mod config;
mod state;
mod telemetry;

use background::{Scheduler, publish_tick};
use config::AppConfig;
use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "publisher", version, about = "Publishes scheduled posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Run the recurring publication schedule (default).
    Run,
    /// Run a single publication tick and exit.
    Once,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);

    let state = AppState::new(&config).await;

    match cli.command.unwrap_or(Command::Run) {
        Command::Once => run_once(&state).await,
        Command::Run => run_scheduled(&state, &config).await,
    }
}

async fn run_once(state: &AppState) -> anyhow::Result<()> {
    let report = state
        .runner
        .tick(state.clock.as_ref())
        .await
        .context("publication tick failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_scheduled(state: &AppState, config: &AppConfig) -> anyhow::Result<()> {
    if !config.scheduler.enabled {
        tracing::info!("Scheduler disabled; use `publisher once` to publish manually");
        return Ok(());
    }

    let mut scheduler = Scheduler::new().await?;

    let runner = state.runner.clone();
    let clock = state.clock.clone();
    scheduler
        .add_cron(&config.scheduler.schedule, move || {
            let runner = runner.clone();
            let clock = clock.clone();
            async move {
                publish_tick(&runner, clock.as_ref()).await;
            }
        })
        .await
        .with_context(|| format!("invalid schedule {:?}", config.scheduler.schedule))?;

    scheduler.start().await?;
    tracing::info!(schedule = %config.scheduler.schedule, "Publisher running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutdown requested, waiting for the current tick to finish");
    scheduler.shutdown().await?;
    Ok(())
}
