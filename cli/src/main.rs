pub mod cli;
pub mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use booking::{Booker, HttpConnector};
use cli::{Cli, Command, ProbeArgs, RunArgs, build_engine_config};
use config::AppConfig;
use provider::VenueClient;
use requests::{RequestStore, RestRequestStore};
use scheduler::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::init_logger("courtline");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Run(args) => run_cycle(&config, &args).await,
        Command::Probe(args) => probe(&config, &args).await,
    }
}

/// One polling cycle. The exit status reflects whether the cycle as a
/// whole completed; individual request failures are logged and counted
/// but do not fail the invocation.
async fn run_cycle(config: &AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    let store: Arc<dyn RequestStore> = Arc::new(RestRequestStore::new(
        config.store_url.as_str(),
        config.store_service_key.as_str(),
    )?);
    let connector = Arc::new(HttpConnector::new(config.provider_base_url.clone()));

    let booker = Booker::new(store.clone(), connector);
    let engine = Engine::new(build_engine_config(config, args)?, store, booker);

    let report = engine.run_cycle().await?;

    for action in &report.actions {
        info!(
            request_id = %action.request_id,
            action = %action.action,
            result = %action.message,
            "cycle action"
        );
    }
    if report.failures > 0 {
        warn!(failures = report.failures, "cycle completed with failures");
    }

    Ok(())
}

/// Read-only availability check, useful for verifying credentials and
/// watching a date before its booking window opens.
async fn probe(config: &AppConfig, args: &ProbeArgs) -> anyhow::Result<()> {
    let username =
        std::env::var("PROVIDER_USERNAME").context("PROVIDER_USERNAME is not set")?;
    let password =
        std::env::var("PROVIDER_PASSWORD").context("PROVIDER_PASSWORD is not set")?;

    let client = VenueClient::new(config.provider_base_url.as_str(), username, password)?;

    let times = client
        .list_times(&args.venue, &args.activity, args.date)
        .await?;

    if times.is_empty() {
        info!(
            venue = %args.venue,
            date = %args.date,
            "no free times (the booking window may not be open yet)"
        );
        return Ok(());
    }

    info!(count = times.len(), "free times found");
    for time in &times {
        info!(start = %time.start, end = %time.end, "free time");
    }

    Ok(())
}
