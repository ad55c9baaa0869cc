use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use scheduler::{EngineConfig, RunMode};

use crate::config::AppConfig;

#[derive(Debug, Clone, ValueEnum)]
pub enum ModeCli {
    Continuous,
    Windowed,
}

#[derive(Debug, Parser)]
#[clap(name = "courtline", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one scheduler cycle over the pending booking requests.
    Run(RunArgs),
    /// List free times for a venue/activity/date without booking.
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Ignore the daily search window and act on every invocation.
    #[clap(long, value_enum, default_value_t = ModeCli::Continuous)]
    pub mode: ModeCli,

    /// Block until the release instant when a fetched request releases
    /// today.
    #[clap(long)]
    pub align_release: bool,

    /// Hand over from coarse sleep to fine polling this many seconds
    /// before the release instant.
    #[clap(long, default_value = "60")]
    pub wait_lead_secs: u64,

    /// Poll interval (ms) during the final approach to the release
    /// instant.
    #[clap(long, default_value = "250")]
    pub fine_poll_ms: u64,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[clap(long)]
    pub venue: String,

    #[clap(long)]
    pub activity: String,

    /// Date to probe, YYYY-MM-DD.
    #[clap(long)]
    pub date: NaiveDate,
}

pub(crate) fn cli_to_mode(mode: &ModeCli) -> RunMode {
    match mode {
        ModeCli::Continuous => RunMode::Continuous,
        ModeCli::Windowed => RunMode::Windowed,
    }
}

/// Build the engine configuration from env config + CLI flags.
pub(crate) fn build_engine_config(
    config: &AppConfig,
    args: &RunArgs,
) -> anyhow::Result<EngineConfig> {
    Ok(EngineConfig {
        mode: cli_to_mode(&args.mode),
        policy: config.release_policy()?,
        align_to_release: args.align_release,
        fetch_limit: config.fetch_limit,
        wait_lead: Duration::from_secs(args.wait_lead_secs),
        fine_poll: Duration::from_millis(args.fine_poll_ms),
    })
}
