//! tap-slack - Extract a Slack workspace as schema-tagged records
//!
//! Records and state go to stdout, one JSON message per line; logs go to
//! stderr.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use slack::{JsonLinesSink, SyncStats, TapConfig, sync_workspace};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "tap-slack", version, about)]
struct Args {
    /// Config file with `token` and `start_date`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file from a previous run's last STATE message
    #[arg(short, long)]
    state: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(stats) => {
            info!("Synced {} records", stats.records_emitted);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<SyncStats> {
    if args.config.is_none()
        && let Some(path) = TapConfig::default_config_path()
    {
        info!("No --config given, trying {} then environment", path.display());
    }
    let config = TapConfig::load(args.config.as_deref())?;

    let bookmarks = config.bookmarks(args.state.as_deref())?;
    info!("Resuming with {} bookmarks", bookmarks.len());

    let client = config.client();
    let stdout = std::io::stdout();
    let mut sink = JsonLinesSink::new(stdout.lock());

    let (_, stats) = sync_workspace(&client, &mut sink, bookmarks)?;
    Ok(stats)
}
