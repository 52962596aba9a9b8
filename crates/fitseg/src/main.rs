use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueHint};
use fitseg::{Config, run_update};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find segment attempts in FIT/GPX recordings", long_about = None)]
struct Cli {
    /// FIT/GPX files to process
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Log per-segment search details
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Write per-point distances to every segment gate under <trace-dir>/csv
    #[arg(long, action = ArgAction::SetTrue)]
    dump_distances: bool,

    /// Directory holding segment_definitions.json, activities.json and segments.json
    #[arg(long, value_hint = ValueHint::DirPath)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the timing and debug CSV traces
    #[arg(long, value_hint = ValueHint::DirPath)]
    trace_dir: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.trace_dir {
        config.trace_dir = dir;
    }
    config.dump_distances |= cli.dump_distances;

    tracing::info!("Using data directory {}", config.data_dir.display());

    let summary = run_update(&config, &cli.files)
        .with_context(|| format!("update failed in {}", config.data_dir.display()))?;

    tracing::info!(
        "Done: {} processed, {} skipped, {} failed, {} attempt(s) found",
        summary.processed,
        summary.skipped,
        summary.failed,
        summary.attempts_found
    );
    Ok(())
}
