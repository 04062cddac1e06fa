#![forbid(unsafe_code)]

//! `dyntask` — run a worker over one build step's classified changes.
//!
//! Loads the runner configuration and the change document, spawns the
//! configured worker, serves its requests until it exits and reports the
//! outcome through the exit status.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use dyntask::config::RunnerConfig;
use dyntask::models::{ChangeDocument, ChangeSet};
use dyntask::session::Session;
use dyntask::sink::TracingSink;
use dyntask::supervisor::{run_worker, Outcome};
use dyntask::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "dyntask", about = "Serve classified file changes to a worker process", version, long_about = None)]
struct Cli {
    /// Path to the TOML runner configuration.
    #[arg(long)]
    config: PathBuf,

    /// Path to the JSON change document of this build step.
    #[arg(long)]
    changes: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
        .inspect_err(|err| error!(%err, "run failed"))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = RunnerConfig::load_from_path(&args.config)?;
    info!(target_path = %config.target, "configuration loaded");

    // ── Load and classify changes ───────────────────────
    let raw = std::fs::read_to_string(&args.changes)
        .map_err(|err| AppError::Config(format!("cannot read change document: {err}")))?;
    let document = ChangeDocument::from_json_str(&raw)?;
    let changes = ChangeSet::from_records(&document.changes)?;
    info!(
        total = changes.len(),
        out_of_date = changes.out_of_date_count(),
        incremental = document.incremental,
        "changes classified"
    );

    // ── Run the worker ──────────────────────────────────
    let session = Session::new(
        document.incremental,
        config.input_dir.clone(),
        config.output_dir.clone(),
        changes,
        CancellationToken::new(),
    );
    match run_worker(&config.spawn_config(), session, Arc::new(TracingSink)).await? {
        Outcome::Completed => info!("worker run completed"),
        Outcome::Skipped(reason) => info!(%reason, "worker run skipped"),
    }
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
