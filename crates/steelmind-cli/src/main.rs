//! Steelmind CLI - run worker requests from the command line.
//!
//! # Usage
//!
//! ```bash
//! # One JSON request per line on stdin, one JSON message per line on stdout
//! echo '{"type":"CALCULATE_EMBEDDINGS_STATS","data":[[1,2],[3,4]],"id":1}' | steelmind
//!
//! # Read from a file and fan out over four worker threads
//! steelmind --input requests.ndjson --workers 4
//!
//! # Reproducible clustering and sampling
//! steelmind --seed 42 < requests.ndjson
//!
//! # Show help
//! steelmind --help
//! ```

mod config;
mod output;
mod run;

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use steelmind_core::dispatch::{Dispatcher, DispatcherConfig, PoolConfig, WorkerPool};
use steelmind_core::tracker::PerformanceTracker;
use tracing_subscriber::EnvFilter;

/// Steelmind numeric worker.
///
/// Reads worker requests as newline-delimited JSON and writes progress
/// updates and responses the same way. Logs go to stderr.
#[derive(Parser)]
#[command(name = "steelmind", version, about)]
struct Cli {
    /// Read requests from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of worker threads (default: $STEELMIND_WORKERS, else sequential)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seed for requests that do not carry their own
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Print per-operation timing summaries to stderr when done
    #[arg(long)]
    timings: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries protocol output, so logs go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let input = config::open_input(cli.input.as_deref())?;
    let workers = config::resolve_workers(cli.workers)?;
    let tracker = PerformanceTracker::new();
    let mut stdout = io::stdout().lock();

    let summary = match workers {
        Some(size) => {
            let (tx, rx) = mpsc::channel();
            let pool = WorkerPool::new(
                size,
                PoolConfig {
                    seed: cli.seed,
                    progress: Some(tx),
                    tracker: Some(tracker.clone()),
                },
            )?;
            let summary = run::run_pooled(input, &mut stdout, &pool, rx, cli.pretty).await?;
            pool.shutdown();
            summary
        }
        None => {
            let mut dispatcher =
                Dispatcher::with_tracker(DispatcherConfig { seed: cli.seed }, tracker.clone());
            run::run_sequential(input, &mut stdout, &mut dispatcher, cli.pretty)?
        }
    };

    if cli.timings {
        let timings = serde_json::to_string_pretty(&tracker.all_metrics())
            .context("Failed to encode timings")?;
        eprintln!("{}", timings);
    }

    if summary.failures > 0 {
        tracing::warn!(
            "{} of {} requests failed",
            summary.failures,
            summary.requests
        );
    }

    Ok(())
}
