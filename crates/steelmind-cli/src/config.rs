//! Input and worker-count resolution for the CLI.
//!
//! Handles where requests come from and how many worker threads to run:
//! - Input: a file given with `--input`, otherwise stdin
//! - Workers: `--workers`, otherwise `$STEELMIND_WORKERS`, otherwise none
//!   (requests are handled sequentially on the main thread)

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Environment variable for the default worker count
pub const WORKERS_ENV: &str = "STEELMIND_WORKERS";

/// Opens the request stream.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Resolves the worker count from the flag, then the environment.
///
/// `None` means sequential processing without a pool.
pub fn resolve_workers(flag: Option<usize>) -> Result<Option<usize>> {
    let count = match flag {
        Some(count) => Some(count),
        None => match std::env::var(WORKERS_ENV) {
            Ok(value) => Some(
                parse_workers(&value)
                    .with_context(|| format!("Invalid ${} value", WORKERS_ENV))?,
            ),
            Err(_) => None,
        },
    };

    if count == Some(0) {
        return Err(anyhow!("Worker count must be at least 1"));
    }
    Ok(count)
}

/// Parses a worker count, ignoring surrounding whitespace.
pub fn parse_workers(value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Expected a positive integer, got {:?}", value))
}
