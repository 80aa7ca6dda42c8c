//! Request processing loops.
//!
//! Both loops read one JSON request per line (blank lines are skipped) and
//! write progress updates and terminal responses as they are produced.

use crate::output::write_message;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use steelmind_core::dispatch::{Dispatcher, TaskResponse, WorkerMessage, WorkerPool, WorkerRequest};
use steelmind_core::error::PoolError;
use steelmind_core::progress::ProgressUpdate;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Counts of what a run produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub requests: usize,
    pub failures: usize,
}

impl RunSummary {
    fn record(&mut self, response: &TaskResponse) {
        self.requests += 1;
        if !response.success {
            self.failures += 1;
        }
    }
}

/// Handles requests one at a time on the calling thread.
///
/// Progress updates are written as soon as the engine emits them, so they
/// always precede their request's response.
pub fn run_sequential<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    dispatcher: &mut Dispatcher,
    pretty: bool,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for line in input.lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let mut write_error = None;
        let mut progress = |update: ProgressUpdate| {
            if write_error.is_none() {
                if let Err(e) = write_message(out, &update.into(), pretty) {
                    write_error = Some(e);
                }
            }
        };
        let response = dispatcher.handle_json(&line, &mut progress);
        if let Some(e) = write_error {
            return Err(e);
        }

        summary.record(&response);
        write_message(out, &response.into(), pretty)?;
    }

    info!(
        "Processed {} requests ({} failed)",
        summary.requests, summary.failures
    );
    Ok(summary)
}

/// Requests read ahead of the pool per worker before reading pauses.
const IN_FLIGHT_PER_WORKER: usize = 4;

/// Lines buffered between the reader thread and the dispatch loop.
const READ_AHEAD: usize = 64;

/// Fans requests out to `pool` and writes responses in completion order.
///
/// Input is read on a dedicated thread, so responses stream out while the
/// input is still open. At most `IN_FLIGHT_PER_WORKER` requests per worker
/// are outstanding at once; reading pauses until one completes.
///
/// Malformed lines are answered immediately without reaching the pool.
/// Progress received from the workers is written before the next response.
pub async fn run_pooled<R, W>(
    input: R,
    out: &mut W,
    pool: &WorkerPool,
    progress: mpsc::Receiver<ProgressUpdate>,
    pretty: bool,
) -> Result<RunSummary>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut summary = RunSummary::default();
    let mut pending = JoinSet::new();
    let max_in_flight = pool.size() * IN_FLIGHT_PER_WORKER;
    let mut lines = spawn_reader(input)?;
    let mut input_open = true;

    while input_open || !pending.is_empty() {
        tokio::select! {
            line = lines.recv(), if input_open && pending.len() < max_in_flight => {
                let Some(line) = line else {
                    input_open = false;
                    continue;
                };
                let line = line.context("Failed to read request")?;
                if line.trim().is_empty() {
                    continue;
                }

                match WorkerRequest::parse(&line) {
                    Ok(request) => {
                        let id = request.id.clone();
                        let receiver = pool.submit(request)?;
                        pending.spawn(async move { (id, receiver.await) });
                    }
                    Err(rejected) => {
                        warn!("Discarding malformed request {:?}: {}", rejected.id, rejected.error);
                        let response = TaskResponse::from(rejected);
                        summary.record(&response);
                        write_message(out, &response.into(), pretty)?;
                    }
                }
            }
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                let (id, received) = joined.context("Response task failed")?;
                let response = match received {
                    Ok(response) => response,
                    Err(_) => TaskResponse::failure(id, &PoolError::ResponseDropped),
                };

                for update in progress.try_iter() {
                    write_message(out, &WorkerMessage::from(update), pretty)?;
                }
                summary.record(&response);
                write_message(out, &response.into(), pretty)?;
            }
        }
    }

    for update in progress.try_iter() {
        write_message(out, &WorkerMessage::from(update), pretty)?;
    }

    info!(
        "Processed {} requests on {} workers ({} failed)",
        summary.requests,
        pool.size(),
        summary.failures
    );
    Ok(summary)
}

/// Reads `input` line by line on its own thread.
///
/// The channel closes at end of input or after the first read error, which
/// is forwarded.
fn spawn_reader<R>(input: R) -> Result<tokio::sync::mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(READ_AHEAD);
    thread::Builder::new()
        .name("steelmind-reader".to_string())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })
        .context("Failed to spawn input reader")?;
    Ok(rx)
}
