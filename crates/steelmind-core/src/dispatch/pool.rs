//! Pool of dispatcher threads behind one job queue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │     Callers     │────▶│    Job Queue    │────▶│ Worker Threads  │
//! │ submit/dispatch │     │  (MPSC, FIFO)   │     │ (one Dispatcher │
//! └─────────────────┘     └─────────────────┘     │   per thread)   │
//!          ▲                                      └─────────────────┘
//!          │              oneshot response                 │
//!          └───────────────────────────────────────────────┘
//! ```
//!
//! Every worker pulls the next job as soon as it is idle, so a job is always
//! handed to exactly one worker and answered exactly once. Responses can
//! complete out of submission order; callers correlate by request id.

use super::dispatcher::{Dispatcher, DispatcherConfig};
use super::protocol::{TaskResponse, WorkerRequest};
use crate::error::PoolError;
use crate::progress::ProgressUpdate;
use crate::tracker::PerformanceTracker;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Runtime options for a [`WorkerPool`].
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Base seed; worker `i` seeds its dispatcher with `seed + i`
    pub seed: Option<u64>,
    /// Receives progress updates from every worker
    pub progress: Option<mpsc::Sender<ProgressUpdate>>,
    /// Shared tracker; each pool gets a fresh one when unset
    pub tracker: Option<PerformanceTracker>,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub size: usize,
    /// Jobs submitted but not yet picked up
    pub queue_depth: usize,
    /// Workers currently running a job
    pub busy_workers: usize,
    pub requests_completed: u64,
}

struct Job {
    request: WorkerRequest,
    respond: oneshot::Sender<TaskResponse>,
}

#[derive(Default)]
struct PoolStatsInner {
    queue_depth: AtomicUsize,
    busy_workers: AtomicUsize,
    requests_completed: AtomicU64,
}

/// Fixed-size pool of dispatcher threads.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use steelmind_core::dispatch::{Operation, PoolConfig, WorkerPool, WorkerRequest};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let pool = WorkerPool::new(2, PoolConfig::default()).unwrap();
/// let request = WorkerRequest::new(
///     Operation::AggregateMetrics,
///     json!({"records": [{"x": 1}, {"x": 2}]}),
///     "agg-1",
/// );
/// let response = pool.dispatch(request).await.unwrap();
/// assert_eq!(response.result.unwrap()["totalRecords"], json!(2));
/// # });
/// ```
pub struct WorkerPool {
    /// `None` once the pool is shut down
    queue: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<PoolStatsInner>,
    tracker: PerformanceTracker,
}

impl WorkerPool {
    /// Spawns `size` worker threads.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPool`] when `size` is zero
    /// - [`PoolError::SpawnFailed`] if a thread cannot be created
    pub fn new(size: usize, config: PoolConfig) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::EmptyPool);
        }

        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(PoolStatsInner::default());
        let tracker = config.tracker.clone().unwrap_or_default();

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let rx = rx.clone();
            let stats = stats.clone();
            let progress = config.progress.clone();
            let dispatcher = Dispatcher::with_tracker(
                DispatcherConfig {
                    seed: config.seed.map(|s| s.wrapping_add(index as u64)),
                },
                tracker.clone(),
            );

            let handle = thread::Builder::new()
                .name(format!("steelmind-worker-{}", index))
                .spawn(move || Self::worker_loop(index, dispatcher, rx, stats, progress))
                .map_err(|e| PoolError::SpawnFailed(e.to_string()))?;
            workers.push(handle);
        }

        info!("Worker pool started with {} threads", size);

        Ok(Self {
            queue: Some(tx),
            workers,
            stats,
            tracker,
        })
    }

    fn worker_loop(
        index: usize,
        mut dispatcher: Dispatcher,
        rx: Arc<Mutex<mpsc::Receiver<Job>>>,
        stats: Arc<PoolStatsInner>,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) {
        debug!("Worker {} started", index);

        let mut sink = |update: ProgressUpdate| {
            if let Some(tx) = &progress {
                // The receiver may have gone away; progress is best-effort
                let _ = tx.send(update);
            }
        };

        while let Some(Job { request, respond }) = next_job(&rx) {
            stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
            stats.busy_workers.fetch_add(1, Ordering::Relaxed);

            let response = dispatcher.handle(request, &mut sink);
            if respond.send(response).is_err() {
                warn!("Worker {}: caller dropped the response receiver", index);
            }

            stats.busy_workers.fetch_sub(1, Ordering::Relaxed);
            stats.requests_completed.fetch_add(1, Ordering::Relaxed);
        }

        debug!("Worker {} queue closed, shutting down", index);
    }

    /// Queues `request` and returns a receiver for its response.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn submit(&self, request: WorkerRequest) -> Result<oneshot::Receiver<TaskResponse>, PoolError> {
        let queue = self.queue.as_ref().ok_or(PoolError::Closed)?;
        let (respond, response) = oneshot::channel();

        self.stats.queue_depth.fetch_add(1, Ordering::Relaxed);
        if queue.send(Job { request, respond }).is_err() {
            self.stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::Closed);
        }
        Ok(response)
    }

    /// Queues `request` and waits for its response.
    pub async fn dispatch(&self, request: WorkerRequest) -> Result<TaskResponse, PoolError> {
        self.submit(request)?
            .await
            .map_err(|_| PoolError::ResponseDropped)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.workers.len(),
            queue_depth: self.stats.queue_depth.load(Ordering::Relaxed),
            busy_workers: self.stats.busy_workers.load(Ordering::Relaxed),
            requests_completed: self.stats.requests_completed.load(Ordering::Relaxed),
        }
    }

    /// Tracker shared by every worker's dispatcher.
    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Closes the queue, lets workers finish queued jobs, and joins them.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Dropping the sender ends every worker's receive loop
        if self.queue.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread panicked during shutdown");
            }
        }
        info!("Worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// Takes the next job, or `None` once the queue is closed and drained.
fn next_job(rx: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    let receiver = rx.lock().unwrap_or_else(PoisonError::into_inner);
    receiver.recv().ok()
}
