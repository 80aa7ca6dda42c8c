//! Request routing from the worker protocol to the engines.

use super::protocol::{
    AggregatePayload, ClusterPayload, FilterPayload, Operation, SampleOutcome, SamplePayload,
    SearchResultsPayload, SimilarityPayload, TaskResponse, WorkerRequest,
};
use crate::error::{DispatchError, InputError};
use crate::numeric::{calculate_embedding_stats, compute_similarity_matrix, k_means};
use crate::progress::ProgressSink;
use crate::records::{aggregate_metrics, filter_records, process_search_results, sample_records};
use crate::tracker::PerformanceTracker;
use instant::Instant;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Runtime options for a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Seeds the dispatcher's random source. Requests that carry their own
    /// `seed` always use that instead.
    pub seed: Option<u64>,
}

/// Routes requests to the engines and builds their terminal responses.
///
/// A dispatcher handles one request at a time and is never shared between
/// threads; the [`WorkerPool`](super::WorkerPool) gives every worker thread
/// its own instance.
///
/// # Response rules
///
/// - Unknown tag: failure `"Unknown operation type: <tag>"`
/// - Undecodable or invalid payload: failure naming the operation
/// - Engine panic: contained and reported as a failure
/// - Missing input data: success with a `{"error": "..."}` result
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use steelmind_core::dispatch::{Dispatcher, DispatcherConfig, Operation, WorkerRequest};
/// use steelmind_core::progress::NoProgress;
///
/// let mut dispatcher = Dispatcher::new(DispatcherConfig::default());
/// let request = WorkerRequest::new(
///     Operation::CalculateEmbeddingsStats,
///     json!([[1.0, 2.0], [3.0, 4.0]]),
///     1,
/// );
/// let response = dispatcher.handle(request, &mut NoProgress);
/// assert!(response.success);
/// assert_eq!(response.result.unwrap()["means"], json!([2.0, 3.0]));
/// ```
pub struct Dispatcher {
    rng: StdRng,
    tracker: PerformanceTracker,
}

impl Dispatcher {
    /// Create a dispatcher with its own tracker.
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_tracker(config, PerformanceTracker::new())
    }

    /// Create a dispatcher that times requests into `tracker`.
    pub fn with_tracker(config: DispatcherConfig, tracker: PerformanceTracker) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, tracker }
    }

    /// Tracker receiving one sample per dispatched request, keyed by tag.
    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Decodes one JSON request and handles it.
    ///
    /// A request that cannot be decoded yields a failure under its own id.
    /// The id is `null` only when the text is not JSON or carries no id.
    pub fn handle_json(&mut self, text: &str, progress: &mut dyn ProgressSink) -> TaskResponse {
        match WorkerRequest::parse(text) {
            Ok(request) => self.handle(request, progress),
            Err(rejected) => {
                warn!("Discarding malformed request {:?}: {}", rejected.id, rejected.error);
                rejected.into()
            }
        }
    }

    /// Handles one request, producing exactly one terminal response.
    pub fn handle(&mut self, request: WorkerRequest, progress: &mut dyn ProgressSink) -> TaskResponse {
        let WorkerRequest { kind, data, id } = request;

        let operation = match kind.parse::<Operation>() {
            Ok(operation) => operation,
            Err(e) => {
                warn!("Rejecting request {:?}: {}", id, e);
                return TaskResponse::failure(id, &e);
            }
        };

        debug!("Dispatching {} (id: {:?})", operation, id);
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(operation, data, progress)
        }))
        .unwrap_or_else(|payload| {
            Err(DispatchError::Panicked {
                operation: operation.as_str(),
                message: panic_message(payload.as_ref()),
            })
        });

        let elapsed = started.elapsed();
        self.tracker.record(operation.as_str(), elapsed);

        match outcome {
            Ok(result) => {
                debug!("{} completed in {:?} (id: {:?})", operation, elapsed, id);
                TaskResponse::success(id, result)
            }
            Err(e) => {
                warn!("{} failed (id: {:?}): {}", operation, id, e);
                TaskResponse::failure(id, &e)
            }
        }
    }

    fn execute(
        &mut self,
        operation: Operation,
        data: Value,
        progress: &mut dyn ProgressSink,
    ) -> Result<Value, DispatchError> {
        match operation {
            Operation::ProcessSearchResults => {
                let payload: SearchResultsPayload = decode(operation, data)?;
                let mut rng = self.request_rng(payload.seed);
                render(Ok::<_, InputError>(process_search_results(
                    &payload.memories,
                    payload.options,
                    &mut rng,
                )))
            }
            Operation::CalculateEmbeddingsStats => {
                let embeddings: Option<Vec<Vec<f64>>> = decode(operation, data)?;
                render(calculate_embedding_stats(&embeddings.unwrap_or_default()))
            }
            Operation::ClusterData => {
                let payload: ClusterPayload = decode(operation, data)?;
                if payload.k == 0 {
                    return Err(DispatchError::InvalidParameter {
                        operation: operation.as_str(),
                        message: InputError::InvalidClusterCount.to_string(),
                    });
                }
                let mut rng = self.request_rng(payload.seed);
                render(k_means(
                    &payload.points,
                    payload.k,
                    payload.max_iterations,
                    &mut rng,
                ))
            }
            Operation::FilterLargeDataset => {
                let payload: FilterPayload = decode(operation, data)?;
                if payload.options.batch_size == 0 {
                    return Err(DispatchError::InvalidParameter {
                        operation: operation.as_str(),
                        message: "batchSize must be at least 1".to_string(),
                    });
                }
                render(Ok::<_, InputError>(filter_records(
                    &payload.dataset,
                    &payload.filters,
                    payload.options,
                    progress,
                )))
            }
            Operation::ComputeSimilarityMatrix => {
                let payload: SimilarityPayload = decode(operation, data)?;
                render(compute_similarity_matrix(&payload.embeddings, payload.metric))
            }
            Operation::AggregateMetrics => {
                let payload: AggregatePayload = decode(operation, data)?;
                render(aggregate_metrics(
                    &payload.records,
                    payload.group_by.as_deref(),
                    &payload.metrics,
                ))
            }
            Operation::SampleDataset => {
                let payload: SamplePayload = decode(operation, data)?;
                let mut rng = self.request_rng(payload.seed);
                let sampled: Vec<Value> =
                    sample_records(&payload.data, payload.max_points, payload.strategy, &mut rng)
                        .into_iter()
                        .cloned()
                        .collect();
                render(Ok::<_, InputError>(SampleOutcome {
                    sampled_count: sampled.len(),
                    sampled,
                    original_count: payload.data.len(),
                    strategy: payload.strategy,
                }))
            }
        }
    }

    /// A request-scoped RNG: seeded from the request when it asks for it,
    /// otherwise forked from the dispatcher's own source.
    fn request_rng(&mut self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy()),
        }
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, data: Value) -> Result<T, DispatchError> {
    serde_json::from_value(data).map_err(|source| DispatchError::InvalidPayload {
        operation: operation.as_str(),
        source,
    })
}

/// Serializes an engine outcome; input errors become `{"error": "..."}`.
fn render<T: Serialize>(outcome: Result<T, InputError>) -> Result<Value, DispatchError> {
    match outcome {
        Ok(result) => serde_json::to_value(result).map_err(DispatchError::Serialization),
        Err(e) => Ok(json!({ "error": e.to_string() })),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
