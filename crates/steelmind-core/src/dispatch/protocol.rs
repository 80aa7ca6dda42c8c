//! Wire types of the worker message protocol.
//!
//! Requests arrive as `{type, data, id}`. Every request is answered by exactly
//! one terminal [`TaskResponse`] carrying the same id; long-running operations
//! may additionally emit [`ProgressMessage`]s, which carry no id.

use crate::config::{DEFAULT_CLUSTER_COUNT, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_POINTS};
use crate::error::DispatchError;
use crate::numeric::SimilarityMetric;
use crate::progress::ProgressUpdate;
use crate::records::{
    FilterOptions, FilterPredicate, MetricSpec, SamplingStrategy, SearchShapingOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Caller-chosen request identifier, echoed back in the response.
///
/// The id is opaque: any JSON value the caller sends is returned unchanged,
/// so fractional or out-of-range numbers and nested values still correlate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Value);

impl CorrelationId {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Value> for CorrelationId {
    fn from(value: Value) -> Self {
        CorrelationId(value)
    }
}

impl From<i64> for CorrelationId {
    fn from(n: i64) -> Self {
        CorrelationId(Value::from(n))
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        CorrelationId(Value::from(s))
    }
}

/// An inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Operation tag, e.g. `"CLUSTER_DATA"`. Empty when the caller sent none,
    /// which the dispatcher rejects as an unknown operation.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Operation payload
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<CorrelationId>,
}

impl WorkerRequest {
    pub fn new(operation: Operation, data: Value, id: impl Into<CorrelationId>) -> Self {
        Self {
            kind: operation.as_str().to_string(),
            data,
            id: Some(id.into()),
        }
    }

    /// Decodes one request line.
    ///
    /// The id is read from the raw JSON object before the rest of the request
    /// is decoded, so a request with a bad `type` or `data` is still rejected
    /// under its own id. Only text that is not JSON at all, or a request
    /// without an id, is rejected with no id.
    pub fn parse(text: &str) -> Result<Self, RejectedRequest> {
        let raw: Value = serde_json::from_str(text).map_err(|e| RejectedRequest {
            id: None,
            error: DispatchError::MalformedRequest(e),
        })?;
        let id = raw
            .get("id")
            .filter(|id| !id.is_null())
            .cloned()
            .map(CorrelationId);

        serde_json::from_value(raw).map_err(|e| RejectedRequest {
            id,
            error: DispatchError::MalformedRequest(e),
        })
    }
}

/// A request line that could not be decoded, with whatever id it carried.
#[derive(Debug)]
pub struct RejectedRequest {
    pub id: Option<CorrelationId>,
    pub error: DispatchError,
}

impl From<RejectedRequest> for TaskResponse {
    fn from(rejected: RejectedRequest) -> Self {
        TaskResponse::failure(rejected.id, &rejected.error)
    }
}

/// Operations understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ProcessSearchResults,
    CalculateEmbeddingsStats,
    ClusterData,
    FilterLargeDataset,
    ComputeSimilarityMatrix,
    AggregateMetrics,
    SampleDataset,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::ProcessSearchResults,
        Operation::CalculateEmbeddingsStats,
        Operation::ClusterData,
        Operation::FilterLargeDataset,
        Operation::ComputeSimilarityMatrix,
        Operation::AggregateMetrics,
        Operation::SampleDataset,
    ];

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ProcessSearchResults => "PROCESS_SEARCH_RESULTS",
            Operation::CalculateEmbeddingsStats => "CALCULATE_EMBEDDINGS_STATS",
            Operation::ClusterData => "CLUSTER_DATA",
            Operation::FilterLargeDataset => "FILTER_LARGE_DATASET",
            Operation::ComputeSimilarityMatrix => "COMPUTE_SIMILARITY_MATRIX",
            Operation::AggregateMetrics => "AGGREGATE_METRICS",
            Operation::SampleDataset => "SAMPLE_DATASET",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == tag)
            .ok_or_else(|| DispatchError::UnknownOperation(tag.to_string()))
    }
}

// ============================================================================
// Payloads
// ============================================================================
//
// Missing arrays decode as empty so the engines can report them as input
// errors, the same way an explicitly empty array is reported.

fn default_cluster_count() -> usize {
    DEFAULT_CLUSTER_COUNT
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_points() -> usize {
    DEFAULT_MAX_POINTS
}

/// `PROCESS_SEARCH_RESULTS`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultsPayload {
    #[serde(default)]
    pub memories: Vec<Value>,
    #[serde(default)]
    pub options: SearchShapingOptions,
    /// Seeds the random sampling strategy
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `CLUSTER_DATA`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPayload {
    #[serde(default)]
    pub points: Vec<Vec<f64>>,
    #[serde(default = "default_cluster_count")]
    pub k: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Seeds centroid initialization for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `FILTER_LARGE_DATASET`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPayload {
    #[serde(default)]
    pub dataset: Vec<Value>,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
    #[serde(default)]
    pub options: FilterOptions,
}

/// `COMPUTE_SIMILARITY_MATRIX`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityPayload {
    #[serde(default)]
    pub embeddings: Vec<Vec<f64>>,
    #[serde(default)]
    pub metric: SimilarityMetric,
}

/// `AGGREGATE_METRICS`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePayload {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

/// `SAMPLE_DATASET`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePayload {
    #[serde(default, alias = "records")]
    pub data: Vec<Value>,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default)]
    pub strategy: SamplingStrategy,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Result of `SAMPLE_DATASET`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutcome {
    pub sampled: Vec<Value>,
    pub original_count: usize,
    pub sampled_count: usize,
    pub strategy: SamplingStrategy,
}

// ============================================================================
// Outbound messages
// ============================================================================

/// Error details of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub message: String,
    /// Error source chain, outermost first
    #[serde(default)]
    pub stack: Option<String>,
}

/// Terminal response to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Option<CorrelationId>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

impl TaskResponse {
    pub fn success(id: Option<CorrelationId>, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<CorrelationId>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(TaskFailure {
                message: err.to_string(),
                stack: Some(crate::error::error_chain(err)),
            }),
        }
    }

    /// The `error` field of a successful result, if the engine reported
    /// missing input.
    pub fn input_error(&self) -> Option<&str> {
        self.result.as_ref()?.get("error")?.as_str()
    }
}

/// Progress notification, serialized as `{"type": "PROGRESS", ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub update: ProgressUpdate,
}

impl From<ProgressUpdate> for ProgressMessage {
    fn from(update: ProgressUpdate) -> Self {
        Self {
            kind: "PROGRESS",
            update,
        }
    }
}

/// Anything the worker writes back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerMessage {
    Progress(ProgressMessage),
    Response(TaskResponse),
}

impl From<ProgressUpdate> for WorkerMessage {
    fn from(update: ProgressUpdate) -> Self {
        WorkerMessage::Progress(update.into())
    }
}

impl From<TaskResponse> for WorkerMessage {
    fn from(response: TaskResponse) -> Self {
        WorkerMessage::Response(response)
    }
}
