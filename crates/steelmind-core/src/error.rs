//! Error types for steelmind-core.
//!
//! This module defines the errors shared across the engines, the dispatcher,
//! the worker pool and the reconnecting channel.

use thiserror::Error;

/// Missing or empty input data.
///
/// Engines return these instead of panicking. At the worker boundary they are
/// rendered as a successful response whose result is `{"error": "..."}`, so a
/// caller can branch on the payload without treating it as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Statistics or similarity requested over an empty vector batch
    #[error("No embeddings provided")]
    NoEmbeddings,
    /// Clustering requested over an empty point set
    #[error("No points provided for clustering")]
    NoPoints,
    /// Clustering requested with `k = 0`
    #[error("Cluster count must be at least 1")]
    InvalidClusterCount,
    /// Aggregation requested over an empty record batch
    #[error("No records provided")]
    NoRecords,
}

/// Errors raised while routing a request to an engine.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request itself is not valid `{type, data, id}` JSON
    #[error("Malformed request: {0}")]
    MalformedRequest(#[source] serde_json::Error),
    /// The operation tag is not one the dispatcher knows
    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),
    /// The payload could not be decoded for the operation
    #[error("Invalid payload for {operation}: {source}")]
    InvalidPayload {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The payload decoded but carries an unusable parameter
    #[error("Invalid parameter for {operation}: {message}")]
    InvalidParameter {
        operation: &'static str,
        message: String,
    },
    /// An engine panicked while processing the request
    #[error("Operation {operation} panicked: {message}")]
    Panicked {
        operation: &'static str,
        message: String,
    },
    /// The result could not be serialized
    #[error("Failed to serialize result: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Errors raised by the reconnecting channel and its transport.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The transport could not be opened
    #[error("Failed to open channel: {0}")]
    OpenFailed(String),
    /// The transport rejected an outgoing message
    #[error("Failed to send message: {0}")]
    SendFailed(String),
    /// An outgoing message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(String),
    /// An incoming message was not a valid channel message
    #[error("Failed to parse message: {0}")]
    Parse(String),
}

/// Errors raised by the worker pool.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// A pool needs at least one worker
    #[error("Worker pool size must be at least 1")]
    EmptyPool,
    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(String),
    /// The job queue has been closed
    #[error("Worker pool is shut down")]
    Closed,
    /// A worker dropped the response channel without answering
    #[error("Worker dropped the response")]
    ResponseDropped,
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Parse(err.to_string())
    }
}

/// Formats an error's `source()` chain, outermost first.
///
/// Used as the `stack` field of failure responses.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        lines.push(format!("caused by: {}", source));
        current = source.source();
    }
    lines.join("\n")
}
