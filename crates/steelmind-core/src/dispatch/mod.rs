//! Worker message protocol: request routing, responses and the worker pool.
//!
//! A request names an operation tag and carries a JSON payload:
//!
//! ```text
//! → {"type": "CLUSTER_DATA", "data": {"points": [[0,0],[1,1]], "k": 2}, "id": 7}
//! ← {"type": "PROGRESS", "processed": 1000, "total": 5000, "percentage": 20}   (optional, no id)
//! ← {"id": 7, "success": true, "result": {...}}
//! ```
//!
//! [`Dispatcher`] turns one request into one terminal response on the calling
//! thread. [`WorkerPool`] runs several dispatchers on their own threads behind
//! a single job queue.

pub mod dispatcher;
pub mod pool;
pub mod protocol;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use pool::{PoolConfig, PoolStats, WorkerPool};
pub use protocol::{
    CorrelationId, Operation, ProgressMessage, RejectedRequest, SampleOutcome, TaskFailure,
    TaskResponse, WorkerMessage, WorkerRequest,
};
