//! Test utilities for steelmind-core.
//!
//! Shared fixtures for unit tests. Only compiled when running tests.

use crate::dispatch::{CorrelationId, WorkerRequest};
use serde_json::Value;

/// Builds a request with a numeric id.
pub fn request(kind: &str, data: Value, id: i64) -> WorkerRequest {
    WorkerRequest {
        kind: kind.to_string(),
        data,
        id: Some(CorrelationId::from(id)),
    }
}

/// Three well-separated 2-D blobs of four points each, around (0, 0),
/// (10, 10) and (-10, 10).
pub fn grid_points() -> Vec<Vec<f64>> {
    let centers = [(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)];
    let offsets = [(0.1, 0.1), (-0.1, 0.1), (0.1, -0.1), (-0.1, -0.1)];
    centers
        .iter()
        .flat_map(|&(cx, cy)| offsets.iter().map(move |&(dx, dy)| vec![cx + dx, cy + dy]))
        .collect()
}

/// Search hits shaped like the memory API returns them.
pub fn sample_memories(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("mem-{}", i),
                "content": "x".repeat(i + 1),
                "collection": if i % 2 == 0 { "notes" } else { "docs" },
                "score": 1.0 - i as f64 / n as f64,
                "timestamp": 1_700_000_000_000_i64 + i as i64 * 1000,
                "metadata": {"author": "kelsier"}
            })
        })
        .collect()
}
