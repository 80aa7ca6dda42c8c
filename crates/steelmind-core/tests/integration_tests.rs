//! End-to-end tests for the worker message protocol.
//!
//! These tests drive the engines the way the dashboard does: JSON requests in,
//! JSON responses out, through a single dispatcher or through the worker pool.
//!
//! Run with: `cargo test -p steelmind-core --test integration_tests`

use serde_json::{json, Value};
use steelmind_core::channel::{ConnectionState, ReconnectingChannel, Transport};
use steelmind_core::dispatch::{
    CorrelationId, Dispatcher, DispatcherConfig, PoolConfig, TaskResponse, WorkerMessage,
    WorkerPool, WorkerRequest,
};
use steelmind_core::error::ChannelError;
use steelmind_core::progress::{NoProgress, ProgressUpdate};

// ============================================================================
// Test Fixtures
// ============================================================================

fn dispatcher() -> Dispatcher {
    Dispatcher::new(DispatcherConfig { seed: Some(7) })
}

/// Sends one JSON request line through a fresh dispatcher.
fn roundtrip(line: Value) -> TaskResponse {
    dispatcher().handle_json(&line.to_string(), &mut NoProgress)
}

fn result_of(line: Value) -> Value {
    let response = roundtrip(line);
    assert!(response.success, "request failed: {:?}", response.error);
    response.result.unwrap_or(Value::Null)
}

fn search_hits() -> Vec<Value> {
    vec![
        json!({
            "id": "a", "content": "vin", "collection": "notes", "score": 0.9,
            "timestamp": "2024-01-01T00:00:00Z", "metadata": {"author": "kelsier", "date": "x"}
        }),
        json!({
            "id": "b", "content": "elend venture", "collection": "docs", "score": 0.5,
            "timestamp": "2024-01-02T00:00:00Z"
        }),
        json!({
            "id": "c", "content": "", "collection": "notes",
            "timestamp": "2024-01-03T00:00:00Z", "metadata": {}
        }),
    ]
}

// ============================================================================
// Engine Scenarios Over JSON
// ============================================================================

#[test]
fn test_stats_scenario() {
    let result = result_of(json!({
        "type": "CALCULATE_EMBEDDINGS_STATS",
        "data": [[1, 2], [3, 4]],
        "id": 1
    }));
    assert_eq!(result["count"], json!(2));
    assert_eq!(result["dimensions"], json!(2));
    assert_eq!(result["means"], json!([2.0, 3.0]));
    assert_eq!(result["mins"], json!([1.0, 2.0]));
    assert_eq!(result["maxs"], json!([3.0, 4.0]));
    assert_eq!(result["variances"], json!([1.0, 1.0]));
    assert_eq!(result["stdDeviations"], json!([1.0, 1.0]));
}

#[test]
fn test_cosine_similarity_scenario() {
    let result = result_of(json!({
        "type": "COMPUTE_SIMILARITY_MATRIX",
        "data": {"embeddings": [[1, 0], [0, 1]], "metric": "cosine"},
        "id": 2
    }));
    assert_eq!(result["matrix"], json!([[1.0, 0.0], [0.0, 1.0]]));
    assert_eq!(result["size"], json!(2));
    assert_eq!(result["metric"], json!("cosine"));
    assert_eq!(result["statistics"]["mean"], json!(0.5));
}

#[test]
fn test_similarity_matrix_is_symmetric() {
    let embeddings = json!([[1, 2, 3], [0, -1, 4], [2, 2, 2], [5, 0, 1]]);
    for metric in ["cosine", "euclidean", "manhattan"] {
        let result = result_of(json!({
            "type": "COMPUTE_SIMILARITY_MATRIX",
            "data": {"embeddings": embeddings, "metric": metric},
            "id": 3
        }));
        let matrix: Vec<Vec<f64>> = serde_json::from_value(result["matrix"].clone()).unwrap();
        for i in 0..4 {
            assert_eq!(matrix[i][i], 1.0);
            for j in 0..4 {
                assert_eq!(matrix[i][j], matrix[j][i], "{} at ({}, {})", metric, i, j);
            }
        }
    }
}

#[test]
fn test_filter_scenario() {
    let result = result_of(json!({
        "type": "FILTER_LARGE_DATASET",
        "data": {
            "dataset": [{"a": 1}, {"a": 2}, {"a": 3}],
            "filters": [{"field": "a", "operator": "gt", "value": 1}]
        },
        "id": 4
    }));
    assert_eq!(result["filtered"], json!([{"a": 2}, {"a": 3}]));
    assert_eq!(result["originalCount"], json!(3));
    assert_eq!(result["filteredCount"], json!(2));
    let ratio = result["reductionRatio"].as_f64().unwrap();
    assert!((ratio - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_single_cluster_converges_in_one_iteration() {
    let points: Vec<Vec<f64>> = (0..20)
        .map(|i| vec![i as f64, (i * i) as f64 % 7.0, -(i as f64)])
        .collect();
    let result = result_of(json!({
        "type": "CLUSTER_DATA",
        "data": {"points": points, "k": 1},
        "id": 5
    }));
    assert_eq!(result["iterations"], json!(1));
    assert_eq!(result["converged"], json!(true));
    assert_eq!(result["assignments"], json!(vec![0; 20]));
    assert_eq!(result["clusters"][0]["size"], json!(20));
}

#[test]
fn test_clustering_partitions_every_point() {
    let points: Vec<Vec<f64>> = (0..30)
        .map(|i| vec![(i % 3) as f64 * 50.0 + (i as f64) * 0.01, (i % 3) as f64 * -20.0])
        .collect();
    let result = result_of(json!({
        "type": "CLUSTER_DATA",
        "data": {"points": points, "k": 3, "maxIterations": 50, "seed": 99},
        "id": 6
    }));

    let assignments: Vec<usize> = serde_json::from_value(result["assignments"].clone()).unwrap();
    assert_eq!(assignments.len(), 30);
    assert!(assignments.iter().all(|&a| a < 3));

    let total: u64 = result["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["size"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 30);

    let iterations = result["iterations"].as_u64().unwrap();
    assert!(iterations >= 1 && iterations <= 50);
    assert_eq!(result["converged"], json!(iterations < 50));
}

#[test]
fn test_aggregate_by_nested_field() {
    let result = result_of(json!({
        "type": "AGGREGATE_METRICS",
        "data": {
            "records": search_hits(),
            "groupBy": "collection",
            "metrics": [
                {"field": "score", "operation": "avg"},
                {"field": "metadata.author", "operation": "unique"}
            ]
        },
        "id": 7
    }));
    assert_eq!(result["groupCount"], json!(2));
    assert_eq!(result["totalRecords"], json!(3));
    assert_eq!(result["groups"]["notes"]["count"], json!(2));
    assert_eq!(result["groups"]["notes"]["metrics"]["score_avg"], json!(0.9));
    assert_eq!(result["groups"]["notes"]["metrics"]["metadata.author_unique"], json!(1));
    assert_eq!(result["groups"]["docs"]["metrics"]["metadata.author_unique"], json!(0));
}

#[test]
fn test_process_search_results() {
    let result = result_of(json!({
        "type": "PROCESS_SEARCH_RESULTS",
        "data": {"memories": search_hits(), "options": {"maxPoints": 10}},
        "id": 8
    }));
    assert_eq!(result["totalCount"], json!(3));
    assert_eq!(result["processedCount"], json!(3));
    assert_eq!(result["samplingRatio"], json!(1.0));

    let first = &result["memories"][0];
    assert_eq!(first["hasAuthor"], json!(true));
    assert_eq!(first["metadataCount"], json!(2));
    assert!(first.get("embedding").is_none());
    assert_eq!(result["memories"][2]["score"], json!(0.0));

    let stats = &result["statistics"];
    assert_eq!(stats["count"], json!(3));
    assert_eq!(stats["collections"], json!(["notes", "docs"]));
    assert_eq!(stats["scores"]["max"], json!(0.9));
    assert_eq!(stats["timeRange"]["earliest"], json!(1_704_067_200_000_i64));
}

#[test]
fn test_empty_search_results_have_null_statistics() {
    let result = result_of(json!({
        "type": "PROCESS_SEARCH_RESULTS",
        "data": {"memories": []},
        "id": 9
    }));
    assert_eq!(result["processedCount"], json!(0));
    assert_eq!(result["statistics"], Value::Null);
}

// ============================================================================
// Protocol Errors
// ============================================================================

#[test]
fn test_unknown_type_fails_with_same_id() {
    let response = roundtrip(json!({"type": "DRAW_PIE", "data": {}, "id": "req-42"}));
    assert!(!response.success);
    assert_eq!(response.id, Some(CorrelationId::from("req-42")));
    assert_eq!(response.error.unwrap().message, "Unknown operation type: DRAW_PIE");
}

#[test]
fn test_unknown_filter_operator_fails() {
    let response = roundtrip(json!({
        "type": "FILTER_LARGE_DATASET",
        "data": {"dataset": [{"a": 1}], "filters": [{"field": "a", "operator": "regex", "value": "."}]},
        "id": 10
    }));
    assert!(!response.success);
    assert_eq!(response.id, Some(CorrelationId::from(10)));
}

#[test]
fn test_missing_data_is_reported_in_result() {
    let response = roundtrip(json!({"type": "CLUSTER_DATA", "data": {"points": []}, "id": 11}));
    assert!(response.success);
    assert_eq!(response.input_error(), Some("No points provided for clustering"));
}

#[test]
fn test_malformed_line_gets_null_id() {
    let response = dispatcher().handle_json("{\"type\": 3", &mut NoProgress);
    assert!(!response.success);
    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["id"], Value::Null);
}

#[test]
fn test_undecodable_request_keeps_its_id() {
    let response = dispatcher().handle_json("{\"type\": 3, \"id\": 18446744073709551615}", &mut NoProgress);
    assert!(!response.success);
    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["id"], json!(18446744073709551615_u64));
}

#[test]
fn test_large_and_fractional_ids_round_trip() {
    for id in [json!(18446744073709551615_u64), json!(2.25), json!({"seq": 1})] {
        let response = roundtrip(json!({
            "type": "CALCULATE_EMBEDDINGS_STATS",
            "data": [[1, 2], [3, 4]],
            "id": id
        }));
        assert!(response.success);
        assert_eq!(serde_json::to_value(&response).unwrap()["id"], id);
    }
}

#[test]
fn test_progress_then_single_terminal_response() {
    let dataset: Vec<Value> = (0..50).map(|i| json!({"i": i})).collect();
    let mut messages: Vec<WorkerMessage> = Vec::new();
    let mut sink = |u: ProgressUpdate| messages.push(u.into());

    let response = dispatcher().handle(
        serde_json::from_value::<WorkerRequest>(json!({
            "type": "FILTER_LARGE_DATASET",
            "data": {"dataset": dataset, "options": {"batchSize": 5, "reportProgress": true}},
            "id": 12
        }))
        .unwrap(),
        &mut sink,
    );
    messages.push(response.into());

    let encoded: Vec<Value> = messages
        .iter()
        .map(|m| serde_json::to_value(m).unwrap())
        .collect();
    // Chunk 0 only: ten chunks of five
    assert_eq!(encoded.len(), 2);
    assert_eq!(encoded[0]["type"], json!("PROGRESS"));
    assert_eq!(encoded[0]["processed"], json!(5));
    assert!(encoded[0].get("id").is_none());
    assert_eq!(encoded[1]["id"], json!(12));
    assert_eq!(encoded[1]["success"], json!(true));
}

// ============================================================================
// Worker Pool
// ============================================================================

#[tokio::test]
async fn test_pool_answers_every_request() {
    let pool = WorkerPool::new(4, PoolConfig::default()).unwrap();
    let tags = [
        "CALCULATE_EMBEDDINGS_STATS",
        "COMPUTE_SIMILARITY_MATRIX",
        "AGGREGATE_METRICS",
        "UNKNOWN_TAG",
    ];

    let mut pending = Vec::new();
    for (i, tag) in tags.iter().cycle().take(40).enumerate() {
        let data = match *tag {
            "CALCULATE_EMBEDDINGS_STATS" => json!([[i as f64, 1.0]]),
            "COMPUTE_SIMILARITY_MATRIX" => json!({"embeddings": [[1.0, i as f64]]}),
            _ => json!({"records": [{"i": i}]}),
        };
        let request: WorkerRequest =
            serde_json::from_value(json!({"type": tag, "data": data, "id": i})).unwrap();
        pending.push((i, *tag, pool.submit(request).unwrap()));
    }

    for (i, tag, rx) in pending {
        let response = rx.await.unwrap();
        assert_eq!(response.id, Some(CorrelationId::from(i as i64)));
        assert_eq!(response.success, tag != "UNKNOWN_TAG");
    }

    let stats = pool.stats();
    assert_eq!(stats.size, 4);
    assert_eq!(stats.requests_completed, 40);
    assert_eq!(pool.tracker().metric("AGGREGATE_METRICS").unwrap().count, 10);
    pool.shutdown();
}

#[tokio::test]
async fn test_pool_dispatch_reports_input_errors() {
    let pool = WorkerPool::new(1, PoolConfig::default()).unwrap();
    let response = pool
        .dispatch(
            serde_json::from_value(json!({"type": "AGGREGATE_METRICS", "data": {}, "id": 1}))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.input_error(), Some("No records provided"));
    pool.shutdown();
}

// ============================================================================
// Reconnecting Channel
// ============================================================================

/// Transport whose connections always drop right after opening.
#[derive(Default)]
struct FlakyTransport {
    opens: usize,
}

impl Transport for FlakyTransport {
    fn open(&mut self) -> Result<(), ChannelError> {
        self.opens += 1;
        Ok(())
    }

    fn send(&mut self, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::SendFailed("not connected".into()))
    }

    fn close(&mut self) {}
}

#[test]
fn test_channel_stops_after_five_failed_reconnects() {
    let mut channel = ReconnectingChannel::new(FlakyTransport::default());
    channel.connect().unwrap();

    let mut scheduled = 0;
    for _ in 0..6 {
        channel.handle_close();
        if let Some(pending) = channel.pending_reconnect() {
            scheduled += 1;
            assert!(channel.poll(pending.due));
        }
    }

    assert_eq!(scheduled, 5);
    assert!(channel.pending_reconnect().is_none());
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert_eq!(channel.transport().opens, 6);

    // A manual connect still works after giving up
    channel.connect().unwrap();
    channel.handle_open();
    assert_eq!(channel.reconnect_attempts(), 0);
}
