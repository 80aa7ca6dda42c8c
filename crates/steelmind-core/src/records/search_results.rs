//! Shaping of raw search results for visualization.
//!
//! Takes the memory records returned by a search, samples them down to a
//! displayable size, projects the fields the dashboard plots, extracts a few
//! metadata features, and summarizes scores, content lengths, collections and
//! timestamps.

use super::path::{identity_key, is_truthy, to_number};
use super::sample::{sample_records, SamplingStrategy};
use crate::config::DEFAULT_MAX_POINTS;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Options for [`process_search_results`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchShapingOptions {
    pub max_points: usize,
    /// Pass embedding vectors through along with their dimensionality
    pub include_embeddings: bool,
    pub strategy: SamplingStrategy,
}

impl Default for SearchShapingOptions {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            include_embeddings: false,
            strategy: SamplingStrategy::Systematic,
        }
    }
}

/// Projection of one memory record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMemory {
    pub id: Option<Value>,
    pub content: Option<Value>,
    pub collection: Option<Value>,
    /// Numeric score, 0 when missing
    pub score: f64,
    pub timestamp: Option<Value>,
    /// Position within the sampled batch
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimensions: Option<usize>,
    #[serde(flatten)]
    pub metadata: Option<MetadataFeatures>,
}

/// Features extracted from a record's `metadata` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFeatures {
    pub has_author: bool,
    pub has_date: bool,
    pub metadata_keys: Vec<String>,
    pub metadata_count: usize,
}

/// Min/max/avg/median of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Upper median: element `n / 2` of the ascending sort
    pub median: f64,
}

/// Min/max/avg of content lengths, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LengthStats {
    pub min: usize,
    pub max: usize,
    pub avg: f64,
}

/// Earliest and latest timestamps, as Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub earliest: Option<i64>,
    pub latest: Option<i64>,
}

/// Summary statistics over the processed memories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub count: usize,
    pub scores: ScoreStats,
    pub content_length: LengthStats,
    /// Distinct collections, in order of first appearance
    pub collections: Vec<Value>,
    pub time_range: TimeRange,
}

/// Result of [`process_search_results`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultsSummary {
    pub memories: Vec<ProcessedMemory>,
    pub total_count: usize,
    pub processed_count: usize,
    /// `processed / total`; zero for an empty batch
    pub sampling_ratio: f64,
    /// `None` for an empty batch
    pub statistics: Option<BasicStats>,
}

/// Samples, projects and summarizes a batch of search results.
pub fn process_search_results<R: Rng + ?Sized>(
    memories: &[Value],
    options: SearchShapingOptions,
    rng: &mut R,
) -> SearchResultsSummary {
    let sampled = sample_records(memories, options.max_points, options.strategy, rng);

    let processed: Vec<ProcessedMemory> = sampled
        .into_iter()
        .enumerate()
        .map(|(index, memory)| project(memory, index, options.include_embeddings))
        .collect();

    let total_count = memories.len();
    let processed_count = processed.len();
    let sampling_ratio = if total_count == 0 {
        0.0
    } else {
        processed_count as f64 / total_count as f64
    };
    let statistics = basic_stats(&processed);

    SearchResultsSummary {
        memories: processed,
        total_count,
        processed_count,
        sampling_ratio,
        statistics,
    }
}

fn project(memory: &Value, index: usize, include_embeddings: bool) -> ProcessedMemory {
    let field = |name: &str| memory.get(name).cloned();

    let score = memory
        .get("score")
        .filter(|s| is_truthy(s))
        .map(to_number)
        .unwrap_or(0.0);

    let embedding = memory
        .get("embedding")
        .filter(|e| include_embeddings && e.is_array())
        .cloned();
    let embedding_dimensions = embedding
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::len);

    let metadata = memory
        .get("metadata")
        .and_then(Value::as_object)
        .map(|meta| {
            let metadata_keys: Vec<String> = meta.keys().cloned().collect();
            MetadataFeatures {
                has_author: meta.get("author").is_some_and(is_truthy),
                has_date: meta.get("date").is_some_and(is_truthy),
                metadata_count: metadata_keys.len(),
                metadata_keys,
            }
        });

    ProcessedMemory {
        id: field("id"),
        content: field("content"),
        collection: field("collection"),
        score,
        timestamp: field("timestamp"),
        index,
        embedding,
        embedding_dimensions,
        metadata,
    }
}

fn basic_stats(memories: &[ProcessedMemory]) -> Option<BasicStats> {
    if memories.is_empty() {
        return None;
    }
    let count = memories.len();

    let mut scores: Vec<f64> = memories
        .iter()
        .map(|m| m.score)
        .filter(|s| !s.is_nan())
        .collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let score_stats = match (scores.first(), scores.last()) {
        (Some(&min), Some(&max)) => ScoreStats {
            min,
            max,
            avg: scores.iter().sum::<f64>() / scores.len() as f64,
            median: scores[scores.len() / 2],
        },
        _ => ScoreStats {
            min: f64::NAN,
            max: f64::NAN,
            avg: f64::NAN,
            median: f64::NAN,
        },
    };

    let lengths: Vec<usize> = memories
        .iter()
        .map(|m| match &m.content {
            Some(Value::String(text)) => text.encode_utf16().count(),
            _ => 0,
        })
        .collect();
    let content_length = LengthStats {
        min: lengths.iter().copied().min().unwrap_or(0),
        max: lengths.iter().copied().max().unwrap_or(0),
        avg: lengths.iter().sum::<usize>() as f64 / count as f64,
    };

    let mut seen = HashSet::new();
    let collections: Vec<Value> = memories
        .iter()
        .map(|m| m.collection.clone().unwrap_or(Value::Null))
        .filter(|c| seen.insert(identity_key(c)))
        .collect();

    let millis: Vec<i64> = memories
        .iter()
        .filter_map(|m| timestamp_millis(m.timestamp.as_ref()))
        .collect();
    let time_range = TimeRange {
        earliest: millis.iter().copied().min(),
        latest: millis.iter().copied().max(),
    };

    Some(BasicStats {
        count,
        scores: score_stats,
        content_length,
        collections,
        time_range,
    })
}

/// Converts a timestamp to epoch milliseconds.
///
/// Missing or falsy timestamps count as the epoch. Numbers are taken as
/// milliseconds. Strings are parsed as RFC 3339, then as a date-time without
/// offset, then as a bare date; the last two are read as UTC. Anything
/// unparseable is skipped.
fn timestamp_millis(timestamp: Option<&Value>) -> Option<i64> {
    match timestamp {
        None => Some(0),
        Some(value) if !is_truthy(value) => Some(0),
        Some(Value::Number(n)) => n.as_f64().map(|f| f as i64),
        Some(Value::String(text)) => parse_timestamp(text.trim()),
        Some(_) => None,
    }
}

fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = text.parse::<NaiveDateTime>() {
        return Some(naive.and_utc().timestamp_millis());
    }
    let date = text.parse::<NaiveDate>().ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn memories() -> Vec<Value> {
        vec![
            json!({
                "id": "m1",
                "content": "alpha",
                "collection": "notes",
                "score": 0.9,
                "timestamp": "2024-01-02T00:00:00Z",
                "embedding": [0.1, 0.2, 0.3],
                "metadata": {"author": "vin", "date": "", "tags": []}
            }),
            json!({
                "id": "m2",
                "content": "be",
                "collection": "docs",
                "score": 0.3,
                "timestamp": "2024-01-01T00:00:00Z"
            }),
            json!({
                "id": "m3",
                "content": "gamma ray",
                "collection": "notes",
                "timestamp": 1_700_000_000_000i64
            }),
        ]
    }

    #[test]
    fn test_projection_and_metadata_features() {
        let mut rng = StdRng::seed_from_u64(0);
        let summary = process_search_results(
            &memories(),
            SearchShapingOptions {
                include_embeddings: true,
                ..Default::default()
            },
            &mut rng,
        );

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.processed_count, 3);
        assert_eq!(summary.sampling_ratio, 1.0);

        let first = &summary.memories[0];
        assert_eq!(first.id, Some(json!("m1")));
        assert_eq!(first.embedding_dimensions, Some(3));
        let meta = first.metadata.as_ref().unwrap();
        assert!(meta.has_author);
        assert!(!meta.has_date);
        assert_eq!(meta.metadata_count, 3);

        // Missing score defaults to zero; no metadata means no features
        assert_eq!(summary.memories[2].score, 0.0);
        assert!(summary.memories[2].metadata.is_none());
        assert_eq!(summary.memories[2].index, 2);
    }

    #[test]
    fn test_embeddings_omitted_by_default() {
        let mut rng = StdRng::seed_from_u64(0);
        let summary = process_search_results(&memories(), SearchShapingOptions::default(), &mut rng);
        assert!(summary.memories[0].embedding.is_none());

        let json = serde_json::to_value(&summary.memories[0]).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["hasAuthor"], json!(true));
    }

    #[test]
    fn test_statistics() {
        let mut rng = StdRng::seed_from_u64(0);
        let summary = process_search_results(&memories(), SearchShapingOptions::default(), &mut rng);
        let stats = summary.statistics.unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.scores.min, 0.0);
        assert_eq!(stats.scores.max, 0.9);
        assert_eq!(stats.scores.median, 0.3);
        assert!((stats.scores.avg - 0.4).abs() < 1e-12);

        assert_eq!(stats.content_length.min, 2);
        assert_eq!(stats.content_length.max, 9);

        assert_eq!(stats.collections, vec![json!("notes"), json!("docs")]);
        assert_eq!(stats.time_range.earliest, Some(1_700_000_000_000));
        assert_eq!(stats.time_range.latest, Some(1_704_153_600_000));
    }

    #[test]
    fn test_sampling_limits_output() {
        let data: Vec<Value> = (0..100).map(|i| json!({"id": i, "score": i})).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let summary = process_search_results(
            &data,
            SearchShapingOptions {
                max_points: 10,
                ..Default::default()
            },
            &mut rng,
        );

        assert_eq!(summary.processed_count, 10);
        assert!((summary.sampling_ratio - 0.1).abs() < 1e-12);
        assert_eq!(summary.memories[1].id, Some(json!(10)));
        assert_eq!(summary.memories[1].index, 1);
    }

    #[test]
    fn test_timestamp_formats() {
        let millis = |v: Value| timestamp_millis(Some(&v));

        assert_eq!(millis(json!("2024-01-01T00:00:00Z")), Some(1_704_067_200_000));
        assert_eq!(millis(json!("2024-01-01T10:00:00+02:00")), Some(1_704_096_000_000));
        assert_eq!(millis(json!("2024-01-01T10:00:00")), Some(1_704_103_200_000));
        assert_eq!(millis(json!("2024-01-01T10:00:00.250")), Some(1_704_103_200_250));
        assert_eq!(millis(json!("2024-01-01")), Some(1_704_067_200_000));
        assert_eq!(millis(json!(1_700_000_000_000_i64)), Some(1_700_000_000_000));
        assert_eq!(millis(json!("")), Some(0));
        assert_eq!(timestamp_millis(None), Some(0));
        assert_eq!(millis(json!("last tuesday")), None);
    }

    #[test]
    fn test_content_length_counts_utf16_units() {
        let data = vec![json!({"content": "a\u{1F600}"}), json!({"content": "\u{e9}"})];
        let mut rng = StdRng::seed_from_u64(0);
        let stats = process_search_results(&data, SearchShapingOptions::default(), &mut rng)
            .statistics
            .unwrap();

        // The emoji is a surrogate pair
        assert_eq!(stats.content_length.max, 3);
        assert_eq!(stats.content_length.min, 1);
    }

    #[test]
    fn test_empty_batch_has_no_statistics() {
        let mut rng = StdRng::seed_from_u64(0);
        let summary = process_search_results(&[], SearchShapingOptions::default(), &mut rng);
        assert!(summary.statistics.is_none());
        assert_eq!(summary.sampling_ratio, 0.0);
    }
}
