//! Down-sampling of oversized record batches.

use super::path::{get_path, is_truthy, to_text};
use crate::config::DEFAULT_CATEGORY;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Field read by stratified sampling.
const CATEGORY_FIELD: &str = "category";

/// How a batch is reduced to at most `max_points` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Every `floor(n / max_points)`-th record, starting with the first
    #[default]
    Systematic,
    /// Shuffle, then take the first `max_points`
    Random,
    /// Equal systematic quota per `category` value
    Stratified,
}

/// Reduces `data` to at most `max_points` records.
///
/// Batches already within the limit are returned whole and in order. The
/// returned references point into `data`; nothing is copied or mutated.
///
/// Stratified sampling buckets records by their `category` field (records
/// with a missing or empty category share the `"default"` bucket), gives every
/// bucket a quota of `floor(max_points / buckets)` but at least one, samples
/// each bucket systematically, and truncates the concatenation to
/// `max_points`. Buckets keep the order in which their first record appeared,
/// so with more buckets than `max_points` the first record of each of the
/// earliest buckets is kept.
pub fn sample_records<'a, R: Rng + ?Sized>(
    data: &'a [Value],
    max_points: usize,
    strategy: SamplingStrategy,
    rng: &mut R,
) -> Vec<&'a Value> {
    if data.len() <= max_points {
        return data.iter().collect();
    }

    match strategy {
        SamplingStrategy::Systematic => systematic(data.iter().collect(), max_points),
        SamplingStrategy::Random => {
            let mut shuffled: Vec<&Value> = data.iter().collect();
            shuffled.shuffle(rng);
            shuffled.truncate(max_points);
            shuffled
        }
        SamplingStrategy::Stratified => stratified(data, max_points),
    }
}

fn systematic(items: Vec<&Value>, count: usize) -> Vec<&Value> {
    if items.len() <= count {
        return items;
    }
    if count == 0 {
        return Vec::new();
    }
    let interval = items.len() / count;
    items.into_iter().step_by(interval).take(count).collect()
}

fn stratified(data: &[Value], max_points: usize) -> Vec<&Value> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&Value>> = HashMap::new();

    for record in data {
        let category = get_path(record, CATEGORY_FIELD)
            .filter(|c| is_truthy(c))
            .map(to_text)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let bucket = buckets.entry(category.clone()).or_insert_with(|| {
            order.push(category);
            Vec::new()
        });
        bucket.push(record);
    }

    let quota = (max_points / order.len().max(1)).max(1);
    let mut sampled: Vec<&Value> = order
        .iter()
        .filter_map(|category| buckets.remove(category))
        .flat_map(|bucket| systematic(bucket, quota))
        .collect();
    sampled.truncate(max_points);
    sampled
}
