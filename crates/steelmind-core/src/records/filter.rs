//! Predicate filtering over large record batches.

use super::path::{compare, get_path, loose_eq, to_text};
use crate::config::{DEFAULT_BATCH_SIZE, PROGRESS_EVERY_CHUNKS};
use crate::progress::{ProgressSink, ProgressUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison applied by a [`FilterPredicate`].
///
/// The set is closed: an unrecognized operator name fails to deserialize
/// instead of silently matching every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring match
    Contains,
    /// Case-insensitive prefix match
    StartsWith,
    /// Case-insensitive suffix match
    EndsWith,
    /// Field equals one element of an array value
    In,
    /// Value is an array and the field equals none of its elements
    NotIn,
}

/// A `(field, operator, value)` condition on one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Dot-path of the field under test
    pub field: String,
    pub operator: FilterOperator,
    /// Comparison value
    #[serde(default)]
    pub value: Value,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluates the predicate against `record`.
    ///
    /// An absent field only satisfies `neq` and `notIn`. Ordering operators
    /// hold only when both sides are numbers or both are strings.
    pub fn matches(&self, record: &Value) -> bool {
        let field = get_path(record, &self.field);
        let value = &self.value;

        match self.operator {
            FilterOperator::Eq => field.is_some_and(|f| loose_eq(f, value)),
            FilterOperator::Neq => !field.is_some_and(|f| loose_eq(f, value)),
            FilterOperator::Gt => ordered(field, value, |o| o == Ordering::Greater),
            FilterOperator::Gte => ordered(field, value, |o| o != Ordering::Less),
            FilterOperator::Lt => ordered(field, value, |o| o == Ordering::Less),
            FilterOperator::Lte => ordered(field, value, |o| o != Ordering::Greater),
            FilterOperator::Contains => text_match(field, value, |f, v| f.contains(v)),
            FilterOperator::StartsWith => text_match(field, value, |f, v| f.starts_with(v)),
            FilterOperator::EndsWith => text_match(field, value, |f, v| f.ends_with(v)),
            FilterOperator::In => match (field, value.as_array()) {
                (Some(f), Some(set)) => set.iter().any(|item| loose_eq(f, item)),
                _ => false,
            },
            FilterOperator::NotIn => match value.as_array() {
                Some(set) => field.is_none_or(|f| !set.iter().any(|item| loose_eq(f, item))),
                None => false,
            },
        }
    }
}

fn ordered(field: Option<&Value>, value: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    field.and_then(|f| compare(f, value)).is_some_and(accept)
}

fn text_match(field: Option<&Value>, value: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    let Some(field) = field else {
        return false;
    };
    let haystack = to_text(field).to_lowercase();
    let needle = to_text(value).to_lowercase();
    test(&haystack, &needle)
}

/// Chunking and progress options for [`filter_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    /// Records per chunk; zero is treated as one
    pub batch_size: usize,
    /// Emit progress after every tenth chunk, starting with the first
    pub report_progress: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            report_progress: false,
        }
    }
}

/// Records that satisfied every predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome {
    /// Matching records, in input order
    pub filtered: Vec<Value>,
    pub original_count: usize,
    pub filtered_count: usize,
    /// `1 - filtered / original`; zero for an empty dataset
    pub reduction_ratio: f64,
}

/// Keeps the records that satisfy every predicate (logical AND).
///
/// The dataset is walked in chunks of `batch_size`. With `report_progress`
/// set, an update is sent to `progress` after chunk 0, 10, 20, ... An empty
/// predicate list keeps every record in its original order.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use steelmind_core::progress::NoProgress;
/// use steelmind_core::records::{filter_records, FilterOperator, FilterOptions, FilterPredicate};
///
/// let data = vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})];
/// let gt_one = FilterPredicate::new("a", FilterOperator::Gt, json!(1));
/// let outcome = filter_records(&data, &[gt_one], FilterOptions::default(), &mut NoProgress);
/// assert_eq!(outcome.filtered, vec![json!({"a": 2}), json!({"a": 3})]);
/// ```
pub fn filter_records(
    dataset: &[Value],
    filters: &[FilterPredicate],
    options: FilterOptions,
    progress: &mut dyn ProgressSink,
) -> FilterOutcome {
    let batch_size = options.batch_size.max(1);
    let total = dataset.len();
    let mut filtered = Vec::new();
    let mut processed = 0;

    for (chunk_index, chunk) in dataset.chunks(batch_size).enumerate() {
        filtered.extend(
            chunk
                .iter()
                .filter(|record| filters.iter().all(|f| f.matches(record)))
                .cloned(),
        );
        processed += chunk.len();

        if options.report_progress && chunk_index % PROGRESS_EVERY_CHUNKS == 0 {
            progress.report(ProgressUpdate::new(processed, total));
        }
    }

    let filtered_count = filtered.len();
    let reduction_ratio = if total == 0 {
        0.0
    } else {
        1.0 - filtered_count as f64 / total as f64
    };

    FilterOutcome {
        filtered,
        original_count: total,
        filtered_count,
        reduction_ratio,
    }
}
