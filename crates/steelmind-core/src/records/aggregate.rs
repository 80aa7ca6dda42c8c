//! Group-by aggregation over record batches.

use super::path::{get_path, identity_key, key_text, to_number};
use crate::config::IMPLICIT_GROUP_KEY;
use crate::error::InputError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Reduction applied to one field within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOperation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// Number of distinct values
    Unique,
}

impl AggregateOperation {
    fn suffix(self) -> &'static str {
        match self {
            AggregateOperation::Count => "count",
            AggregateOperation::Sum => "sum",
            AggregateOperation::Avg => "avg",
            AggregateOperation::Min => "min",
            AggregateOperation::Max => "max",
            AggregateOperation::Unique => "unique",
        }
    }
}

/// A `(field, operation)` pair; its result is stored under `"<field>_<operation>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Dot-path of the aggregated field
    pub field: String,
    pub operation: AggregateOperation,
}

impl MetricSpec {
    pub fn new(field: impl Into<String>, operation: AggregateOperation) -> Self {
        Self {
            field: field.into(),
            operation,
        }
    }

    /// Result key, e.g. `"score_avg"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.field, self.operation.suffix())
    }
}

/// Value of one computed metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(usize),
    /// Non-numeric inputs make this `NaN`, which serializes as `null`
    Number(f64),
    /// `min`/`max` over a group with no values
    Empty,
}

/// Aggregates for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Records in the group, before null filtering
    pub count: usize,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Aggregation result keyed by group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub groups: BTreeMap<String, GroupSummary>,
    pub total_records: usize,
    pub group_count: usize,
}

/// Groups `records` and computes `metrics` for each group.
///
/// With `group_by` set, the group key is the text of the value at that path
/// (`"undefined"` when absent); otherwise every record lands in `"all"`.
/// Null and absent field values are dropped before each metric is computed.
/// `avg` of an empty value set is 0 and `min`/`max` are [`MetricValue::Empty`].
///
/// # Errors
///
/// Returns [`InputError::NoRecords`] for an empty batch.
pub fn aggregate_metrics(
    records: &[Value],
    group_by: Option<&str>,
    metrics: &[MetricSpec],
) -> Result<AggregateResult, InputError> {
    if records.is_empty() {
        return Err(InputError::NoRecords);
    }

    let mut grouped: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
    for record in records {
        let key = match group_by {
            Some(path) => key_text(get_path(record, path)),
            None => IMPLICIT_GROUP_KEY.to_string(),
        };
        grouped.entry(key).or_default().push(record);
    }

    let groups: BTreeMap<String, GroupSummary> = grouped
        .into_iter()
        .map(|(key, members)| {
            let metrics = metrics
                .iter()
                .map(|spec| (spec.key(), compute_metric(&members, spec)))
                .collect();
            let summary = GroupSummary {
                count: members.len(),
                metrics,
            };
            (key, summary)
        })
        .collect();

    Ok(AggregateResult {
        group_count: groups.len(),
        groups,
        total_records: records.len(),
    })
}

fn compute_metric(members: &[&Value], spec: &MetricSpec) -> MetricValue {
    let values: Vec<&Value> = members
        .iter()
        .filter_map(|record| get_path(record, &spec.field))
        .filter(|value| !value.is_null())
        .collect();

    match spec.operation {
        AggregateOperation::Count => MetricValue::Count(values.len()),
        AggregateOperation::Sum => MetricValue::Number(values.iter().map(|v| to_number(v)).sum()),
        AggregateOperation::Avg => {
            if values.is_empty() {
                MetricValue::Number(0.0)
            } else {
                let sum: f64 = values.iter().map(|v| to_number(v)).sum();
                MetricValue::Number(sum / values.len() as f64)
            }
        }
        AggregateOperation::Min => extremum(&values, f64::min),
        AggregateOperation::Max => extremum(&values, f64::max),
        AggregateOperation::Unique => {
            let distinct: HashSet<String> = values.iter().map(|v| identity_key(v)).collect();
            MetricValue::Count(distinct.len())
        }
    }
}

/// Folds numbers with `pick`, propagating `NaN` from any non-numeric input.
fn extremum(values: &[&Value], pick: fn(f64, f64) -> f64) -> MetricValue {
    let mut numbers = values.iter().map(|v| to_number(v));
    let Some(first) = numbers.next() else {
        return MetricValue::Empty;
    };
    let folded = numbers.fold(first, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(acc, n)
        }
    });
    MetricValue::Number(folded)
}
