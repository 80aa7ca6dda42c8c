//! Named timing marks and per-operation duration summaries.
//!
//! A [`PerformanceTracker`] is an explicitly owned collector: the dispatcher
//! holds one and times every request into it, and callers can keep their own
//! for anything else. Clones share the same underlying state.
//!
//! ## Architecture
//!
//! Each metric name keeps a bounded history of its most recent samples
//! (see [`MAX_TRACKER_SAMPLES`]) plus a lifetime counter. Summaries are
//! computed over the retained samples. Open marks are stored separately and
//! removed when they are ended.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use steelmind_core::tracker::PerformanceTracker;
//!
//! let tracker = PerformanceTracker::new();
//! tracker.record("CLUSTER_DATA", Duration::from_millis(12));
//! tracker.record("CLUSTER_DATA", Duration::from_millis(18));
//!
//! let summary = tracker.metric("CLUSTER_DATA").unwrap();
//! assert_eq!(summary.count, 2);
//! assert!((summary.avg_ms - 15.0).abs() < 1e-9);
//! ```

use crate::config::MAX_TRACKER_SAMPLES;
use instant::Instant;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;

/// Duration history for one metric name.
#[derive(Debug, Default)]
struct MetricData {
    /// Most recent durations in milliseconds, oldest first
    samples: VecDeque<f64>,
    /// Samples recorded since creation or the last clear
    total_count: u64,
}

impl MetricData {
    fn record(&mut self, duration_ms: f64) {
        self.total_count += 1;
        self.samples.push_back(duration_ms);
        while self.samples.len() > MAX_TRACKER_SAMPLES {
            self.samples.pop_front();
        }
    }

    fn summary(&self) -> Option<MetricSummary> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        let mut min_ms = f64::INFINITY;
        let mut max_ms = f64::NEG_INFINITY;
        for &sample in &self.samples {
            sum += sample;
            min_ms = min_ms.min(sample);
            max_ms = max_ms.max(sample);
        }
        Some(MetricSummary {
            avg_ms: sum / self.samples.len() as f64,
            min_ms,
            max_ms,
            count: self.samples.len(),
            total_count: self.total_count,
        })
    }
}

#[derive(Debug, Default)]
struct TrackerInner {
    marks: HashMap<String, Instant>,
    metrics: HashMap<String, MetricData>,
}

/// Summary of the retained samples for one metric name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Number of retained samples the summary covers
    pub count: usize,
    /// Samples recorded overall, including ones already evicted
    pub total_count: u64,
}

/// Shared mark/measure collector.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    inner: Arc<RwLock<TrackerInner>>,
}

impl PerformanceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or restarts) a mark called `name`.
    pub fn start_mark(&self, name: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.marks.insert(name.to_string(), Instant::now());
        }
    }

    /// Closes the mark called `name` and records its elapsed time.
    ///
    /// Returns `None` and logs a warning when no such mark is open.
    pub fn end_mark(&self, name: &str) -> Option<Duration> {
        let mut inner = self.inner.write().ok()?;
        let Some(started) = inner.marks.remove(name) else {
            warn!("No start mark found for: {}", name);
            return None;
        };
        let elapsed = started.elapsed();
        inner
            .metrics
            .entry(name.to_string())
            .or_default()
            .record(elapsed.as_secs_f64() * 1000.0);
        Some(elapsed)
    }

    /// Records an externally measured duration under `name`.
    pub fn record(&self, name: &str, duration: Duration) {
        if let Ok(mut inner) = self.inner.write() {
            inner
                .metrics
                .entry(name.to_string())
                .or_default()
                .record(duration.as_secs_f64() * 1000.0);
        }
    }

    /// Summary for `name`, or `None` if nothing was recorded.
    pub fn metric(&self, name: &str) -> Option<MetricSummary> {
        let inner = self.inner.read().ok()?;
        inner.metrics.get(name).and_then(MetricData::summary)
    }

    /// Summaries for every recorded name, sorted by name.
    pub fn all_metrics(&self) -> BTreeMap<String, MetricSummary> {
        let inner = match self.inner.read() {
            Ok(inner) => inner,
            Err(_) => return BTreeMap::new(),
        };
        inner
            .metrics
            .iter()
            .filter_map(|(name, data)| data.summary().map(|s| (name.clone(), s)))
            .collect()
    }

    /// Drops all samples and open marks.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = TrackerInner::default();
        }
    }
}
