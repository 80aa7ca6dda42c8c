//! Progress reporting for chunked record processing.
//!
//! Progress updates are non-terminal notifications. They carry no correlation
//! id and must never be treated as a completion signal for a request.

use serde::Serialize;

/// Progress through a chunked pass over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Records processed so far
    pub processed: usize,
    /// Total records in the dataset
    pub total: usize,
    /// `processed / total` as a whole percentage, rounded half up
    pub percentage: u32,
}

impl ProgressUpdate {
    /// Creates an update, deriving the rounded percentage.
    pub fn new(processed: usize, total: usize) -> Self {
        Self {
            processed,
            total,
            percentage: Self::percent(processed, total).round() as u32,
        }
    }

    /// Returns the exact completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        Self::percent(self.processed, self.total)
    }

    /// Returns true once every record has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    fn percent(processed: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (processed as f64 / total as f64) * 100.0
        }
    }
}

/// Receiver of progress updates.
///
/// Implemented for any `FnMut(ProgressUpdate)`, so a closure can be passed
/// wherever a sink is expected.
pub trait ProgressSink {
    fn report(&mut self, update: ProgressUpdate);
}

impl<F: FnMut(ProgressUpdate)> ProgressSink for F {
    fn report(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _update: ProgressUpdate) {}
}
