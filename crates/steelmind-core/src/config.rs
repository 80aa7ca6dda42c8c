//! Production configuration constants.
//!
//! This module contains the defaults used by the engines, the dispatcher and
//! the reconnecting channel. Request payloads may override most of them; the
//! values here apply whenever a payload leaves an option out.
//!
//! # Usage
//!
//! ```
//! use steelmind_core::config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ITERATIONS};
//!
//! let chunks = 2_500usize.div_ceil(DEFAULT_BATCH_SIZE);
//! assert_eq!(chunks, 3);
//! assert_eq!(DEFAULT_MAX_ITERATIONS, 100);
//! ```

use std::time::Duration;

// =============================================================================
// Record Processing
// =============================================================================

/// Records processed per chunk by the large-dataset filter.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A progress update is emitted once every this many chunks
/// (after chunk 0, 10, 20, ...).
pub const PROGRESS_EVERY_CHUNKS: usize = 10;

/// Upper bound on records kept by search-result shaping and sampling.
pub const DEFAULT_MAX_POINTS: usize = 10_000;

/// Group key used by aggregation when no `groupBy` path is given.
pub const IMPLICIT_GROUP_KEY: &str = "all";

/// Stratum used by stratified sampling for records without a category.
pub const DEFAULT_CATEGORY: &str = "default";

// =============================================================================
// Clustering
// =============================================================================

/// Cluster count when a request does not specify `k`.
pub const DEFAULT_CLUSTER_COUNT: usize = 5;

/// Iteration cap for k-means.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

// =============================================================================
// Reconnecting Channel
// =============================================================================

/// Base reconnect delay. Attempt `n` waits `n * RECONNECT_BASE_DELAY`.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Consecutive failed connections tolerated before reconnecting stops.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

// =============================================================================
// Performance Tracker
// =============================================================================

/// Maximum samples kept per tracked name (prevents unbounded growth).
pub const MAX_TRACKER_SAMPLES: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_interval_spans_ten_batches() {
        // One update per 10_000 records at the default batch size
        assert_eq!(DEFAULT_BATCH_SIZE * PROGRESS_EVERY_CHUNKS, 10_000);
    }

    #[test]
    fn test_reconnect_backoff_is_bounded() {
        // Last scheduled reconnect waits 5 * 2s = 10s
        let worst = RECONNECT_BASE_DELAY * MAX_RECONNECT_ATTEMPTS;
        assert_eq!(worst, Duration::from_secs(10));
    }

    #[test]
    fn test_max_points_covers_default_batch() {
        let max_points = DEFAULT_MAX_POINTS;
        assert!(max_points >= DEFAULT_BATCH_SIZE);
    }
}
