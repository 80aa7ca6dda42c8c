//! # Steelmind Core
//!
//! Offline numeric data-processing engine for search analytics.
//!
//! This crate provides the engines behind the Steelmind dashboard worker:
//! vector statistics, k-means clustering, similarity matrices, and
//! filter/aggregate/sample/shape operations over JSON record batches, plus the
//! message dispatcher that fronts them and a reconnecting channel for the
//! collaboration layer.
//!
//! ## Modules
//!
//! - [`numeric`] - Distances, per-dimension statistics, k-means, similarity matrices
//! - [`records`] - Dot-path access, filtering, aggregation, sampling, search-result shaping
//! - [`dispatch`] - Worker message protocol, dispatcher and worker pool
//! - [`channel`] - Reconnecting pub/sub channel state machine
//! - [`tracker`] - Named timing marks and per-operation duration summaries
//! - [`progress`] - Progress updates for chunked processing
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types for engines, dispatch, channel and pool

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod numeric;
pub mod progress;
pub mod records;
pub mod tracker;

#[cfg(test)]
mod test_utils;
