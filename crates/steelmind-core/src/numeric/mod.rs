//! Numeric engines over batches of `f64` vectors.
//!
//! - `distance`: Euclidean, Manhattan and cosine primitives
//! - `stats`: per-dimension population statistics
//! - `cluster`: k-means with a caller-supplied random source
//! - `similarity`: symmetric pairwise similarity matrices
//!
//! Every engine is a synchronous pure function. Empty batches are reported as
//! [`InputError`](crate::error::InputError) values rather than panics.
//!
//! # Example
//!
//! ```
//! use steelmind_core::numeric::{compute_similarity_matrix, SimilarityMetric};
//!
//! let result = compute_similarity_matrix(
//!     &[vec![1.0, 0.0], vec![0.0, 1.0]],
//!     SimilarityMetric::Cosine,
//! ).unwrap();
//! assert_eq!(result.matrix[0][1], 0.0);
//! ```

pub mod cluster;
pub mod distance;
pub mod similarity;
pub mod stats;

pub use cluster::{k_means, Cluster, ClusterMember, ClusteringResult};
pub use distance::{cosine_similarity, euclidean_distance, manhattan_distance};
pub use similarity::{compute_similarity_matrix, MatrixStatistics, SimilarityMatrix, SimilarityMetric};
pub use stats::{calculate_embedding_stats, EmbeddingStats};
