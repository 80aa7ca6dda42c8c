//! Pairwise similarity matrices.

use super::distance::{cosine_similarity, euclidean_distance, manhattan_distance};
use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// Similarity measure used to fill the matrix.
///
/// Distance metrics are mapped to similarities with `1 / (1 + d)`, which is
/// `1` at distance zero and approaches `0` as the distance grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
    Manhattan,
}

impl SimilarityMetric {
    /// Similarity between two vectors under this metric.
    pub fn similarity(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
            SimilarityMetric::Manhattan => 1.0 / (1.0 + manhattan_distance(a, b)),
        }
    }
}

/// Summary over every cell of the matrix, diagonal included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatrixStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Full n x n similarity matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    /// Row-major cells; `matrix[i][j] == matrix[j][i]` and the diagonal is 1
    pub matrix: Vec<Vec<f64>>,
    /// Number of input vectors
    pub size: usize,
    pub metric: SimilarityMetric,
    pub statistics: MatrixStatistics,
}

/// Builds the symmetric similarity matrix for `embeddings`.
///
/// Each unordered pair is computed once and mirrored. The diagonal is set to
/// exactly `1.0` for every metric, including cosine on zero vectors.
///
/// # Errors
///
/// Returns [`InputError::NoEmbeddings`] for an empty batch.
pub fn compute_similarity_matrix(
    embeddings: &[Vec<f64>],
    metric: SimilarityMetric,
) -> Result<SimilarityMatrix, InputError> {
    if embeddings.is_empty() {
        return Err(InputError::NoEmbeddings);
    }

    let n = embeddings.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let similarity = metric.similarity(&embeddings[i], &embeddings[j]);
            matrix[i][j] = similarity;
            matrix[j][i] = similarity;
        }
    }

    let statistics = summarize(&matrix, n);

    Ok(SimilarityMatrix {
        matrix,
        size: n,
        metric,
        statistics,
    })
}

fn summarize(matrix: &[Vec<f64>], n: usize) -> MatrixStatistics {
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &value in matrix.iter().flatten() {
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    MatrixStatistics {
        mean: sum / (n * n) as f64,
        min,
        max,
    }
}
