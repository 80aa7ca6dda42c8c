//! Per-dimension statistics over a batch of embedding vectors.

use crate::error::InputError;
use serde::Serialize;

/// Population statistics for each dimension of a vector batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingStats {
    /// Number of vectors in the batch
    pub count: usize,
    /// Dimensionality, taken from the first vector
    pub dimensions: usize,
    pub means: Vec<f64>,
    pub std_deviations: Vec<f64>,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
    /// Population variance (divisor is `count`, not `count - 1`)
    pub variances: Vec<f64>,
}

/// Computes mean, min, max, variance and standard deviation per dimension.
///
/// Runs in two passes: the first accumulates sums and extrema and finalizes
/// the means, the second accumulates squared deviations from those means.
///
/// Dimensionality is inferred from the first vector. Later vectors are not
/// validated; components past the inferred dimensionality are ignored and a
/// shorter vector simply contributes to fewer dimensions.
///
/// # Errors
///
/// Returns [`InputError::NoEmbeddings`] for an empty batch.
///
/// # Example
///
/// ```
/// use steelmind_core::numeric::calculate_embedding_stats;
///
/// let stats = calculate_embedding_stats(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(stats.means, vec![2.0, 3.0]);
/// assert_eq!(stats.variances, vec![1.0, 1.0]);
/// ```
pub fn calculate_embedding_stats(embeddings: &[Vec<f64>]) -> Result<EmbeddingStats, InputError> {
    let first = embeddings.first().ok_or(InputError::NoEmbeddings)?;
    let dimensions = first.len();
    let count = embeddings.len();

    let mut means = vec![0.0; dimensions];
    let mut mins = vec![f64::INFINITY; dimensions];
    let mut maxs = vec![f64::NEG_INFINITY; dimensions];

    // Pass 1: sums and extrema
    for embedding in embeddings {
        for (j, &value) in embedding.iter().take(dimensions).enumerate() {
            means[j] += value;
            mins[j] = mins[j].min(value);
            maxs[j] = maxs[j].max(value);
        }
    }
    for mean in &mut means {
        *mean /= count as f64;
    }

    // Pass 2: squared deviations
    let mut variances = vec![0.0; dimensions];
    for embedding in embeddings {
        for (j, &value) in embedding.iter().take(dimensions).enumerate() {
            let diff = value - means[j];
            variances[j] += diff * diff;
        }
    }
    for variance in &mut variances {
        *variance /= count as f64;
    }

    let std_deviations = variances.iter().map(|v| v.sqrt()).collect();

    Ok(EmbeddingStats {
        count,
        dimensions,
        means,
        std_deviations,
        mins,
        maxs,
        variances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_two_vector_scenario() {
        let stats = calculate_embedding_stats(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.dimensions, 2);
        assert_eq!(stats.means, vec![2.0, 3.0]);
        assert_eq!(stats.mins, vec![1.0, 2.0]);
        assert_eq!(stats.maxs, vec![3.0, 4.0]);
        assert_eq!(stats.variances, vec![1.0, 1.0]);
        assert_eq!(stats.std_deviations, vec![1.0, 1.0]);
    }

    #[test]
    fn test_empty_batch_is_input_error() {
        assert_eq!(
            calculate_embedding_stats(&[]),
            Err(InputError::NoEmbeddings)
        );
    }

    #[test]
    fn test_single_vector_has_zero_variance() {
        let stats = calculate_embedding_stats(&[vec![0.5, -1.5, 7.0]]).unwrap();
        assert_eq!(stats.means, vec![0.5, -1.5, 7.0]);
        assert!(stats.variances.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mean_bounded_by_extrema_and_std_is_sqrt_variance() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch: Vec<Vec<f64>> = (0..64)
            .map(|_| (0..8).map(|_| rng.gen_range(-10.0..10.0)).collect())
            .collect();

        let stats = calculate_embedding_stats(&batch).unwrap();

        for j in 0..stats.dimensions {
            assert!(stats.mins[j] <= stats.means[j]);
            assert!(stats.means[j] <= stats.maxs[j]);
            assert_eq!(stats.std_deviations[j], stats.variances[j].sqrt());
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = calculate_embedding_stats(&[vec![1.0]]).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("stdDeviations").is_some());
        assert_eq!(json["dimensions"], 1);
    }
}
