//! Distance and similarity primitives over `f64` vectors.
//!
//! All functions iterate over the zipped components of their arguments.
//! Callers are expected to pass equal-length vectors; if the lengths differ,
//! the trailing components of the longer vector are ignored.

/// Euclidean (L2) distance: `sqrt(sum((a_i - b_i)^2))`.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Manhattan (L1) distance: `sum(|a_i - b_i|)`.
pub fn manhattan_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Cosine similarity: `a.b / (|a| |b|)`.
///
/// Returns `0.0` when either vector has zero magnitude, so two zero vectors
/// compare as dissimilar rather than producing `NaN`.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
