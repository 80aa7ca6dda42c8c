//! K-means clustering.
//!
//! Centroids are seeded by drawing, per dimension, a uniform value between
//! that dimension's observed minimum and maximum over the whole batch
//! (bounding-box initialization, not k-means++). The random source is a
//! parameter so callers can pin outcomes with a seeded RNG.

use super::distance::euclidean_distance;
use crate::error::InputError;
use rand::Rng;
use serde::Serialize;

/// A point assigned to a cluster, with its position in the input batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMember {
    pub point: Vec<f64>,
    pub original_index: usize,
}

/// One cluster of the final partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    /// Cluster id in `0..k`
    pub id: usize,
    pub centroid: Vec<f64>,
    /// Number of member points
    pub size: usize,
    pub points: Vec<ClusterMember>,
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub clusters: Vec<Cluster>,
    /// Cluster id for every input point, in input order
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Iterations actually run
    pub iterations: usize,
    /// True when assignments stabilized before the iteration cap
    pub converged: bool,
}

/// Partitions `points` into `k` clusters.
///
/// Every point starts assigned to cluster 0. Each iteration reassigns points
/// to their nearest centroid by Euclidean distance (the lowest cluster index
/// wins ties) and then moves every non-empty cluster's centroid to the mean of
/// its members; an empty cluster keeps its centroid. Iteration stops once no
/// assignment changes or `max_iterations` is reached, and `converged` reports
/// `iterations < max_iterations`.
///
/// Dimensionality is taken from the first point.
///
/// # Errors
///
/// - [`InputError::NoPoints`] for an empty batch
/// - [`InputError::InvalidClusterCount`] when `k` is zero
pub fn k_means<R: Rng + ?Sized>(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Result<ClusteringResult, InputError> {
    let first = points.first().ok_or(InputError::NoPoints)?;
    if k == 0 {
        return Err(InputError::InvalidClusterCount);
    }
    let dimensions = first.len();

    let mut centroids = init_centroids(points, dimensions, k, rng);
    let mut assignments = vec![0usize; points.len()];
    let mut changed = true;
    let mut iterations = 0;

    while changed && iterations < max_iterations {
        changed = false;

        for (i, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        update_centroids(points, &assignments, &mut centroids, dimensions);
        iterations += 1;
    }

    let mut clusters: Vec<Cluster> = centroids
        .iter()
        .enumerate()
        .map(|(id, centroid)| Cluster {
            id,
            centroid: centroid.clone(),
            size: 0,
            points: Vec::new(),
        })
        .collect();

    for (original_index, (&cluster_id, point)) in assignments.iter().zip(points).enumerate() {
        let cluster = &mut clusters[cluster_id];
        cluster.size += 1;
        cluster.points.push(ClusterMember {
            point: point.clone(),
            original_index,
        });
    }

    Ok(ClusteringResult {
        clusters,
        assignments,
        centroids,
        iterations,
        converged: iterations < max_iterations,
    })
}

/// Draws `k` centroids uniformly inside the batch's bounding box.
fn init_centroids<R: Rng + ?Sized>(
    points: &[Vec<f64>],
    dimensions: usize,
    k: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    let mut mins = vec![f64::INFINITY; dimensions];
    let mut maxs = vec![f64::NEG_INFINITY; dimensions];
    for point in points {
        for (j, &value) in point.iter().take(dimensions).enumerate() {
            mins[j] = mins[j].min(value);
            maxs[j] = maxs[j].max(value);
        }
    }

    (0..k)
        .map(|_| {
            mins.iter()
                .zip(&maxs)
                .map(|(&min, &max)| min + rng.gen::<f64>() * (max - min))
                .collect()
        })
        .collect()
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut nearest = 0;
    for (j, centroid) in centroids.iter().enumerate() {
        let distance = euclidean_distance(point, centroid);
        // Strict comparison keeps the lowest index on ties
        if distance < min_distance {
            min_distance = distance;
            nearest = j;
        }
    }
    nearest
}

fn update_centroids(
    points: &[Vec<f64>],
    assignments: &[usize],
    centroids: &mut [Vec<f64>],
    dimensions: usize,
) {
    let k = centroids.len();
    let mut sums = vec![vec![0.0; dimensions]; k];
    let mut counts = vec![0usize; k];

    for (point, &cluster_id) in points.iter().zip(assignments) {
        counts[cluster_id] += 1;
        for (sum, &value) in sums[cluster_id].iter_mut().zip(point) {
            *sum += value;
        }
    }

    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count == 0 {
            continue;
        }
        *centroid = sum.into_iter().map(|s| s / count as f64).collect();
    }
}
