//! Benchmarks for the numeric engines and record filtering.
//!
//! Run with: `cargo bench -p steelmind-core --bench numeric`
//!
//! These benchmarks measure:
//! - Per-dimension statistics over embedding batches
//! - K-means clustering at varying k
//! - Similarity matrix construction (quadratic in batch size)
//! - Chunked filtering of large record batches

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use steelmind_core::numeric::{
    calculate_embedding_stats, compute_similarity_matrix, k_means, SimilarityMetric,
};
use steelmind_core::progress::NoProgress;
use steelmind_core::records::{filter_records, FilterOperator, FilterOptions, FilterPredicate};

// =============================================================================
// Benchmark Configuration
// =============================================================================

/// Dimensionality of generated vectors (typical sentence-embedding size).
const DIMENSIONS: usize = 384;

/// Seed for all generated data, so runs are comparable.
const DATA_SEED: u64 = 42;

// =============================================================================
// Test Data Generation
// =============================================================================

fn random_vectors(count: usize, dimensions: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(DATA_SEED);
    (0..count)
        .map(|_| (0..dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn random_records(count: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(DATA_SEED);
    let collections = ["notes", "docs", "code", "mail"];
    (0..count)
        .map(|i| {
            json!({
                "id": i,
                "score": rng.gen::<f64>(),
                "collection": collections[i % collections.len()],
                "metadata": {"author": format!("user-{}", i % 17)}
            })
        })
        .collect()
}

// =============================================================================
// Numeric Benchmarks
// =============================================================================

fn bench_embedding_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats/by_count");

    for count in [100, 1_000, 5_000] {
        let vectors = random_vectors(count, DIMENSIONS);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &vectors, |b, vectors| {
            b.iter(|| calculate_embedding_stats(black_box(vectors)).unwrap());
        });
    }
    group.finish();
}

/// Fixed batch, varying k. Low-dimensional points keep iteration counts
/// comparable across k.
fn bench_k_means(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans/by_k");
    group.sample_size(20);

    let points = random_vectors(2_000, 8);
    for k in [2, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(DATA_SEED);
                k_means(black_box(&points), k, 100, &mut rng).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_similarity_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity/by_size");
    group.sample_size(20);

    for size in [50, 200, 500] {
        let vectors = random_vectors(size, DIMENSIONS);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &vectors, |b, vectors| {
            b.iter(|| compute_similarity_matrix(black_box(vectors), SimilarityMetric::Cosine).unwrap());
        });
    }
    group.finish();
}

// =============================================================================
// Record Benchmarks
// =============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/by_count");

    let filters = vec![
        FilterPredicate::new("score", FilterOperator::Gte, json!(0.5)),
        FilterPredicate::new("collection", FilterOperator::In, json!(["notes", "docs"])),
        FilterPredicate::new("metadata.author", FilterOperator::StartsWith, json!("USER-1")),
    ];

    for count in [10_000, 100_000] {
        let records = random_records(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| {
                filter_records(
                    black_box(records),
                    &filters,
                    FilterOptions::default(),
                    &mut NoProgress,
                )
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_embedding_stats,
    bench_k_means,
    bench_similarity_matrix,
    bench_filter
);
criterion_main!(benches);
