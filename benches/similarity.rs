use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use neardup::{
    EmbeddingVector, HashAlgorithm, HashBundle, HashSignature, Signal, SimilarityConfig,
    SimilarityStrategy, find_edges,
};

/// Deterministic pseudo-random unit vector.
fn synthetic_vector(seed: u64, dim: usize) -> Vec<f32> {
    let mut values: Vec<f32> = (0..dim as u64)
        .map(|i| {
            let h = fxhash::hash64(&(seed, i));
            (h & 0xFFFF) as f32 / 65535.0 - 0.5
        })
        .collect();
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    for v in &mut values {
        *v /= norm;
    }
    values
}

fn embedding_signals(count: usize, dim: usize) -> Vec<Signal> {
    (0..count)
        .map(|i| {
            Signal::Embedding(EmbeddingVector {
                image_id: format!("img-{i:05}"),
                values: synthetic_vector(i as u64, dim),
                dimension: dim,
                model_id: "projection-bench".to_string(),
                reduced_precision: false,
            })
        })
        .collect()
}

fn hash_signals(count: usize) -> Vec<Signal> {
    (0..count)
        .map(|i| {
            let id = format!("img-{i:05}");
            let bits: Vec<u8> = (0..8u64)
                .map(|b| fxhash::hash64(&(i as u64, b)) as u8)
                .collect();
            Signal::Hashes(HashBundle {
                image_id: id.clone(),
                signatures: vec![HashSignature {
                    image_id: id,
                    algorithm: HashAlgorithm::Content,
                    bits,
                    bit_len: 64,
                }],
            })
        })
        .collect()
}

/// Benchmark the exhaustive block scan over embedding vectors.
fn bench_block_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_scan");
    let cfg = SimilarityConfig::default();
    let dim = 384;

    for size in [250, 500, 1000, 2000].iter() {
        let signals = embedding_signals(*size, dim);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("embeddings_{}", size), |b| {
            b.iter(|| {
                let edges =
                    find_edges(SimilarityStrategy::BlockScan, black_box(&signals), &cfg)
                        .expect("scan succeeds");
                black_box(edges);
            });
        });
    }

    group.finish();
}

/// Benchmark approximate-index build plus query at the same scales as the
/// block scan, so the crossover point is visible in one report.
fn bench_approximate_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("approximate_index");
    let cfg = SimilarityConfig::default();
    let dim = 384;

    for size in [250, 500, 1000, 2000].iter() {
        let signals = embedding_signals(*size, dim);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("embeddings_{}", size), |b| {
            b.iter(|| {
                let edges =
                    find_edges(SimilarityStrategy::ApproximateIndex, black_box(&signals), &cfg)
                        .expect("index succeeds");
                black_box(edges);
            });
        });
    }

    group.finish();
}

/// Benchmark the hash-signature scan.
fn bench_hash_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_scan");
    let cfg = SimilarityConfig::default();

    for size in [500, 1000, 2000, 4000].iter() {
        let signals = hash_signals(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("bundles_{}", size), |b| {
            b.iter(|| {
                let edges =
                    find_edges(SimilarityStrategy::BlockScan, black_box(&signals), &cfg)
                        .expect("scan succeeds");
                black_box(edges);
            });
        });
    }

    group.finish();
}

/// Benchmark block-size sensitivity at a fixed corpus size.
fn bench_block_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_size");
    let dim = 384;
    let signals = embedding_signals(1000, dim);

    for block_size in [10, 25, 50, 100].iter() {
        let mut cfg = SimilarityConfig::default();
        cfg.block_size = *block_size;

        group.bench_function(format!("block_{}", block_size), |b| {
            b.iter(|| {
                let edges =
                    find_edges(SimilarityStrategy::BlockScan, black_box(&signals), &cfg)
                        .expect("scan succeeds");
                black_box(edges);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_block_scan,
    bench_approximate_index,
    bench_hash_scan,
    bench_block_size
);
criterion_main!(benches);
