use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rangeflow_core::execution::{partition_keys, prepare_keys, KeyRange, ProgressCounter};
use std::sync::Arc;

fn benchmark_partition_dense_keys(c: &mut Criterion) {
    let keys: Vec<i64> = (1..=1_000_000).collect();
    c.bench_function("partition_1m_dense_keys_16_workers", |b| {
        b.iter(|| partition_keys(black_box(&keys), black_box(16)))
    });
}

fn benchmark_prepare_shuffled_keys(c: &mut Criterion) {
    let keys: Vec<i64> = (0..100_000i64).map(|i| (i * 7_919) % 100_003).collect();
    c.bench_function("prepare_100k_shuffled_keys", |b| {
        b.iter(|| prepare_keys(black_box(keys.clone())))
    });
}

fn benchmark_block_iteration(c: &mut Criterion) {
    let partition = KeyRange::new(0, 10_000_000).unwrap();
    c.bench_function("iterate_blocks_10m_span", |b| {
        b.iter(|| partition.blocks(black_box(1_000)).map(|blocks| blocks.count()))
    });
}

fn benchmark_progress_increment(c: &mut Criterion) {
    let progress = Arc::new(ProgressCounter::default());
    progress.set_total(u64::MAX);
    c.bench_function("progress_increment_and_percentile", |b| {
        b.iter(|| {
            progress.increment();
            black_box(progress.percentile())
        })
    });
}

criterion_group!(
    benches,
    benchmark_partition_dense_keys,
    benchmark_prepare_shuffled_keys,
    benchmark_block_iteration,
    benchmark_progress_increment
);
criterion_main!(benches);
