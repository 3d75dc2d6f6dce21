//! Microbenchmarks for cube operations.
//!
//! Compares slices that prune at the root with slices resolved at the
//! buckets, and pivots that follow the tree layout with ones that do not.
//!
//! Run with: `cargo bench -p playcube`

#![allow(missing_docs)]

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use playcube::{
    Category, Dimension, Down, NumericField, Play, PlayGenerator, PlayType, Range, Store,
};

fn plays(count: usize) -> Vec<Play> {
    PlayGenerator::new(0x5eed).plays(count)
}

fn loaded(count: usize) -> Store {
    let mut store = Store::new();
    store.extend(plays(count)).unwrap();
    store
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert/plays");

    for count in [1_000, 10_000, 100_000] {
        let input = plays(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter_batched(
                || input.clone(),
                |input| {
                    let mut store = Store::new();
                    store.extend(input).unwrap();
                    black_box(store)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_slice(c: &mut Criterion) {
    let store = loaded(50_000);
    let mut group = c.benchmark_group("slice");

    group.bench_function("root_dimension", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                store.slice(black_box(Category::Down(Down::Third)));
                store
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("bucket_dimension", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                store.slice(black_box(Category::PlayType(PlayType::RunMiddle)));
                store
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("range", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                store.slice_range(NumericField::DistanceGained, black_box(Range::new(0, 10)));
                store
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_pivot(c: &mut Criterion) {
    let store = loaded(50_000);
    let mut group = c.benchmark_group("pivot");

    let cases = [
        ("down", vec![Dimension::Down]),
        ("play_type", vec![Dimension::PlayType]),
        ("down_distance", vec![Dimension::Down, Dimension::Distance]),
        ("distance_down", vec![Dimension::Distance, Dimension::Down]),
    ];

    for (name, dimensions) in cases {
        group.bench_function(name, |b| {
            b.iter_batched(
                || store.clone(),
                |mut store| {
                    store.pivot_by(black_box(&dimensions)).unwrap();
                    store
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_cursor(c: &mut Criterion) {
    let store = loaded(50_000);

    c.bench_function("cursor/full_walk", |b| {
        b.iter(|| {
            let records: usize = store.cursor().map(|group| group.len()).sum();
            black_box(records)
        });
    });
}

criterion_group!(benches, bench_insert, bench_slice, bench_pivot, bench_cursor);
criterion_main!(benches);
