//! Benchmarks for temporal selection and reduction.
//!
//! Run with: cargo bench --package composite-processor --bench composite_benchmarks

use chrono::Duration;
use composite_processor::{
    reduce, CompositeConfig, GridShape, Layer, NearestValueResolver, ObservationStack,
    SelectionMode, TemporalReducer,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use test_utils::{create_cloud_mask, create_reflectance_grid, reference_time, times_around};

/// Cloudy stack of reflectance layers, one per revisit around the reference time.
fn generate_stack(bands: usize, size: usize, layers: usize, cloud_fraction: f32) -> ObservationStack {
    let shape = GridShape::new(bands, size, size);
    let layers = times_around(reference_time(), layers, 5)
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let seed = i as u32 * 17;
            let values = (0..bands)
                .flat_map(|b| create_reflectance_grid(size, size, seed + b as u32))
                .collect();
            let mask = create_cloud_mask(size, size, seed, cloud_fraction);
            Layer::new(t, shape, values, mask).unwrap()
        })
        .collect();
    ObservationStack::new(shape, layers).unwrap()
}

// =============================================================================
// SELECTION BENCHMARKS
// =============================================================================

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    group.sample_size(20);

    let scenarios = [
        // (bands, size, layers, cloud_fraction, name)
        (1, 256, 12, 0.5, "tile_256_12_layers"),
        (4, 512, 12, 0.5, "tile_512_4_bands"),
        (1, 1024, 24, 0.7, "scene_1024_cloudy"),
    ];

    let resolver = NearestValueResolver::default();
    let reference = reference_time() + Duration::hours(60);

    for (bands, size, layers, cloud_fraction, name) in scenarios {
        let stack = generate_stack(bands, size, layers, cloud_fraction);
        group.throughput(Throughput::Elements((size * size) as u64));

        for mode in [SelectionMode::First, SelectionMode::Last, SelectionMode::Nearest] {
            group.bench_with_input(BenchmarkId::new(name, mode), &stack, |b, stack| {
                b.iter(|| resolver.resolve(black_box(stack), mode, Some(reference)).unwrap());
            });
        }
    }

    group.finish();
}

// =============================================================================
// TILING BENCHMARKS
// =============================================================================

fn bench_tiling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiling");
    group.sample_size(20);

    let stack = generate_stack(1, 1024, 12, 0.5);
    let reference = reference_time();
    group.throughput(Throughput::Elements(1024 * 1024));

    for tile_rows in [64, 256, 1024] {
        let resolver = NearestValueResolver::new(CompositeConfig {
            tile_rows,
            parallel_threshold: 1,
            ..CompositeConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("nearest", tile_rows), &stack, |b, stack| {
            b.iter(|| resolver.nearest(black_box(stack), reference).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// REDUCTION BENCHMARKS
// =============================================================================

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction");
    group.sample_size(20);

    let stack = generate_stack(1, 512, 12, 0.4);
    let config = CompositeConfig::default();
    group.throughput(Throughput::Elements(512 * 512));

    for reducer in [
        TemporalReducer::Median,
        TemporalReducer::Mean,
        TemporalReducer::Min,
        TemporalReducer::Max,
    ] {
        group.bench_with_input(BenchmarkId::new("tile_512", reducer), &stack, |b, stack| {
            b.iter(|| reduce(black_box(stack), reducer, &config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_selection, bench_tiling, bench_reduction);
criterion_main!(benches);
