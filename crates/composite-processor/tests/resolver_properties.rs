//! Property tests for temporal selection over synthetic cloudy stacks.
//!
//! Every synthetic value encodes the index of the layer it came from, so the
//! source of each composite pixel can be checked against a brute-force scan.

use chrono::{DateTime, Duration, Utc};
use composite_processor::{
    reduce, CompositeConfig, CompositeError, EmptyStackPolicy, GridShape, Layer,
    NearestValueResolver, ObservationStack, ResolvedComposite, SelectionMode, TemporalReducer,
};
use test_utils::{
    create_cloud_mask, create_layer_values, decode_layer_value, reference_time, shape,
    times_around,
};

fn grid_shape((bands, rows, cols): (usize, usize, usize)) -> GridShape {
    GridShape::new(bands, rows, cols)
}

/// Stack of `times.len()` layers with ~`cloud_fraction` of each layer masked.
fn cloudy_stack(
    shape: GridShape,
    times: &[DateTime<Utc>],
    cloud_fraction: f32,
    seed: u32,
) -> ObservationStack {
    let layers = times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            Layer::new(
                t,
                shape,
                create_layer_values(i, shape.bands, shape.rows, shape.cols),
                create_cloud_mask(shape.cols, shape.rows, seed + i as u32, cloud_fraction),
            )
            .unwrap()
        })
        .collect();
    ObservationStack::new(shape, layers).unwrap()
}

/// Layer indices valid at a pixel, in stack order.
fn valid_layers(stack: &ObservationStack, pixel: usize) -> Vec<usize> {
    stack
        .layers()
        .iter()
        .enumerate()
        .filter(|(_, l)| l.valid()[pixel])
        .map(|(i, _)| i)
        .collect()
}

fn source_layer(out: &ResolvedComposite, pixel: usize) -> Option<usize> {
    out.grid.valid[pixel].then(|| decode_layer_value(out.grid.values[pixel]))
}

fn abs_delta(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn standard_stack() -> ObservationStack {
    let times = times_around(reference_time(), 6, 5);
    cloudy_stack(grid_shape(shape::TALL), &times, 0.6, 11)
}

#[test]
fn test_first_matches_earliest_valid_layer() {
    let stack = standard_stack();
    let out = NearestValueResolver::default().first(&stack).unwrap();

    for pixel in 0..stack.shape().pixel_count() {
        let expected = valid_layers(&stack, pixel).first().copied();
        assert_eq!(source_layer(&out, pixel), expected, "pixel {pixel}");
        assert_eq!(
            out.timestamps[pixel],
            expected.map(|i| stack.layers()[i].timestamp())
        );
    }
}

#[test]
fn test_last_matches_latest_valid_layer() {
    let stack = standard_stack();
    let out = NearestValueResolver::default().last(&stack).unwrap();

    for pixel in 0..stack.shape().pixel_count() {
        let expected = valid_layers(&stack, pixel).last().copied();
        assert_eq!(source_layer(&out, pixel), expected, "pixel {pixel}");
        assert_eq!(
            out.timestamps[pixel],
            expected.map(|i| stack.layers()[i].timestamp())
        );
    }
}

#[test]
fn test_nearest_minimises_time_distance() {
    let stack = standard_stack();
    // Halfway between two acquisitions, so ties are common.
    let reference = reference_time() + Duration::hours(60);
    let out = NearestValueResolver::default()
        .nearest(&stack, reference)
        .unwrap();

    let mut ties = 0;
    for pixel in 0..stack.shape().pixel_count() {
        let candidates = valid_layers(&stack, pixel);
        let Some(picked) = out.timestamps[pixel] else {
            assert!(candidates.is_empty());
            continue;
        };
        let picked_distance = abs_delta(picked, reference);
        for &i in &candidates {
            let t = stack.layers()[i].timestamp();
            let d = abs_delta(t, reference);
            assert!(picked_distance <= d, "pixel {pixel}: {picked} beaten by {t}");
            if d == picked_distance && t != picked {
                assert!(picked < t, "pixel {pixel}: tie should keep the earlier time");
                ties += 1;
            }
        }
        // Every band must come from the layer that supplied the timestamp.
        let source = source_layer(&out, pixel).unwrap();
        assert_eq!(stack.layers()[source].timestamp(), picked);
        let band1 = out.grid.values[stack.shape().pixel_count() + pixel];
        assert_eq!(decode_layer_value(band1), source);
    }
    assert!(ties > 0, "fixture should produce equidistant candidates");
}

#[test]
fn test_resolver_is_idempotent() {
    let stack = standard_stack();
    let resolver = NearestValueResolver::default();
    for mode in [SelectionMode::First, SelectionMode::Last, SelectionMode::Nearest] {
        let a = resolver.resolve(&stack, mode, Some(reference_time())).unwrap();
        let b = resolver.resolve(&stack, mode, Some(reference_time())).unwrap();
        let bits = |o: &ResolvedComposite| o.grid.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.grid.valid, b.grid.valid);
        assert_eq!(a.timestamps, b.timestamps);
    }
}

#[test]
fn test_always_masked_pixels_stay_invalid() {
    let times = times_around(reference_time(), 4, 5);
    let shape = GridShape::new(1, 6, 6);
    let mut layers = Vec::new();
    for (i, &t) in times.iter().enumerate() {
        let mut mask = vec![true; 36];
        // Pixels 0 and 35 are clouded in every layer.
        mask[0] = false;
        mask[35] = false;
        layers.push(Layer::new(t, shape, create_layer_values(i, 1, 6, 6), mask).unwrap());
    }
    let stack = ObservationStack::new(shape, layers).unwrap();
    let resolver = NearestValueResolver::default();

    for mode in [SelectionMode::First, SelectionMode::Last, SelectionMode::Nearest] {
        let out = resolver.resolve(&stack, mode, Some(reference_time())).unwrap();
        for pixel in [0, 35] {
            assert!(!out.grid.valid[pixel], "{mode}: pixel {pixel}");
            assert!(out.grid.values[pixel].is_nan());
            assert_eq!(out.timestamps[pixel], None);
        }
        assert_eq!(out.grid.valid_count(), 34);
    }

    let median = reduce(&stack, TemporalReducer::Median, &CompositeConfig::default()).unwrap();
    assert_eq!(median.count(0, 0), 0);
    assert!(!median.grid.is_valid(5, 5));
}

#[test]
fn test_single_valid_layer_wins_in_every_mode() {
    let times = times_around(reference_time(), 3, 10);
    let shape = GridShape::single_band(1, 1);
    let layers = vec![
        Layer::new(times[0], shape, vec![1.0], vec![false]).unwrap(),
        Layer::new(times[1], shape, vec![2.0], vec![true]).unwrap(),
        Layer::new(times[2], shape, vec![3.0], vec![false]).unwrap(),
    ];
    let stack = ObservationStack::new(shape, layers).unwrap();
    let resolver = NearestValueResolver::default();

    let first = resolver.first(&stack).unwrap();
    let last = resolver.last(&stack).unwrap();
    let nearest = resolver.nearest(&stack, times[2]).unwrap();
    for out in [&first, &last, &nearest] {
        assert_eq!(out.grid.value(0, 0, 0), Some(2.0));
        assert_eq!(out.timestamp(0, 0), Some(times[1]));
    }
}

#[test]
fn test_equidistant_neighbours_resolve_to_earlier() {
    let reference = reference_time();
    let t1 = reference - Duration::days(3);
    let t3 = reference + Duration::days(3);
    let shape = GridShape::single_band(1, 1);
    let stack = ObservationStack::new(
        shape,
        vec![
            Layer::new(t3, shape, vec![30.0], vec![true]).unwrap(),
            Layer::new(t1, shape, vec![10.0], vec![true]).unwrap(),
        ],
    )
    .unwrap();

    let out = NearestValueResolver::default()
        .nearest(&stack, reference)
        .unwrap();
    assert_eq!(out.grid.value(0, 0, 0), Some(10.0));
    assert_eq!(out.timestamp(0, 0), Some(t1));
    assert_eq!(out.offset_from(reference), vec![Some(Duration::days(-3))]);
}

#[test]
fn test_empty_stack_returns_invalid_grid_of_caller_shape() {
    let shape = grid_shape(shape::RGB_TILE);
    let empty = ObservationStack::empty(shape).unwrap();
    let resolver = NearestValueResolver::default();

    for mode in [SelectionMode::First, SelectionMode::Last, SelectionMode::Nearest] {
        let out = resolver.resolve(&empty, mode, Some(reference_time())).unwrap();
        assert_eq!(out.grid.shape, shape);
        assert_eq!(out.grid.values.len(), shape.len());
        assert_eq!(out.timestamps.len(), shape.pixel_count());
        assert_eq!(out.grid.valid_count(), 0);
    }

    let strict = NearestValueResolver::new(CompositeConfig {
        empty_stack: EmptyStackPolicy::Error,
        ..CompositeConfig::default()
    });
    assert!(matches!(strict.first(&empty), Err(CompositeError::EmptyInput)));
}

#[test]
fn test_nearest_without_reference_fails_before_empty_check() {
    let empty = ObservationStack::empty(GridShape::single_band(2, 2)).unwrap();
    let err = NearestValueResolver::default()
        .resolve(&empty, SelectionMode::Nearest, None)
        .unwrap_err();
    assert!(matches!(err, CompositeError::MissingParameter(_)));
}

#[test]
fn test_tiled_parallel_matches_single_pass() {
    let stack = standard_stack();
    let serial = NearestValueResolver::default();
    let tiled_config = CompositeConfig {
        tile_rows: 7,
        parallel_threshold: 1,
        ..CompositeConfig::default()
    };
    let tiled = NearestValueResolver::new(tiled_config.clone());

    for mode in [SelectionMode::First, SelectionMode::Last, SelectionMode::Nearest] {
        let a = serial.resolve(&stack, mode, Some(reference_time())).unwrap();
        let b = tiled.resolve(&stack, mode, Some(reference_time())).unwrap();
        let bits = |o: &ResolvedComposite| o.grid.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b), "{mode}");
        assert_eq!(a.timestamps, b.timestamps, "{mode}");
    }

    for reducer in [
        TemporalReducer::Median,
        TemporalReducer::Mean,
        TemporalReducer::Min,
        TemporalReducer::Max,
    ] {
        let a = reduce(&stack, reducer, &CompositeConfig::default()).unwrap();
        let b = reduce(&stack, reducer, &tiled_config).unwrap();
        assert_eq!(a.counts, b.counts, "{reducer}");
        test_utils::assert_slices_approx_eq!(&a.grid.values, &b.grid.values, 1e-3);
    }
}

#[test]
fn test_reductions_bound_by_selections() {
    let stack = standard_stack();
    let config = CompositeConfig::default();
    let min = reduce(&stack, TemporalReducer::Min, &config).unwrap();
    let max = reduce(&stack, TemporalReducer::Max, &config).unwrap();
    let median = reduce(&stack, TemporalReducer::Median, &config).unwrap();
    let first = NearestValueResolver::default().first(&stack).unwrap();

    // Synthetic values grow with layer index, so min is the first valid layer.
    assert_eq!(min.grid.valid, first.grid.valid);
    for pixel in 0..stack.shape().pixel_count() {
        assert_eq!(min.counts[pixel] as usize, valid_layers(&stack, pixel).len());
        if !min.grid.valid[pixel] {
            continue;
        }
        assert_eq!(min.grid.values[pixel], first.grid.values[pixel]);
        assert!(min.grid.values[pixel] <= median.grid.values[pixel]);
        assert!(median.grid.values[pixel] <= max.grid.values[pixel]);
    }
}

#[test]
fn test_mean_matches_brute_force_average() {
    let stack = standard_stack();
    let mean = reduce(&stack, TemporalReducer::Mean, &CompositeConfig::default()).unwrap();
    let plane = stack.shape().pixel_count();

    for pixel in 0..plane {
        let sources = valid_layers(&stack, pixel);
        if sources.is_empty() {
            assert!(!mean.grid.valid[pixel]);
            continue;
        }
        for band in 0..stack.shape().bands {
            let sum: f64 = sources
                .iter()
                .map(|&i| f64::from(stack.layers()[i].values()[band * plane + pixel]))
                .sum();
            // f32 spacing near 5e6 is 0.5
            test_utils::assert_approx_eq!(
                mean.grid.values[band * plane + pixel],
                sum / sources.len() as f64,
                1.0
            );
        }
    }
}
