//! Statistical reductions over the time axis.
//!
//! Each reducer collapses an observation stack to one layer using only the
//! valid observations of each pixel:
//! - **Median**: robust to residual cloud and shadow, the usual default
//! - **Mean**: smooth, but pulled by any unmasked outlier
//! - **Min**: darkest observation (suppresses bright cloud remnants)
//! - **Max**: brightest observation (greenest-pixel style composites on indices)

use serde::{Deserialize, Serialize};
use stack_common::CommonError;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{CompositeConfig, EmptyStackPolicy};
use crate::error::{CompositeError, Result};
use crate::tiling::{gather, map_tiles, Tile, TileOutput};
use crate::types::{CompositeGrid, Layer, ObservationStack, ReducedComposite};

/// Reduction applied to each pixel's valid observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalReducer {
    Median,
    Mean,
    Min,
    Max,
}

impl TemporalReducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl FromStr for TemporalReducer {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "mean" | "average" => Ok(Self::Mean),
            "min" | "minimum" => Ok(Self::Min),
            "max" | "maximum" => Ok(Self::Max),
            other => Err(CommonError::invalid_parameter(
                "reducer",
                format!("unknown reducer '{other}'"),
            )),
        }
    }
}

impl fmt::Display for TemporalReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reduce a stack along time.
///
/// Pixels with no valid observation are invalid in the result and carry
/// `config.fill_value`. An empty stack follows `config.empty_stack`.
pub fn reduce(
    stack: &ObservationStack,
    reducer: TemporalReducer,
    config: &CompositeConfig,
) -> Result<ReducedComposite> {
    let shape = stack.shape();
    let fill_value = config.fill_value;

    if stack.is_empty() {
        return match config.empty_stack {
            EmptyStackPolicy::Error => Err(CompositeError::EmptyInput),
            EmptyStackPolicy::AllInvalid => Ok(ReducedComposite {
                grid: CompositeGrid::all_invalid(shape, fill_value),
                counts: vec![0; shape.pixel_count()],
            }),
        };
    }

    debug!(
        layers = stack.len(),
        pixels = shape.pixel_count(),
        reducer = %reducer,
        "Reducing observation stack"
    );

    let layers = stack.layers();
    let parts = map_tiles(shape, config, |tile| {
        let mut out = TileOutput::new(shape.bands, tile.pixel_count(), fill_value, 0u32);
        match reducer {
            TemporalReducer::Median => median_tile(layers, tile, &mut out),
            _ => accumulate_tile(layers, reducer, tile, &mut out),
        }
        out
    });
    let (grid, counts) = gather(shape, fill_value, parts);

    info!(
        reducer = %reducer,
        layers = stack.len(),
        valid = grid.valid_count(),
        "Reduced composite"
    );

    Ok(ReducedComposite { grid, counts })
}

/// Mean/min/max as one accumulator pass per layer.
fn accumulate_tile(
    layers: &[Layer],
    reducer: TemporalReducer,
    tile: &Tile,
    out: &mut TileOutput<u32>,
) {
    let range = tile.pixel_range();
    let n = out.valid.len();
    let bands = out.values.len() / n.max(1);
    let init = match reducer {
        TemporalReducer::Min => f64::INFINITY,
        TemporalReducer::Max => f64::NEG_INFINITY,
        _ => 0.0,
    };
    let mut acc = vec![init; bands * n];

    for layer in layers {
        let plane = layer.shape().pixel_count();
        let values = layer.values();
        let layer_valid = &layer.valid()[range.clone()];
        for (i, &is_valid) in layer_valid.iter().enumerate() {
            if !is_valid {
                continue;
            }
            out.aux[i] += 1;
            let p = range.start + i;
            for band in 0..bands {
                let v = f64::from(values[band * plane + p]);
                let slot = &mut acc[band * n + i];
                match reducer {
                    TemporalReducer::Min => *slot = slot.min(v),
                    TemporalReducer::Max => *slot = slot.max(v),
                    _ => *slot += v,
                }
            }
        }
    }

    for i in 0..n {
        let count = out.aux[i];
        if count == 0 {
            continue;
        }
        out.valid[i] = true;
        for band in 0..bands {
            let a = acc[band * n + i];
            out.values[band * n + i] = match reducer {
                TemporalReducer::Mean => (a / f64::from(count)) as f32,
                _ => a as f32,
            };
        }
    }
}

/// Median needs every valid value of a pixel at once.
fn median_tile(layers: &[Layer], tile: &Tile, out: &mut TileOutput<u32>) {
    let range = tile.pixel_range();
    let n = out.valid.len();
    let bands = out.values.len() / n.max(1);
    let mut scratch: Vec<f32> = Vec::with_capacity(layers.len());

    for (i, p) in range.enumerate() {
        let count = layers.iter().filter(|l| l.valid()[p]).count() as u32;
        out.aux[i] = count;
        if count == 0 {
            continue;
        }
        out.valid[i] = true;
        for band in 0..bands {
            scratch.clear();
            scratch.extend(
                layers
                    .iter()
                    .filter(|l| l.valid()[p])
                    .map(|l| l.values()[band * l.shape().pixel_count() + p]),
            );
            if let Some(m) = median_of(&mut scratch) {
                out.values[band * n + i] = m;
            }
        }
    }
}

/// Median of a slice, averaging the two middle values for even lengths.
/// Sorts the slice in place.
fn median_of(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}
