//! Temporal nearest-value resolution.
//!
//! For every pixel, pick the value of one observation according to a
//! selection rule and record that observation's timestamp:
//!
//! - **First**: earliest valid observation
//! - **Last**: latest valid observation
//! - **Nearest**: valid observation closest in time to a reference time;
//!   equidistant candidates resolve to the earlier one
//!
//! The work is organised as one grid-wide pass per layer, each pass touching
//! every pixel of the tile once, instead of a per-pixel scan over the stack.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stack_common::CommonError;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{CompositeConfig, EmptyStackPolicy};
use crate::error::{CompositeError, Result};
use crate::tiling::{gather, map_tiles, Tile, TileOutput};
use crate::types::{CompositeGrid, Layer, ObservationStack, ResolvedComposite};

/// Which observation a pixel takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    First,
    Last,
    Nearest,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Nearest => "nearest",
        }
    }
}

impl FromStr for SelectionMode {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" | "earliest" => Ok(Self::First),
            "last" | "latest" => Ok(Self::Last),
            "nearest" => Ok(Self::Nearest),
            other => Err(CommonError::invalid_parameter(
                "mode",
                format!("unknown selection mode '{other}'"),
            )),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolves an observation stack into a single layer plus a timestamp grid.
#[derive(Debug, Clone, Default)]
pub struct NearestValueResolver {
    config: CompositeConfig,
}

impl NearestValueResolver {
    pub fn new(config: CompositeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Resolve `stack` with the given mode.
    ///
    /// `reference_time` is required for [`SelectionMode::Nearest`] and
    /// ignored otherwise.
    ///
    /// # Errors
    ///
    /// - `MissingParameter` if `Nearest` is requested without a reference time
    /// - `EmptyInput` if the stack is empty and the policy is `Error`
    pub fn resolve(
        &self,
        stack: &ObservationStack,
        mode: SelectionMode,
        reference_time: Option<DateTime<Utc>>,
    ) -> Result<ResolvedComposite> {
        let reference = match (mode, reference_time) {
            (SelectionMode::Nearest, None) => {
                return Err(CompositeError::missing_parameter("reference_time"))
            }
            (_, reference) => reference,
        };

        let shape = stack.shape();
        let fill_value = self.config.fill_value;

        if stack.is_empty() {
            return match self.config.empty_stack {
                EmptyStackPolicy::Error => Err(CompositeError::EmptyInput),
                EmptyStackPolicy::AllInvalid => {
                    debug!(shape = %shape, "Empty stack, returning all-invalid grid");
                    Ok(ResolvedComposite {
                        grid: CompositeGrid::all_invalid(shape, fill_value),
                        timestamps: vec![None; shape.pixel_count()],
                    })
                }
            };
        }

        debug!(
            layers = stack.len(),
            pixels = shape.pixel_count(),
            bands = shape.bands,
            mode = %mode,
            "Resolving observation stack"
        );

        let layers = stack.layers();
        let parts = map_tiles(shape, &self.config, |tile| {
            let mut out = TileOutput::new(shape.bands, tile.pixel_count(), fill_value, None);
            match (mode, reference) {
                (SelectionMode::First, _) => fill_unset(layers.iter(), tile, &mut out),
                (SelectionMode::Last, _) => fill_unset(layers.iter().rev(), tile, &mut out),
                (SelectionMode::Nearest, Some(reference)) => {
                    closest_in_time(layers, reference, tile, &mut out)
                }
                (SelectionMode::Nearest, None) => {}
            }
            out
        });
        let (grid, timestamps) = gather(shape, fill_value, parts);

        info!(
            mode = %mode,
            layers = stack.len(),
            valid = grid.valid_count(),
            pixels = shape.pixel_count(),
            "Resolved composite"
        );

        Ok(ResolvedComposite { grid, timestamps })
    }

    /// Earliest valid observation per pixel.
    pub fn first(&self, stack: &ObservationStack) -> Result<ResolvedComposite> {
        self.resolve(stack, SelectionMode::First, None)
    }

    /// Latest valid observation per pixel.
    pub fn last(&self, stack: &ObservationStack) -> Result<ResolvedComposite> {
        self.resolve(stack, SelectionMode::Last, None)
    }

    /// Valid observation closest to `reference` per pixel.
    pub fn nearest(
        &self,
        stack: &ObservationStack,
        reference: DateTime<Utc>,
    ) -> Result<ResolvedComposite> {
        self.resolve(stack, SelectionMode::Nearest, Some(reference))
    }
}

/// Copy every band of `layer` at flat pixel `p` into tile slot `i`.
#[inline]
fn copy_pixel(layer: &Layer, p: usize, i: usize, out: &mut TileOutput<Option<DateTime<Utc>>>) {
    let n = out.valid.len();
    let plane = layer.shape().pixel_count();
    let values = layer.values();
    for band in 0..layer.shape().bands {
        out.values[band * n + i] = values[band * plane + p];
    }
}

/// Visit layers in the given order and fill each still-unset pixel from the
/// first layer valid there. Stops once every pixel of the tile is set.
fn fill_unset<'a>(
    layers: impl Iterator<Item = &'a Layer>,
    tile: &Tile,
    out: &mut TileOutput<Option<DateTime<Utc>>>,
) {
    let range = tile.pixel_range();
    let mut remaining = out.valid.len();

    for layer in layers {
        if remaining == 0 {
            break;
        }
        let timestamp = layer.timestamp();
        let layer_valid = &layer.valid()[range.clone()];
        for (i, &is_valid) in layer_valid.iter().enumerate() {
            if is_valid && !out.valid[i] {
                copy_pixel(layer, range.start + i, i, out);
                out.valid[i] = true;
                out.aux[i] = Some(timestamp);
                remaining -= 1;
            }
        }
    }
}

/// Absolute time difference.
fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Track the smallest time distance seen so far per pixel. Layers arrive in
/// ascending time order and only a strictly smaller distance replaces the
/// current pick, so ties keep the earlier observation.
fn closest_in_time(
    layers: &[Layer],
    reference: DateTime<Utc>,
    tile: &Tile,
    out: &mut TileOutput<Option<DateTime<Utc>>>,
) {
    let range = tile.pixel_range();
    let mut best: Vec<Option<Duration>> = vec![None; out.valid.len()];

    for layer in layers {
        let timestamp = layer.timestamp();
        let d = distance(timestamp, reference);
        let layer_valid = &layer.valid()[range.clone()];
        for (i, &is_valid) in layer_valid.iter().enumerate() {
            if is_valid && best[i].map_or(true, |b| d < b) {
                copy_pixel(layer, range.start + i, i, out);
                best[i] = Some(d);
                out.valid[i] = true;
                out.aux[i] = Some(timestamp);
            }
        }
    }
}
