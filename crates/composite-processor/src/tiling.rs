//! Row-band tiling for parallel compositing.
//!
//! Every compositor is pixel-independent, so a grid can be cut into
//! horizontal bands of rows, each band processed on its own worker, and the
//! partial outputs concatenated in tile order.

use rayon::prelude::*;
use stack_common::GridShape;
use std::ops::Range;
use tracing::debug;

use crate::config::CompositeConfig;
use crate::types::CompositeGrid;

/// A horizontal band of rows `[row_start, row_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub index: usize,
    pub row_start: usize,
    pub row_end: usize,
    pub cols: usize,
}

impl Tile {
    /// Tile covering the whole grid.
    pub fn whole(shape: GridShape) -> Self {
        Self {
            index: 0,
            row_start: 0,
            row_end: shape.rows,
            cols: shape.cols,
        }
    }

    /// Flat pixel indices covered by this tile.
    pub fn pixel_range(&self) -> Range<usize> {
        self.row_start * self.cols..self.row_end * self.cols
    }

    pub fn pixel_count(&self) -> usize {
        (self.row_end - self.row_start) * self.cols
    }
}

/// Partition a grid into bands of at most `tile_rows` rows.
pub fn tile_ranges(shape: GridShape, tile_rows: usize) -> Vec<Tile> {
    let tile_rows = tile_rows.max(1);
    (0..shape.rows)
        .step_by(tile_rows)
        .enumerate()
        .map(|(index, row_start)| Tile {
            index,
            row_start,
            row_end: (row_start + tile_rows).min(shape.rows),
            cols: shape.cols,
        })
        .collect()
}

/// Partial result for one tile. `values` is band-major over the tile's pixels.
#[derive(Debug)]
pub(crate) struct TileOutput<A> {
    pub values: Vec<f32>,
    pub valid: Vec<bool>,
    pub aux: Vec<A>,
}

impl<A: Clone> TileOutput<A> {
    pub fn new(bands: usize, pixels: usize, fill_value: f32, aux: A) -> Self {
        Self {
            values: vec![fill_value; bands * pixels],
            valid: vec![false; pixels],
            aux: vec![aux; pixels],
        }
    }
}

/// Run `f` on every tile, on the rayon pool when the grid is large enough,
/// and return the outputs in tile order.
pub(crate) fn map_tiles<T, F>(shape: GridShape, config: &CompositeConfig, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Tile) -> T + Sync + Send,
{
    if shape.pixel_count() < config.parallel_threshold || shape.rows <= config.tile_rows {
        return vec![f(&Tile::whole(shape))];
    }

    let tiles = tile_ranges(shape, config.tile_rows);
    debug!(
        tiles = tiles.len(),
        tile_rows = config.tile_rows,
        threads = rayon::current_num_threads(),
        "Processing tiles in parallel"
    );
    tiles.par_iter().map(|tile| f(tile)).collect()
}

/// Concatenate tile outputs into a full grid plus its per-pixel auxiliary grid.
pub(crate) fn gather<A>(
    shape: GridShape,
    fill_value: f32,
    parts: Vec<TileOutput<A>>,
) -> (CompositeGrid, Vec<A>) {
    let mut values = Vec::with_capacity(shape.len());
    for band in 0..shape.bands {
        for part in &parts {
            let n = part.valid.len();
            values.extend_from_slice(&part.values[band * n..(band + 1) * n]);
        }
    }

    let mut valid = Vec::with_capacity(shape.pixel_count());
    let mut aux = Vec::with_capacity(shape.pixel_count());
    for part in parts {
        valid.extend(part.valid);
        aux.extend(part.aux);
    }

    (
        CompositeGrid {
            shape,
            values,
            valid,
            fill_value,
        },
        aux,
    )
}
