//! Grid shapes with explicit axis metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named axis of an observation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Acquisition time (one entry per layer)
    Time,
    /// Spectral band
    Band,
    /// Grid row, top to bottom
    Y,
    /// Grid column, left to right
    X,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Time => write!(f, "time"),
            Axis::Band => write!(f, "band"),
            Axis::Y => write!(f, "y"),
            Axis::X => write!(f, "x"),
        }
    }
}

/// Shape of one raster layer: `bands` planes of `rows` x `cols` pixels.
///
/// Values are laid out band-major, and row-major within a band:
///
/// ```text
/// index = band * rows * cols + row * cols + col
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub bands: usize,
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    /// Create a new grid shape.
    pub fn new(bands: usize, rows: usize, cols: usize) -> Self {
        Self { bands, rows, cols }
    }

    /// Single-band shape.
    pub fn single_band(rows: usize, cols: usize) -> Self {
        Self::new(1, rows, cols)
    }

    /// Axis metadata in storage order.
    pub fn axes(&self) -> [(Axis, usize); 3] {
        [(Axis::Band, self.bands), (Axis::Y, self.rows), (Axis::X, self.cols)]
    }

    /// Size along one axis. `Axis::Time` is not part of a layer shape.
    pub fn axis_len(&self, axis: Axis) -> Option<usize> {
        match axis {
            Axis::Time => None,
            Axis::Band => Some(self.bands),
            Axis::Y => Some(self.rows),
            Axis::X => Some(self.cols),
        }
    }

    /// Number of pixels in one band plane.
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Total number of values across all bands.
    pub fn len(&self) -> usize {
        self.bands * self.pixel_count()
    }

    /// Total number of values, or `None` if it does not fit in `usize`.
    ///
    /// Shapes read from untrusted input must pass this before any buffer
    /// is sized from them.
    pub fn checked_len(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)?.checked_mul(self.bands)
    }

    /// Check if the shape holds no values.
    pub fn is_empty(&self) -> bool {
        self.bands == 0 || self.rows == 0 || self.cols == 0
    }

    /// Flat pixel index (shared by all bands).
    pub fn pixel_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Flat value index for a band/row/col triple.
    pub fn flat_index(&self, band: usize, row: usize, col: usize) -> usize {
        band * self.pixel_count() + self.pixel_index(row, col)
    }

    /// Check whether a row/col pair lies inside the grid.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.bands, self.rows, self.cols)
    }
}
