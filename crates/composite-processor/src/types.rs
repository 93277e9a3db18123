//! Core types: layers, observation stacks and composite results.

use chrono::{DateTime, Duration, Utc};
use stack_common::{Axis, GridShape, TimeRange};

use crate::error::{CompositeError, Result};
use crate::mask::ValidityMask;

/// One timestamped raster observation with a per-pixel validity mask.
///
/// Validity is tracked per pixel and shared by every band of the layer.
/// Values at invalid pixels are never read by the compositors.
#[derive(Debug, Clone)]
pub struct Layer {
    timestamp: DateTime<Utc>,
    shape: GridShape,
    values: Vec<f32>,
    valid: Vec<bool>,
}

impl Layer {
    /// Create a layer from values and an explicit validity mask.
    pub fn new(
        timestamp: DateTime<Utc>,
        shape: GridShape,
        values: Vec<f32>,
        valid: Vec<bool>,
    ) -> Result<Self> {
        check_value_count(shape, values.len())?;
        if valid.len() != shape.pixel_count() {
            return Err(CompositeError::invalid_layer(format!(
                "{} mask entries for shape {} (expected {})",
                valid.len(),
                shape,
                shape.pixel_count()
            )));
        }
        Ok(Self {
            timestamp,
            shape,
            values,
            valid,
        })
    }

    /// Create a layer whose mask is derived from the values: a pixel is
    /// valid when every band holds a finite number.
    pub fn from_values(timestamp: DateTime<Utc>, shape: GridShape, values: Vec<f32>) -> Result<Self> {
        check_value_count(shape, values.len())?;
        let pixels = shape.pixel_count();
        let valid = (0..pixels)
            .map(|p| (0..shape.bands).all(|b| values[b * pixels + p].is_finite()))
            .collect();
        Ok(Self {
            timestamp,
            shape,
            values,
            valid,
        })
    }

    /// Combine this layer's mask with an externally derived one.
    pub fn with_mask(mut self, mask: &ValidityMask) -> Result<Self> {
        if mask.rows() != self.shape.rows || mask.cols() != self.shape.cols {
            return Err(CompositeError::invalid_mask(format!(
                "mask is {}x{}, layer is {}x{}",
                mask.rows(),
                mask.cols(),
                self.shape.rows,
                self.shape.cols
            )));
        }
        for (v, &m) in self.valid.iter_mut().zip(mask.as_slice()) {
            *v = *v && m;
        }
        Ok(self)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// All values, band-major.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Per-pixel validity.
    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    /// Values of a single band plane, `None` if `band` is out of range.
    pub fn band(&self, band: usize) -> Option<&[f32]> {
        band_plane(&self.values, self.shape, band)
    }

    /// Value at a position, regardless of validity.
    pub fn value(&self, band: usize, row: usize, col: usize) -> Option<f32> {
        if band >= self.shape.bands || !self.shape.contains(row, col) {
            return None;
        }
        Some(self.values[self.shape.flat_index(band, row, col)])
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.shape.contains(row, col) && self.valid[self.shape.pixel_index(row, col)]
    }

    /// Number of valid pixels.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}

fn band_plane(values: &[f32], shape: GridShape, band: usize) -> Option<&[f32]> {
    if band >= shape.bands {
        return None;
    }
    let n = shape.pixel_count();
    values.get(band * n..(band + 1) * n)
}

fn check_value_count(shape: GridShape, found: usize) -> Result<()> {
    match shape.checked_len() {
        Some(expected) if expected == found => Ok(()),
        Some(expected) => Err(CompositeError::invalid_layer(format!(
            "{found} values for shape {shape} (expected {expected})"
        ))),
        None => Err(CompositeError::invalid_layer(format!(
            "grid shape {shape} is too large to address"
        ))),
    }
}

/// Layers sharing one grid shape, kept in non-decreasing timestamp order.
///
/// Layers with equal timestamps keep their insertion order.
#[derive(Debug, Clone)]
pub struct ObservationStack {
    shape: GridShape,
    layers: Vec<Layer>,
}

impl ObservationStack {
    /// Build a stack, validating shapes and sorting by timestamp.
    ///
    /// # Errors
    ///
    /// - `InvalidLayer` if the shape's value count overflows `usize`
    /// - `ShapeMismatch` naming the first layer whose shape differs
    pub fn new(shape: GridShape, mut layers: Vec<Layer>) -> Result<Self> {
        if shape.checked_len().is_none() {
            return Err(CompositeError::invalid_layer(format!(
                "grid shape {shape} is too large to address"
            )));
        }
        for (index, layer) in layers.iter().enumerate() {
            if layer.shape != shape {
                return Err(CompositeError::ShapeMismatch {
                    index,
                    expected: shape,
                    found: layer.shape,
                });
            }
        }
        // Stable sort: equal timestamps keep caller order.
        layers.sort_by_key(|l| l.timestamp);
        Ok(Self { shape, layers })
    }

    /// A stack with no layers. The shape is still known.
    pub fn empty(shape: GridShape) -> Result<Self> {
        Self::new(shape, Vec::new())
    }

    /// Insert a layer at its time position, after any equal timestamps.
    pub fn push(&mut self, layer: Layer) -> Result<()> {
        if layer.shape != self.shape {
            return Err(CompositeError::ShapeMismatch {
                index: self.layers.len(),
                expected: self.shape,
                found: layer.shape,
            });
        }
        let at = self
            .layers
            .partition_point(|l| l.timestamp <= layer.timestamp);
        self.layers.insert(at, layer);
        Ok(())
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.layers.iter().map(|l| l.timestamp).collect()
    }

    /// Axis metadata of the full stack, time first.
    pub fn dims(&self) -> [(Axis, usize); 4] {
        [
            (Axis::Time, self.layers.len()),
            (Axis::Band, self.shape.bands),
            (Axis::Y, self.shape.rows),
            (Axis::X, self.shape.cols),
        ]
    }

    /// First and last timestamps, if any layers exist.
    pub fn time_span(&self) -> Option<TimeRange> {
        let first = self.layers.first()?;
        let last = self.layers.last()?;
        Some(TimeRange::new(first.timestamp, last.timestamp))
    }

    /// Sub-stack of layers inside an inclusive time range.
    pub fn within(&self, range: &TimeRange) -> Self {
        Self {
            shape: self.shape,
            layers: self
                .layers
                .iter()
                .filter(|l| range.contains(&l.timestamp))
                .cloned()
                .collect(),
        }
    }

    /// Sub-stack for an ISO 8601 interval such as
    /// `2023-07-01T00:00:00Z/2023-07-31T23:59:59Z`.
    pub fn within_interval(&self, interval: &str) -> Result<Self> {
        let range = TimeRange::from_interval(interval)?;
        Ok(self.within(&range))
    }
}

/// A single derived layer with per-pixel validity.
#[derive(Debug, Clone)]
pub struct CompositeGrid {
    pub shape: GridShape,
    /// Band-major values; invalid pixels hold `fill_value` in every band.
    pub values: Vec<f32>,
    pub valid: Vec<bool>,
    pub fill_value: f32,
}

impl CompositeGrid {
    /// A grid where no pixel is valid.
    pub fn all_invalid(shape: GridShape, fill_value: f32) -> Self {
        Self {
            shape,
            values: vec![fill_value; shape.len()],
            valid: vec![false; shape.pixel_count()],
            fill_value,
        }
    }

    /// Value at a position, `None` if the pixel is invalid or out of range.
    pub fn value(&self, band: usize, row: usize, col: usize) -> Option<f32> {
        if band >= self.shape.bands || !self.is_valid(row, col) {
            return None;
        }
        Some(self.values[self.shape.flat_index(band, row, col)])
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.shape.contains(row, col) && self.valid[self.shape.pixel_index(row, col)]
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    pub fn band(&self, band: usize) -> Option<&[f32]> {
        band_plane(&self.values, self.shape, band)
    }

    /// Turn the composite into a layer stamped with `timestamp`.
    pub fn into_layer(self, timestamp: DateTime<Utc>) -> Result<Layer> {
        Layer::new(timestamp, self.shape, self.values, self.valid)
    }
}

/// Output of first/last/nearest selection.
#[derive(Debug, Clone)]
pub struct ResolvedComposite {
    pub grid: CompositeGrid,
    /// Per-pixel timestamp of the source layer; `None` exactly where invalid.
    pub timestamps: Vec<Option<DateTime<Utc>>>,
}

impl ResolvedComposite {
    pub fn timestamp(&self, row: usize, col: usize) -> Option<DateTime<Utc>> {
        if !self.grid.shape.contains(row, col) {
            return None;
        }
        self.timestamps[self.grid.shape.pixel_index(row, col)]
    }

    /// Signed offset of each pixel's source time from `reference`.
    pub fn offset_from(&self, reference: DateTime<Utc>) -> Vec<Option<Duration>> {
        self.timestamps
            .iter()
            .map(|t| t.map(|t| t - reference))
            .collect()
    }
}

/// Output of a statistical reduction over time.
#[derive(Debug, Clone)]
pub struct ReducedComposite {
    pub grid: CompositeGrid,
    /// Number of valid observations that contributed to each pixel.
    pub counts: Vec<u32>,
}

impl ReducedComposite {
    pub fn count(&self, row: usize, col: usize) -> u32 {
        if !self.grid.shape.contains(row, col) {
            return 0;
        }
        self.counts[self.grid.shape.pixel_index(row, col)]
    }
}
