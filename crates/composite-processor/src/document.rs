//! JSON documents for observation stacks and composite results.
//!
//! Missing or masked values are `null`. Pixel arrays are flat, band-major,
//! row-major within a band, matching [`GridShape::flat_index`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stack_common::{GridShape, PeriodKey};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{CompositeError, Result};
use crate::grouping::PeriodComposite;
use crate::mask::{nodata_mask, FlagMask, ValidityMask};
use crate::types::{CompositeGrid, Layer, ObservationStack, ReducedComposite, ResolvedComposite};

/// A serialized observation stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDocument {
    pub bands: usize,
    pub rows: usize,
    pub cols: usize,
    pub layers: Vec<LayerDocument>,
}

/// One serialized layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDocument {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<Option<f32>>,
    /// Explicit per-pixel validity, combined with everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<Vec<bool>>,
    /// Quality/classification flags, one per pixel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<u16>>,
}

impl StackDocument {
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.bands, self.rows, self.cols)
    }

    /// Build an observation stack.
    ///
    /// A pixel is valid when every band value is present and finite, the
    /// optional `valid` entry is true, its flag is not in `flag_mask`, and no
    /// band equals `nodata`.
    pub fn into_stack(self, flag_mask: &FlagMask, nodata: Option<f32>) -> Result<ObservationStack> {
        let shape = self.shape();
        if shape.checked_len().is_none() {
            return Err(CompositeError::document(format!(
                "grid shape {shape} is too large to address"
            )));
        }
        let mut layers = Vec::with_capacity(self.layers.len());

        for (index, doc) in self.layers.into_iter().enumerate() {
            if doc.values.len() != shape.len() {
                return Err(CompositeError::document(format!(
                    "layer {index} has {} values, shape {shape} needs {}",
                    doc.values.len(),
                    shape.len()
                )));
            }
            let values = doc
                .values
                .into_iter()
                .map(|v| v.unwrap_or(f32::NAN))
                .collect();
            let mut layer = Layer::from_values(doc.timestamp, shape, values)?;

            if let Some(valid) = doc.valid {
                layer = layer.with_mask(&ValidityMask::new(shape.rows, shape.cols, valid)?)?;
            }
            if let Some(flags) = doc.flags {
                layer = layer.with_mask(&flag_mask.mask(&flags, shape.rows, shape.cols)?)?;
            }
            if let Some(nodata) = nodata {
                let mask = nodata_mask(&layer, nodata);
                layer = layer.with_mask(&mask)?;
            }
            layers.push(layer);
        }

        ObservationStack::new(shape, layers)
    }

    /// Serialize a stack; masked pixels become `null` in every band.
    pub fn from_stack(stack: &ObservationStack) -> Self {
        let shape = stack.shape();
        Self {
            bands: shape.bands,
            rows: shape.rows,
            cols: shape.cols,
            layers: stack
                .layers()
                .iter()
                .map(|layer| LayerDocument {
                    timestamp: layer.timestamp(),
                    values: masked_values(shape, layer.values(), layer.valid()),
                    valid: None,
                    flags: None,
                })
                .collect(),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(self, path)
    }
}

/// A serialized composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeDocument {
    pub bands: usize,
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<Option<f32>>,
    /// Source timestamp per pixel (selection composites only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<Option<DateTime<Utc>>>>,
    /// Valid observation count per pixel (reductions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<Vec<u32>>,
}

impl CompositeDocument {
    fn from_grid(grid: &CompositeGrid) -> Self {
        Self {
            bands: grid.shape.bands,
            rows: grid.shape.rows,
            cols: grid.shape.cols,
            values: masked_values(grid.shape, &grid.values, &grid.valid),
            timestamps: None,
            counts: None,
        }
    }

    pub fn from_layer(layer: &Layer) -> Self {
        let shape = layer.shape();
        Self {
            bands: shape.bands,
            rows: shape.rows,
            cols: shape.cols,
            values: masked_values(shape, layer.values(), layer.valid()),
            timestamps: None,
            counts: None,
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.bands, self.rows, self.cols)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(self, path)
    }
}

impl From<&ResolvedComposite> for CompositeDocument {
    fn from(resolved: &ResolvedComposite) -> Self {
        Self {
            timestamps: Some(resolved.timestamps.clone()),
            ..Self::from_grid(&resolved.grid)
        }
    }
}

impl From<&ReducedComposite> for CompositeDocument {
    fn from(reduced: &ReducedComposite) -> Self {
        Self {
            counts: Some(reduced.counts.clone()),
            ..Self::from_grid(&reduced.grid)
        }
    }
}

/// One entry of a grouped composite output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodDocument {
    pub period: PeriodKey,
    pub observations: usize,
    pub composite: CompositeDocument,
}

impl From<&PeriodComposite> for PeriodDocument {
    fn from(period: &PeriodComposite) -> Self {
        Self {
            period: period.key,
            observations: period.observations,
            composite: CompositeDocument::from_layer(&period.layer),
        }
    }
}

fn masked_values(shape: GridShape, values: &[f32], valid: &[bool]) -> Vec<Option<f32>> {
    let pixels = shape.pixel_count();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (valid[i % pixels.max(1)] && v.is_finite()).then_some(v))
        .collect()
}

/// Read any JSON document from a file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path.as_ref()).map_err(|e| {
        CompositeError::document(format!("cannot open {}: {e}", path.as_ref().display()))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write any JSON document to a file.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref()).map_err(|e| {
        CompositeError::document(format!("cannot create {}: {e}", path.as_ref().display()))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
