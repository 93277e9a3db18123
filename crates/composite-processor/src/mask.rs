//! Validity masks.
//!
//! Masks are opaque per-pixel predicates. [`FlagMask`] builds one from a
//! quality/classification band by listing the flag values that mark a pixel
//! unusable; it does not decode individual bits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{CompositeError, Result};
use crate::types::Layer;

/// Per-pixel validity for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    rows: usize,
    cols: usize,
    valid: Vec<bool>,
}

impl ValidityMask {
    pub fn new(rows: usize, cols: usize, valid: Vec<bool>) -> Result<Self> {
        if valid.len() != rows * cols {
            return Err(CompositeError::invalid_mask(format!(
                "{} entries for {}x{} grid",
                valid.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, valid })
    }

    /// Every pixel valid.
    pub fn all_valid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            valid: vec![true; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Fraction of pixels that are valid (0.0 - 1.0).
    pub fn valid_fraction(&self) -> f64 {
        if self.valid.is_empty() {
            0.0
        } else {
            self.valid_count() as f64 / self.valid.len() as f64
        }
    }

    /// Pixel-wise AND of two masks of the same size.
    pub fn and(&self, other: &ValidityMask) -> Result<ValidityMask> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(CompositeError::invalid_mask(format!(
                "cannot combine {}x{} with {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            valid: self
                .valid
                .iter()
                .zip(&other.valid)
                .map(|(&a, &b)| a && b)
                .collect(),
        })
    }
}

/// Masks pixels whose quality flag is in a fixed set of invalid values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagMask {
    pub invalid: BTreeSet<u16>,
}

impl FlagMask {
    pub fn new(invalid: impl IntoIterator<Item = u16>) -> Self {
        Self {
            invalid: invalid.into_iter().collect(),
        }
    }

    /// Scene-classification style defaults: no data (0), saturated or
    /// defective (1), cloud shadow (3), cloud medium (8) and high (9)
    /// probability, thin cirrus (10).
    pub fn scene_classification() -> Self {
        Self::new([0, 1, 3, 8, 9, 10])
    }

    pub fn is_invalid(&self, flag: u16) -> bool {
        self.invalid.contains(&flag)
    }

    /// Build a validity mask from a flag band.
    pub fn mask(&self, flags: &[u16], rows: usize, cols: usize) -> Result<ValidityMask> {
        if flags.len() != rows * cols {
            return Err(CompositeError::invalid_mask(format!(
                "flag band has {} entries for {}x{} grid",
                flags.len(),
                rows,
                cols
            )));
        }
        ValidityMask::new(rows, cols, flags.iter().map(|&f| !self.is_invalid(f)).collect())
    }
}

impl Default for FlagMask {
    fn default() -> Self {
        Self::scene_classification()
    }
}

/// Mask pixels where any band equals `nodata`.
pub fn nodata_mask(layer: &Layer, nodata: f32) -> ValidityMask {
    let shape = layer.shape();
    let pixels = shape.pixel_count();
    let values = layer.values();
    let valid = (0..pixels)
        .map(|p| (0..shape.bands).all(|b| values[b * pixels + p] != nodata))
        .collect();
    ValidityMask {
        rows: shape.rows,
        cols: shape.cols,
        valid,
    }
}
