//! Test data generators for synthetic satellite observation stacks.
//!
//! These generators create predictable, verifiable patterns so tests can tell
//! which layer, band and pixel a composite value came from.

/// Creates the values of one layer where every value encodes its origin.
///
/// Each value is calculated as:
/// `layer * 1_000_000 + band * 10_000 + col * 100 + row`
///
/// Grids up to 100x100 decode uniquely with [`decode_layer_value`].
///
/// # Returns
///
/// A band-major `Vec<f32>` (band 0 first, each band row-major).
///
/// # Example
///
/// ```
/// use test_utils::create_layer_values;
///
/// let values = create_layer_values(3, 2, 4, 5);
/// assert_eq!(values.len(), 2 * 4 * 5);
/// assert_eq!(values[0], 3_000_000.0);      // band 0, row 0, col 0
/// assert_eq!(values[1], 3_000_100.0);      // band 0, row 0, col 1
/// assert_eq!(values[20], 3_010_000.0);     // band 1, row 0, col 0
/// ```
pub fn create_layer_values(layer: usize, bands: usize, rows: usize, cols: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(bands * rows * cols);
    for band in 0..bands {
        for row in 0..rows {
            for col in 0..cols {
                data.push((layer * 1_000_000 + band * 10_000 + col * 100 + row) as f32);
            }
        }
    }
    data
}

/// Recovers the layer index from a value made by [`create_layer_values`].
pub fn decode_layer_value(value: f32) -> usize {
    (value as usize) / 1_000_000
}

/// Creates a surface-reflectance-like band (0.0 - 0.6).
///
/// Smooth gradient plus a deterministic per-pixel perturbation.
pub fn create_reflectance_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            let noise = (simple_hash(col as u32, row as u32, seed) % 1000) as f32 / 10_000.0;
            data.push(0.05 + x_factor * 0.25 + y_factor * 0.2 + noise);
        }
    }
    data
}

/// Creates a clear-sky mask (`true` = usable) with roughly `cloud_fraction`
/// of pixels clouded.
pub fn create_cloud_mask(width: usize, height: usize, seed: u32, cloud_fraction: f32) -> Vec<bool> {
    let threshold = (cloud_fraction.clamp(0.0, 1.0) * 10_000.0) as u32;
    let mut mask = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            mask.push(simple_hash(col as u32, row as u32, seed) % 10_000 >= threshold);
        }
    }
    mask
}

/// Creates a scene-classification-like flag band.
///
/// Values are drawn from vegetation (4), bare soil (5), water (6),
/// cloud shadow (3), cloud medium (8) and high (9) probability, and no data (0).
pub fn create_classification_band(width: usize, height: usize, seed: u32) -> Vec<u16> {
    const CLASSES: [u16; 8] = [4, 4, 5, 6, 3, 8, 9, 0];
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            data.push(CLASSES[(hash % CLASSES.len() as u32) as usize]);
        }
    }
    data
}

/// Creates a reflectance band with NaN dropouts at the given `(col, row)`
/// positions, as left by missing scan lines or saturated detectors.
///
/// Positions outside the grid are ignored.
pub fn create_band_with_gaps(
    width: usize,
    height: usize,
    seed: u32,
    gaps: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = create_reflectance_grid(width, height, seed);
    for &(col, row) in gaps.iter().filter(|&&(c, r)| c < width && r < height) {
        data[row * width + col] = f32::NAN;
    }
    data
}

/// Simple deterministic hash for reproducible test data.
pub fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
