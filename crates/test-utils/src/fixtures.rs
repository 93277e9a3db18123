//! Common test fixtures for compositing tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Common layer shapes as (bands, rows, cols).
pub mod shape {
    /// Small single-band grid
    pub const SMALL: (usize, usize, usize) = (1, 4, 4);

    /// True-color tile (red, green, blue)
    pub const RGB_TILE: (usize, usize, usize) = (3, 32, 32);

    /// Grid tall enough to be split into several row tiles
    pub const TALL: (usize, usize, usize) = (2, 90, 40);
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests (2023-07-15T10:30:00Z)
    pub const REFERENCE_TIME: &str = "2023-07-15T10:30:00Z";

    /// Sentinel-2 constellation revisit interval in days
    pub const SENTINEL2_REVISIT_DAYS: i64 = 5;
}

/// The fixed reference time as a `DateTime`.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 7, 15, 10, 30, 0)
        .single()
        .unwrap_or_default()
}

/// Acquisition times starting at `start`, one every `revisit_days`.
pub fn acquisition_times(start: DateTime<Utc>, count: usize, revisit_days: i64) -> Vec<DateTime<Utc>> {
    (0..count)
        .map(|i| start + Duration::days(revisit_days * i as i64))
        .collect()
}

/// Acquisition times centred on `reference`: half before, half after.
pub fn times_around(reference: DateTime<Utc>, count: usize, revisit_days: i64) -> Vec<DateTime<Utc>> {
    let start = reference - Duration::days(revisit_days * (count / 2) as i64);
    acquisition_times(start, count, revisit_days)
}
