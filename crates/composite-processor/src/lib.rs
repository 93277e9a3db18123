//! Temporal compositing of masked satellite observation stacks.
//!
//! An observation stack is a time-ordered sequence of raster layers sharing
//! one grid shape, each with a per-pixel validity mask (cloud, shadow,
//! no-data). This crate collapses a stack into a single layer:
//!
//! - **Selection**: take each pixel from its first, last, or nearest-in-time
//!   valid observation, and report which timestamp it came from
//! - **Reduction**: median, mean, min or max over the valid observations
//! - **Grouping**: composite per day, solar day, month or year
//!
//! # Architecture
//!
//! ```text
//! StackDocument / caller-built layers
//!      │
//!      ├─► Layer::with_mask(FlagMask / ValidityMask)
//!      │
//!      ▼
//! ObservationStack (shape-checked, time-sorted)
//!      │
//!      ├─► NearestValueResolver::resolve(mode, reference_time)
//!      │         │
//!      │         └─► one grid pass per layer, per tile
//!      │
//!      ├─► reduce(TemporalReducer)
//!      │
//!      └─► composite_by_period(GroupingPeriod, CompositeMethod)
//!               │
//!               ▼
//!          tiles gathered into CompositeGrid
//! ```
//!
//! # Example
//!
//! ```ignore
//! use composite_processor::{NearestValueResolver, ObservationStack, SelectionMode};
//!
//! let stack = ObservationStack::new(shape, layers)?;
//! let resolver = NearestValueResolver::default();
//! let composite = resolver.resolve(&stack, SelectionMode::Nearest, Some(reference))?;
//!
//! let band = composite.grid.band(0).unwrap_or_default();
//! for (value, when) in band.iter().zip(&composite.timestamps) {
//!     // `when` is None where no observation was valid
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod grouping;
pub mod mask;
pub mod reduce;
pub mod resolver;
pub mod tiling;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{CompositeConfig, EmptyStackPolicy};
pub use document::{CompositeDocument, LayerDocument, PeriodDocument, StackDocument};
pub use error::{CompositeError, Result};
pub use grouping::{composite_by_period, group_by_period, periods_to_stack, CompositeMethod, PeriodComposite};
pub use mask::{nodata_mask, FlagMask, ValidityMask};
pub use reduce::{reduce, TemporalReducer};
pub use resolver::{NearestValueResolver, SelectionMode};
pub use tiling::{tile_ranges, Tile};
pub use types::{CompositeGrid, Layer, ObservationStack, ReducedComposite, ResolvedComposite};

pub use stack_common::{Axis, GridShape, GroupingPeriod, PeriodKey, TimeRange};
