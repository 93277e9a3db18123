//! Common types and utilities shared across the scene-composite workspace.

pub mod error;
pub mod grid;
pub mod time;

pub use error::{CommonError, CommonResult};
pub use grid::{Axis, GridShape};
pub use time::{GroupingPeriod, PeriodKey, TimeParseError, TimeRange};
