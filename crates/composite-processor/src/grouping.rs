//! Grouping a stack by calendar or solar period and compositing each group.
//!
//! Typical uses: merge the adjacent scenes of one satellite pass into a
//! single daily layer (`SolarDay` + `First`), or build monthly median
//! composites (`Month` + `Median`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stack_common::{CommonError, GridShape, GroupingPeriod, PeriodKey};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::CompositeConfig;
use crate::error::Result;
use crate::reduce::{reduce, TemporalReducer};
use crate::resolver::{NearestValueResolver, SelectionMode};
use crate::types::{Layer, ObservationStack};

/// How the layers of one group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMethod {
    Select(SelectionMode),
    Reduce(TemporalReducer),
}

impl FromStr for CompositeMethod {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(mode) = s.parse::<SelectionMode>() {
            return Ok(Self::Select(mode));
        }
        s.parse::<TemporalReducer>()
            .map(Self::Reduce)
            .map_err(|_| CommonError::invalid_parameter("method", format!("unknown method '{s}'")))
    }
}

impl fmt::Display for CompositeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(mode) => write!(f, "{mode}"),
            Self::Reduce(reducer) => write!(f, "{reducer}"),
        }
    }
}

/// Composite of one period.
#[derive(Debug, Clone)]
pub struct PeriodComposite {
    pub key: PeriodKey,
    /// Number of input layers in the period.
    pub observations: usize,
    /// The composite, stamped with the period start.
    pub layer: Layer,
}

/// Split a stack into per-period sub-stacks, in ascending period order.
pub fn group_by_period(
    stack: &ObservationStack,
    period: GroupingPeriod,
) -> Result<Vec<(PeriodKey, ObservationStack)>> {
    let mut groups: BTreeMap<PeriodKey, Vec<Layer>> = BTreeMap::new();
    for layer in stack.layers() {
        groups
            .entry(period.key(&layer.timestamp()))
            .or_default()
            .push(layer.clone());
    }

    groups
        .into_iter()
        .map(|(key, layers)| Ok((key, ObservationStack::new(stack.shape(), layers)?)))
        .collect()
}

/// Group a stack by period and composite every group.
///
/// `Select(Nearest)` uses the period start as the reference time.
pub fn composite_by_period(
    stack: &ObservationStack,
    period: GroupingPeriod,
    method: CompositeMethod,
    config: &CompositeConfig,
) -> Result<Vec<PeriodComposite>> {
    let groups = group_by_period(stack, period)?;
    debug!(
        period = %period,
        method = %method,
        groups = groups.len(),
        layers = stack.len(),
        "Compositing by period"
    );

    let resolver = NearestValueResolver::new(config.clone());
    groups
        .into_iter()
        .map(|(key, group)| {
            let start: DateTime<Utc> = period.period_start(key);
            let grid = match method {
                CompositeMethod::Select(mode) => resolver.resolve(&group, mode, Some(start))?.grid,
                CompositeMethod::Reduce(reducer) => reduce(&group, reducer, config)?.grid,
            };
            Ok(PeriodComposite {
                key,
                observations: group.len(),
                layer: grid.into_layer(start)?,
            })
        })
        .collect()
}

/// Collect period composites into a new stack.
pub fn periods_to_stack(shape: GridShape, periods: Vec<PeriodComposite>) -> Result<ObservationStack> {
    ObservationStack::new(shape, periods.into_iter().map(|p| p.layer).collect())
}
