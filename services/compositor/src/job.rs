//! One compositing run: read a stack document, composite, write the result.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use composite_processor::document::write_json;
use composite_processor::{
    composite_by_period, reduce, CompositeDocument, CompositeMethod, GroupingPeriod,
    NearestValueResolver, PeriodDocument, StackDocument,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::CompositorConfig;

#[derive(Debug, Clone)]
pub struct CompositeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub method: CompositeMethod,
    pub reference_time: Option<DateTime<Utc>>,
    pub group_by: Option<GroupingPeriod>,
    /// ISO 8601 `start/end` interval restricting the input layers
    pub time_range: Option<String>,
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub layers: usize,
    /// Composites written: 1, or one per period when grouping.
    pub composites: usize,
    /// Valid pixels summed over all written composites.
    pub valid_pixels: usize,
}

impl CompositeJob {
    pub fn run(&self, config: &CompositorConfig) -> Result<JobSummary> {
        let start = Instant::now();

        let stack = StackDocument::read(&self.input)
            .with_context(|| format!("Failed to read stack: {}", self.input.display()))?
            .into_stack(&config.flags, config.composite.nodata)?;
        let stack = match &self.time_range {
            Some(interval) => stack
                .within_interval(interval)
                .with_context(|| format!("Invalid --time-range: {interval}"))?,
            None => stack,
        };
        info!(
            input = %self.input.display(),
            layers = stack.len(),
            shape = %stack.shape(),
            span_hours = stack.time_span().map(|r| r.duration().num_hours()),
            "Loaded observation stack"
        );

        let summary = match self.group_by {
            None => {
                let (doc, valid_pixels) = match self.method {
                    CompositeMethod::Select(mode) => {
                        let resolver = NearestValueResolver::new(config.composite.clone());
                        let resolved = resolver.resolve(&stack, mode, self.reference_time)?;
                        (CompositeDocument::from(&resolved), resolved.grid.valid_count())
                    }
                    CompositeMethod::Reduce(reducer) => {
                        let reduced = reduce(&stack, reducer, &config.composite)?;
                        (CompositeDocument::from(&reduced), reduced.grid.valid_count())
                    }
                };
                doc.write(&self.output)?;
                JobSummary {
                    layers: stack.len(),
                    composites: 1,
                    valid_pixels,
                }
            }
            Some(period) => {
                let periods = composite_by_period(&stack, period, self.method, &config.composite)?;
                let docs: Vec<PeriodDocument> = periods.iter().map(PeriodDocument::from).collect();
                write_json(&docs, &self.output)?;
                JobSummary {
                    layers: stack.len(),
                    composites: periods.len(),
                    valid_pixels: periods.iter().map(|p| p.layer.valid_count()).sum(),
                }
            }
        };

        info!(
            output = %self.output.display(),
            method = %self.method,
            composites = summary.composites,
            valid_pixels = summary.valid_pixels,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wrote composite"
        );

        Ok(summary)
    }
}
