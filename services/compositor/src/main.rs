//! Temporal compositor.
//!
//! Reads a JSON observation stack, builds a first/last/nearest selection or
//! a median/mean/min/max reduction, optionally per day, solar day, month or
//! year, and writes the result as JSON.

mod config;
mod job;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use composite_processor::{CompositeMethod, GroupingPeriod, SelectionMode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config::CompositorConfig;
use job::CompositeJob;

#[derive(Parser, Debug)]
#[command(name = "compositor")]
#[command(about = "Temporal compositing of masked satellite observation stacks")]
struct Args {
    /// Input stack document (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Output composite document (JSON)
    #[arg(short, long)]
    output: PathBuf,

    /// first, last, nearest, median, mean, min or max
    #[arg(short, long, default_value = "nearest")]
    method: String,

    /// Reference time for nearest selection (RFC 3339 or YYYY-MM-DD)
    #[arg(short, long)]
    reference_time: Option<String>,

    /// Composite each day, solar-day, month or year separately
    #[arg(long)]
    group_by: Option<String>,

    /// Only use layers inside this ISO 8601 interval (start/end)
    #[arg(long)]
    time_range: Option<String>,

    /// Longitude in degrees east, required for solar-day grouping
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Configuration file path (YAML); falls back to COMPOSITE_* variables
    #[arg(short, long, env = "COMPOSITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Worker threads for tile processing (default: number of CPU cores)
    #[arg(short, long, env = "COMPOSITOR_JOBS")]
    jobs: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
        info!(threads = jobs, "Configured tile worker pool");
    }

    let config = match &args.config {
        Some(path) => CompositorConfig::from_yaml(path)?,
        None => CompositorConfig::from_env()?,
    };
    info!(
        tile_rows = config.composite.tile_rows,
        parallel_threshold = config.composite.parallel_threshold,
        empty_stack = %config.composite.empty_stack,
        "Loaded configuration"
    );

    let job = build_job(&args)?;
    let summary = job.run(&config)?;
    info!(
        layers = summary.layers,
        composites = summary.composites,
        "Compositing complete"
    );

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_job(args: &Args) -> Result<CompositeJob> {
    let method: CompositeMethod = args
        .method
        .parse()
        .map_err(|e| anyhow!("Invalid --method: {e}"))?;

    let reference_time = args
        .reference_time
        .as_deref()
        .map(stack_common::time::parse_timestamp)
        .transpose()
        .context("Invalid --reference-time")?;

    let group_by = args
        .group_by
        .as_deref()
        .map(|name| GroupingPeriod::parse(name, args.longitude))
        .transpose()
        .context("Invalid --group-by")?;

    // Grouped nearest selection measures from each period start.
    if group_by.is_some()
        && reference_time.is_some()
        && method == CompositeMethod::Select(SelectionMode::Nearest)
    {
        return Err(anyhow!(
            "--reference-time cannot be combined with --group-by; \
             nearest selection per period uses the period start"
        ));
    }

    Ok(CompositeJob {
        input: args.input.clone(),
        output: args.output.clone(),
        method,
        reference_time,
        group_by,
        time_range: args.time_range.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use composite_processor::TemporalReducer;
    use test_utils::reference_time;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["compositor", "-i", "in.json", "-o", "out.json"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_build_job_defaults_to_nearest() {
        let job = build_job(&args(&["-r", "2023-07-15T10:30:00Z"])).unwrap();
        assert_eq!(job.method, CompositeMethod::Select(SelectionMode::Nearest));
        assert_eq!(job.reference_time, Some(reference_time()));
        assert!(job.group_by.is_none());
    }

    #[test]
    fn test_build_job_with_solar_day_grouping() {
        let job = build_job(&args(&[
            "--method",
            "median",
            "--group-by",
            "solar-day",
            "--longitude",
            "-120.5",
        ]))
        .unwrap();
        assert_eq!(job.method, CompositeMethod::Reduce(TemporalReducer::Median));
        assert_eq!(
            job.group_by,
            Some(GroupingPeriod::SolarDay { longitude: -120.5 })
        );
    }

    #[test]
    fn test_build_job_rejects_bad_arguments() {
        assert!(build_job(&args(&["--method", "mode"])).is_err());
        assert!(build_job(&args(&["--reference-time", "yesterday"])).is_err());
        assert!(build_job(&args(&["--group-by", "solar-day"])).is_err());
    }

    #[test]
    fn test_grouped_nearest_rejects_reference_time() {
        let err = build_job(&args(&[
            "--group-by",
            "month",
            "--reference-time",
            "2023-07-15",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("--group-by"));

        // Other methods ignore the reference time anyway.
        let job = build_job(&args(&[
            "-m",
            "first",
            "--group-by",
            "month",
            "--reference-time",
            "2023-07-15",
        ]))
        .unwrap();
        assert!(job.group_by.is_some());

        let job = build_job(&args(&["--group-by", "month", "--time-range", "2023-07-01/2023-08-01"]))
            .unwrap();
        assert_eq!(job.method, CompositeMethod::Select(SelectionMode::Nearest));
        assert_eq!(job.time_range.as_deref(), Some("2023-07-01/2023-08-01"));
    }
}
