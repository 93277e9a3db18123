//! Time handling for observation stacks.
//!
//! Acquisition timestamps are always `DateTime<Utc>`. This module parses
//! caller-supplied times, describes inclusive time ranges, and assigns
//! timestamps to grouping periods (day, solar day, month, year).

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CommonError, CommonResult};

/// Seconds of local solar time per degree of longitude (24h / 360°).
const SOLAR_SECONDS_PER_DEGREE: f64 = 240.0;

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 with offset, a naive `YYYY-MM-DDTHH:MM:SS` (assumed UTC),
/// or a bare date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Parse an ISO 8601 interval of the form `start/end`.
    pub fn from_interval(s: &str) -> Result<Self, TimeParseError> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()))?;
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;
        if start > end {
            return Err(TimeParseError::InvertedRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Start date of a grouping period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(pub NaiveDate);

impl PeriodKey {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// How timestamps are bucketed before compositing each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum GroupingPeriod {
    /// Calendar day in UTC
    Day,
    /// Calendar day in local mean solar time at `longitude` (degrees east).
    /// Merges adjacent scenes from one satellite pass that straddle UTC midnight.
    SolarDay { longitude: f64 },
    /// Calendar month in UTC
    Month,
    /// Calendar year in UTC
    Year,
}

impl GroupingPeriod {
    /// Parse a period name. `solar-day` requires a longitude.
    pub fn parse(name: &str, longitude: Option<f64>) -> CommonResult<Self> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "day" | "daily" => Ok(Self::Day),
            "solar-day" => {
                let longitude =
                    longitude.ok_or_else(|| CommonError::MissingParameter("longitude".into()))?;
                if !(-180.0..=180.0).contains(&longitude) {
                    return Err(CommonError::invalid_parameter(
                        "longitude",
                        format!("{longitude} is outside [-180, 180]"),
                    ));
                }
                Ok(Self::SolarDay { longitude })
            }
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            other => Err(CommonError::invalid_parameter(
                "group-by",
                format!("unknown period '{other}'"),
            )),
        }
    }

    /// Offset from UTC to local solar time, zero for calendar periods.
    fn solar_offset(&self) -> Duration {
        match self {
            Self::SolarDay { longitude } => {
                Duration::seconds((longitude * SOLAR_SECONDS_PER_DEGREE).round() as i64)
            }
            _ => Duration::zero(),
        }
    }

    /// Period containing a timestamp.
    pub fn key(&self, timestamp: &DateTime<Utc>) -> PeriodKey {
        let date = (*timestamp + self.solar_offset()).date_naive();
        let start = match self {
            Self::Day | Self::SolarDay { .. } => date,
            Self::Month => date - Days::new(u64::from(date.day0())),
            Self::Year => date - Days::new(u64::from(date.ordinal0())),
        };
        PeriodKey(start)
    }

    /// UTC instant at which a period begins.
    pub fn period_start(&self, key: PeriodKey) -> DateTime<Utc> {
        let midnight = Utc.from_utc_datetime(&key.0.and_time(chrono::NaiveTime::MIN));
        midnight - self.solar_offset()
    }
}

impl fmt::Display for GroupingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::SolarDay { longitude } => write!(f, "solar-day({longitude})"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}
