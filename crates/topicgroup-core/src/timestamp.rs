//! Timestamp sources and the granularity units a template may request

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TemplateError;

/// Supplies the "current" instant used for time-based key variables.
pub trait TimestampSource: Send + Sync {
    fn time(&self) -> DateTime<Tz>;
}

impl<F> TimestampSource for F
where
    F: Fn() -> DateTime<Tz> + Send + Sync,
{
    fn time(&self) -> DateTime<Tz> {
        self()
    }
}

/// Reads the system clock and converts it to the configured zone
#[derive(Debug, Clone, Copy)]
pub struct WallclockTimestampSource {
    zone: Tz,
}

impl WallclockTimestampSource {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }
}

impl Default for WallclockTimestampSource {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimestampSource for WallclockTimestampSource {
    fn time(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.zone)
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimestampSource {
    instant: DateTime<Tz>,
}

impl FixedTimestampSource {
    pub fn new(instant: DateTime<Tz>) -> Self {
        Self { instant }
    }
}

impl TimestampSource for FixedTimestampSource {
    fn time(&self) -> DateTime<Tz> {
        self.instant
    }
}

/// Kinds of timestamp source selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSourceType {
    #[default]
    Wallclock,
}

impl TimestampSourceType {
    pub fn build(self, zone: Tz) -> Box<dyn TimestampSource> {
        match self {
            TimestampSourceType::Wallclock => Box::new(WallclockTimestampSource::new(zone)),
        }
    }
}

impl FromStr for TimestampSourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wallclock" => Ok(TimestampSourceType::Wallclock),
            other => Err(format!(
                "Unsupported timestamp source: {}. Supported: wallclock",
                other
            )),
        }
    }
}

impl fmt::Display for TimestampSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampSourceType::Wallclock => write!(f, "wallclock"),
        }
    }
}

/// Granularity selected by the `unit` parameter of the `timestamp` variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampUnit {
    Year,
    Month,
    Day,
    Hour,
}

impl TimestampUnit {
    /// Parse a `unit=` token (`yyyy`, `YYYY`, `MM`, `dd`, `HH`)
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "yyyy" | "YYYY" => Some(TimestampUnit::Year),
            "MM" => Some(TimestampUnit::Month),
            "dd" => Some(TimestampUnit::Day),
            "HH" => Some(TimestampUnit::Hour),
            _ => None,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TimestampUnit::Year => "%Y",
            TimestampUnit::Month => "%m",
            TimestampUnit::Day => "%d",
            TimestampUnit::Hour => "%H",
        }
    }

    pub fn format(self, instant: &DateTime<Tz>) -> String {
        instant.format(self.pattern()).to_string()
    }
}

impl FromStr for TimestampUnit {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TemplateError::invalid_parameter("timestamp", "unit", s))
    }
}
