//! Data types used by the aggregation pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::ExportError;

/// Temporal scale of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    Raw,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Raw,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    /// Name used in file names and column prefixes (`DailyMean`, ...).
    pub fn label(self) -> &'static str {
        match self {
            Granularity::Raw => "Raw",
            Granularity::Daily => "Daily",
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
            Granularity::Yearly => "Yearly",
        }
    }

    pub fn is_aggregated(self) -> bool {
        self != Granularity::Raw
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ExportError::Config(format!("unknown time step '{s}'")))
    }
}

/// Statistics for one calendar period of one site's series.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub site: String,
    /// Period label; see `aggregate::period_anchor` for the convention.
    pub anchor: NaiveDateTime,
    pub mean: f64,
    /// Sample standard deviation; NaN when `count == 1`.
    pub stddev: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_parse_is_case_insensitive() {
        assert_eq!("daily".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert_eq!("Yearly".parse::<Granularity>().unwrap(), Granularity::Yearly);
        assert_eq!(" RAW ".parse::<Granularity>().unwrap(), Granularity::Raw);
        assert!("hourly".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_only_raw_is_unaggregated() {
        assert!(!Granularity::Raw.is_aggregated());
        assert!(Granularity::Weekly.is_aggregated());
    }
}
