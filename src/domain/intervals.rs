//! Off-peak clock windows

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Wall-clock window `(start, end]`. No wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ClockInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse a pair of `"HH:MM:SS"` (or `"HH:MM"`) strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_clock(start)?, parse_clock(end)?))
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start < time && time <= self.end
    }
}

fn parse_clock(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| AnalyticsError::ConfigurationMismatch(format!("invalid clock time {s:?}")))
}

/// Union of off-peak windows. Empty means every sample is standard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSet(Vec<ClockInterval>);

impl IntervalSet {
    pub fn new(intervals: Vec<ClockInterval>) -> Self {
        Self(intervals)
    }

    /// Build from configuration string pairs such as `("01:30:00", "08:00:00")`
    pub fn parse<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self> {
        pairs
            .iter()
            .map(|(start, end)| ClockInterval::parse(start.as_ref(), end.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClockInterval> {
        self.0.iter()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.0.iter().any(|interval| interval.contains(time))
    }
}
