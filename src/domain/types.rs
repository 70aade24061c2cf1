use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Raw and canonical readings
// ============================================================================

/// One raw record as delivered by the metering data provider.
///
/// `date` is either `"YYYY-MM-DD HH:MM:SS"` (load curve) or `"YYYY-MM-DD"`
/// (daily index). `value` arrives as a string but plain numbers are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub date: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_length: Option<String>,
}

impl Reading {
    /// Daily aggregate record (no interval length code)
    pub fn daily(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
            interval_length: None,
        }
    }

    /// Load curve record carrying an interval length code such as `PT30M`
    pub fn sampled(
        date: impl Into<String>,
        value: impl Into<String>,
        interval_length: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
            interval_length: Some(interval_length.into()),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Normalized sample, ordered by `instant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSample {
    pub instant: DateTime<FixedOffset>,
    pub raw_value: f64,
    /// Sample length in hours (0.5 for a 30-minute sample, 1 for a daily index)
    pub duration_weight: f64,
    /// Whether the source record carried an interval length code
    pub sub_daily: bool,
}

impl CanonicalSample {
    /// Wall-clock time of day in the sample's own offset
    pub fn time_of_day(&self) -> NaiveTime {
        self.instant.time()
    }

    pub fn is_midnight(&self) -> bool {
        self.instant.num_seconds_from_midnight() == 0 && self.instant.nanosecond() == 0
    }
}

// ============================================================================
// Tags
// ============================================================================

/// Demand-period band of a sample.
///
/// Variant order follows the lexical order of the wire names, which is also
/// the tie-break order of output rows sharing a bucket start.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ClassificationTag {
    OffPeak,
    Standard,
}

/// Day-level tariff tier published by the grid operator one day ahead
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TempoColor {
    #[serde(alias = "BLUE", alias = "Blue")]
    Blue,
    #[serde(alias = "WHITE", alias = "White")]
    White,
    #[serde(alias = "RED", alias = "Red")]
    Red,
}
