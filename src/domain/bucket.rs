use chrono::{DateTime, FixedOffset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use super::types::{CanonicalSample, ClassificationTag, TempoColor};

/// Aggregation step of the grouped output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BucketGranularity {
    Hour,
    Day,
}

impl BucketGranularity {
    /// Hourly buckets for load curves, daily buckets for daily indexes
    pub fn for_samples(samples: &[CanonicalSample]) -> Self {
        if samples.iter().any(|s| s.sub_daily) {
            Self::Hour
        } else {
            Self::Day
        }
    }

    /// Start of the bucket holding `instant`, in the instant's own offset
    pub fn truncate(&self, instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let truncated = match self {
            Self::Hour => instant
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0)),
            Self::Day => instant
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| instant.timezone().from_local_datetime(&midnight).single()),
        };
        // Only fails for offsets that skip the wall-clock target, which a fixed offset never does
        truncated.unwrap_or(instant)
    }
}

/// One output row: a tag-grouped, time-truncated aggregate with its pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBucket {
    #[serde(rename = "date")]
    pub bucket_start: DateTime<FixedOffset>,
    #[serde(rename = "notes")]
    pub classification: ClassificationTag,
    #[serde(rename = "tempo", default, skip_serializing_if = "Option::is_none")]
    pub tempo_color: Option<TempoColor>,
    #[serde(rename = "value")]
    pub energy_value: f64,
    /// Cost of the bucket (`energy_value` times the unit price)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "sum_value", default, skip_serializing_if = "Option::is_none")]
    pub running_energy_sum: Option<f64>,
    #[serde(rename = "sum_price", default, skip_serializing_if = "Option::is_none")]
    pub running_cost_sum: Option<f64>,
}

impl AggregatedBucket {
    pub fn new(
        bucket_start: DateTime<FixedOffset>,
        classification: ClassificationTag,
        energy_value: f64,
    ) -> Self {
        Self {
            bucket_start,
            classification,
            tempo_color: None,
            energy_value,
            price: None,
            running_energy_sum: None,
            running_cost_sum: None,
        }
    }
}
