use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::types::Reading;

/// Energy flow measured at the delivery point
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Consumption,
    Production,
}

/// Provider dataset a collect is built from
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceKind {
    DailyConsumption,
    ConsumptionLoadCurve,
    DailyProduction,
    ProductionLoadCurve,
}

impl ServiceKind {
    pub fn direction(&self) -> Direction {
        match self {
            Self::DailyConsumption | Self::ConsumptionLoadCurve => Direction::Consumption,
            Self::DailyProduction | Self::ProductionLoadCurve => Direction::Production,
        }
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, Self::DailyConsumption | Self::DailyProduction)
    }

    /// How far back a collect reaches when no start date is configured
    pub fn default_lookback(&self) -> Duration {
        if self.is_daily() {
            Duration::days(1095)
        } else {
            Duration::days(7)
        }
    }
}

/// Provider response envelope: `{"meter_reading": {"interval_reading": [...]}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterReadingPayload {
    #[serde(default)]
    pub meter_reading: MeterReading,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    #[serde(default)]
    pub interval_reading: Vec<Reading>,
}

impl MeterReadingPayload {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            meter_reading: MeterReading {
                interval_reading: readings,
            },
        }
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.meter_reading.interval_reading
    }

    pub fn is_empty(&self) -> bool {
        self.meter_reading.interval_reading.is_empty()
    }
}
