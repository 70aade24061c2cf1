use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{MeterReadingPayload, ServiceKind, TempoCalendar};

/// Metering data provider: one dataset per service and date window
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeterDataSource: Send + Sync {
    async fn fetch_readings(
        &self,
        point_id: &str,
        service: ServiceKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MeterReadingPayload>;
}

/// Publisher of tempo day colors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TariffCalendarSource: Send + Sync {
    async fn fetch_tempo_days(&self, start: NaiveDate, end: NaiveDate) -> Result<TempoCalendar>;
}
