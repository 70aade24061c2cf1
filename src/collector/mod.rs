//! Meter point collector
//!
//! Fetches raw datasets per direction through the provider seam and turns
//! them into priced statistics with the analytics pipeline.

pub mod params;
pub mod source;

pub use params::{CollectParams, CollectParamsBuilder};
pub use source::{MeterDataSource, TariffCalendarSource};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analytics::{compute, EngineOptions, LocalZone, Normalizer};
use crate::domain::{
    AggregatedBucket, BucketGranularity, Direction, Reading, ServiceKind, TempoCalendar,
    TempoColor,
};
use crate::error::AnalyticsError;

/// Longest window the provider serves load curves for in one request
const LOAD_CURVE_CHUNK_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("No collect configured for this meter point")]
    NotConfigured,
    #[error("Data collection is empty for {0}")]
    EmptyDataset(Direction),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

/// Pricing contract inferred from the configured price tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Subscription {
    #[default]
    Base,
    OffPeak,
    Tempo,
}

#[derive(Debug, Clone)]
struct Collect {
    params: CollectParams,
    window: Option<(NaiveDate, NaiveDate)>,
    readings: Vec<Reading>,
}

pub struct MeterPoint {
    point_id: String,
    source: Arc<dyn MeterDataSource>,
    calendar_source: Option<Arc<dyn TariffCalendarSource>>,
    normalizer: Normalizer,
    subscription: Subscription,
    collects: BTreeMap<Direction, Collect>,
    tempo: Option<TempoCalendar>,
    collected: bool,
}

impl MeterPoint {
    pub fn new(
        point_id: impl Into<String>,
        source: Arc<dyn MeterDataSource>,
        calendar_source: Option<Arc<dyn TariffCalendarSource>>,
    ) -> Self {
        Self {
            point_id: point_id.into(),
            source,
            calendar_source,
            normalizer: Normalizer::default(),
            subscription: Subscription::default(),
            collects: BTreeMap::new(),
            tempo: None,
            collected: false,
        }
    }

    /// Interpret provider timestamps in `zone` instead of the host zone
    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.normalizer = Normalizer::new(zone);
        self
    }

    pub fn point_id(&self) -> &str {
        &self.point_id
    }

    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    pub fn is_configured(&self) -> bool {
        !self.collects.is_empty()
    }

    /// Whether the last `update_collects` fetched every direction
    pub fn has_collected(&self) -> bool {
        self.collected
    }

    pub fn params(&self, direction: Direction) -> Option<&CollectParams> {
        self.collects.get(&direction).map(|c| &c.params)
    }

    pub fn readings(&self, direction: Direction) -> &[Reading] {
        self.collects
            .get(&direction)
            .map(|c| c.readings.as_slice())
            .unwrap_or_default()
    }

    /// Register the collect for the direction of `params.service`,
    /// replacing any earlier one for that direction
    pub fn set_collect(&mut self, params: CollectParams) {
        let direction = params.service.direction();
        if let Some(table) = &params.prices {
            self.subscription = if table.is_tempo() {
                Subscription::Tempo
            } else {
                Subscription::OffPeak
            };
        }
        debug!(%direction, service = %params.service, subscription = ?self.subscription, "Collect configured");
        self.collects.insert(
            direction,
            Collect {
                params,
                window: None,
                readings: Vec::new(),
            },
        );
    }

    pub async fn update_collects(&mut self) -> Result<(), CollectorError> {
        self.update_collects_at(Local::now().date_naive()).await
    }

    /// Fetch every configured direction, resolving open windows against `today`
    pub async fn update_collects_at(&mut self, today: NaiveDate) -> Result<(), CollectorError> {
        if self.collects.is_empty() {
            return Err(CollectorError::NotConfigured);
        }

        self.collected = false;
        let mut complete = true;

        for (direction, collect) in self.collects.iter_mut() {
            let (start, end) = collect.params.window(today);
            collect.window = Some((start, end));

            match fetch_window(
                self.source.as_ref(),
                &self.point_id,
                collect.params.service,
                start,
                end,
            )
            .await
            {
                Ok(readings) if readings.is_empty() => {
                    return Err(CollectorError::EmptyDataset(*direction));
                }
                Ok(readings) => {
                    info!(%direction, %start, %end, count = readings.len(), "Collected meter readings");
                    collect.readings = readings;
                }
                Err(e) => {
                    complete = false;
                    error!(%direction, error = %e, "Meter reading collect failed");
                }
            }

            if *direction == Direction::Consumption && self.subscription == Subscription::Tempo {
                match &self.calendar_source {
                    Some(calendar) => match calendar.fetch_tempo_days(start, end).await {
                        Ok(days) => {
                            debug!(days = days.len(), "Fetched tempo calendar");
                            self.tempo = Some(days);
                        }
                        Err(e) => {
                            complete = false;
                            error!(error = %e, "Tempo calendar fetch failed");
                        }
                    },
                    None => warn!("Tempo subscription without a calendar source"),
                }
            }
        }

        self.collected = complete;
        Ok(())
    }

    /// Priced statistics per direction from the last collected readings
    pub fn stats(&self) -> Result<BTreeMap<Direction, Vec<AggregatedBucket>>, CollectorError> {
        if self.collects.is_empty() {
            return Err(CollectorError::NotConfigured);
        }

        let mut stats = BTreeMap::new();
        for (direction, collect) in &self.collects {
            let boundary = collect.window.map(|(start, _)| start).or(collect.params.start);
            let samples = self.normalizer.normalize(&collect.readings, false, boundary)?;

            let mut builder = EngineOptions::builder()
                .convert_to_kwh(true)
                .intervals(collect.params.intervals.clone())
                .group_by(BucketGranularity::for_samples(&samples))
                .zone(self.normalizer.zone())
                .summary(collect.params.carry.clone());
            if let Some(table) = &collect.params.prices {
                builder = builder.prices(table.clone());
            }
            if let Some(tempo) = &self.tempo {
                builder = builder.tempo_calendar(tempo.clone());
            }

            stats.insert(*direction, compute(&samples, &builder.build()));
        }
        Ok(stats)
    }

    /// Tempo color of `date` from the last fetched calendar
    pub fn tempo_day(&self, date: NaiveDate) -> Option<TempoColor> {
        self.tempo.as_ref().and_then(|t| t.color_on(date))
    }

    pub fn tempo_today(&self) -> Option<TempoColor> {
        self.tempo_day(Local::now().date_naive())
    }
}

/// Fetch a whole window, splitting load curves into provider-sized chunks
async fn fetch_window(
    source: &dyn MeterDataSource,
    point_id: &str,
    service: ServiceKind,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Reading>> {
    let chunks = if service.is_daily() {
        vec![(start, end)]
    } else {
        date_chunks(start, end, Duration::days(LOAD_CURVE_CHUNK_DAYS))
    };

    let mut readings = Vec::new();
    for (from, to) in chunks {
        let payload = source.fetch_readings(point_id, service, from, to).await?;
        readings.extend(payload.into_readings());
    }
    Ok(readings)
}

/// Consecutive `[from, to)` windows of at most `step` covering `[start, end)`.
/// A non-positive step yields the whole range as one window.
pub fn date_chunks(start: NaiveDate, end: NaiveDate, step: Duration) -> Vec<(NaiveDate, NaiveDate)> {
    if step <= Duration::zero() {
        return vec![(start, end)];
    }
    let mut chunks = Vec::new();
    let mut cursor = start;
    while cursor + step < end {
        chunks.push((cursor, cursor + step));
        cursor += step;
    }
    chunks.push((cursor, end));
    chunks
}

#[cfg(test)]
mod tests {
    use super::source::{MockMeterDataSource, MockTariffCalendarSource};
    use super::*;
    use crate::domain::{ClassificationTag, MeterReadingPayload, PriceTable, TempoRates};
    use anyhow::anyhow;
    use chrono_tz::Europe::Paris;
    use rstest::rstest;

    const POINT: &str = "01234567890123";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_payload() -> MeterReadingPayload {
        MeterReadingPayload::new(vec![
            Reading::daily("2023-03-01", "10000"),
            Reading::daily("2023-03-02", "12000"),
            Reading::daily("2023-03-03", "8000"),
        ])
    }

    fn daily_consumption() -> CollectParams {
        CollectParams::builder(ServiceKind::DailyConsumption)
            .start(date(2023, 3, 1))
            .end(date(2023, 3, 4))
            .build()
    }

    fn tempo_table() -> PriceTable {
        PriceTable::builder()
            .tempo(
                ClassificationTag::Standard,
                TempoRates {
                    blue: 0.1,
                    white: 0.2,
                    red: 0.5,
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_date_chunks() {
        let chunks = date_chunks(date(2023, 3, 1), date(2023, 3, 17), Duration::days(7));
        assert_eq!(
            chunks,
            vec![
                (date(2023, 3, 1), date(2023, 3, 8)),
                (date(2023, 3, 8), date(2023, 3, 15)),
                (date(2023, 3, 15), date(2023, 3, 17)),
            ]
        );

        let single = date_chunks(date(2023, 3, 1), date(2023, 3, 8), Duration::days(7));
        assert_eq!(single, vec![(date(2023, 3, 1), date(2023, 3, 8))]);
    }

    #[rstest]
    #[case(Duration::zero())]
    #[case(Duration::days(-1))]
    fn test_date_chunks_non_positive_step_is_one_window(#[case] step: Duration) {
        let chunks = date_chunks(date(2023, 3, 1), date(2023, 3, 17), step);
        assert_eq!(chunks, vec![(date(2023, 3, 1), date(2023, 3, 17))]);
    }

    #[test]
    fn test_price_form_selects_subscription() {
        let mut meter = MeterPoint::new(POINT, Arc::new(MockMeterDataSource::new()), None);
        assert_eq!(meter.subscription(), Subscription::Base);

        let flat = PriceTable::builder()
            .flat(ClassificationTag::Standard, 0.2)
            .build()
            .unwrap();
        meter.set_collect(
            CollectParams::builder(ServiceKind::DailyConsumption)
                .prices(flat)
                .build(),
        );
        assert_eq!(meter.subscription(), Subscription::OffPeak);

        meter.set_collect(
            CollectParams::builder(ServiceKind::ConsumptionLoadCurve)
                .prices(tempo_table())
                .build(),
        );
        assert_eq!(meter.subscription(), Subscription::Tempo);
        assert_eq!(
            meter.params(Direction::Consumption).unwrap().service,
            ServiceKind::ConsumptionLoadCurve
        );
    }

    #[tokio::test]
    async fn test_update_without_collect_is_not_configured() {
        let mut meter = MeterPoint::new(POINT, Arc::new(MockMeterDataSource::new()), None);
        let err = meter.update_collects().await.unwrap_err();
        assert!(matches!(err, CollectorError::NotConfigured));
        assert!(matches!(meter.stats(), Err(CollectorError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_update_and_stats_daily_consumption() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .withf(|_, service, start, end| {
                *service == ServiceKind::DailyConsumption
                    && *start == NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
                    && *end == NaiveDate::from_ymd_opt(2023, 3, 4).unwrap()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(daily_payload()));

        let mut meter =
            MeterPoint::new(POINT, Arc::new(source), None).with_zone(LocalZone::Named(Paris));
        meter.set_collect(daily_consumption());
        meter.update_collects().await.unwrap();
        assert!(meter.has_collected());
        assert_eq!(meter.readings(Direction::Consumption).len(), 3);

        let stats = meter.stats().unwrap();
        let rows = &stats[&Direction::Consumption];
        // The start day itself falls on the boundary and is excluded
        assert_eq!(rows.len(), 2);
        assert!((rows[0].energy_value - 12.0).abs() < 0.001);
        assert!((rows[1].running_energy_sum.unwrap() - 20.0).abs() < 0.001);
        assert!(rows.iter().all(|r| r.price.is_none()));
    }

    #[tokio::test]
    async fn test_provider_failure_marks_collect_incomplete() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .withf(|_, service, _, _| *service == ServiceKind::DailyConsumption)
            .returning(|_, _, _, _| Err(anyhow!("quota reached")));
        source
            .expect_fetch_readings()
            .withf(|_, service, _, _| *service == ServiceKind::DailyProduction)
            .returning(|_, _, _, _| Ok(daily_payload()));

        let mut meter = MeterPoint::new(POINT, Arc::new(source), None);
        meter.set_collect(daily_consumption());
        meter.set_collect(
            CollectParams::builder(ServiceKind::DailyProduction)
                .start(date(2023, 2, 28))
                .end(date(2023, 3, 4))
                .build(),
        );

        meter.update_collects().await.unwrap();
        assert!(!meter.has_collected());
        assert!(meter.readings(Direction::Consumption).is_empty());
        assert_eq!(meter.readings(Direction::Production).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_an_error() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .returning(|_, _, _, _| Ok(MeterReadingPayload::default()));

        let mut meter = MeterPoint::new(POINT, Arc::new(source), None);
        meter.set_collect(daily_consumption());

        let err = meter.update_collects().await.unwrap_err();
        assert!(matches!(
            err,
            CollectorError::EmptyDataset(Direction::Consumption)
        ));
        assert!(!meter.has_collected());
    }

    #[tokio::test]
    async fn test_load_curve_fetched_in_chunks() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .times(3)
            .returning(|_, _, start, _| {
                let date = format!("{} 10:00:00", start.format("%Y-%m-%d"));
                Ok(MeterReadingPayload::new(vec![Reading::sampled(
                    date, "1000", "PT30M",
                )]))
            });

        let mut meter = MeterPoint::new(POINT, Arc::new(source), None);
        meter.set_collect(
            CollectParams::builder(ServiceKind::ConsumptionLoadCurve)
                .start(date(2023, 3, 1))
                .end(date(2023, 3, 17))
                .build(),
        );
        meter.update_collects().await.unwrap();

        assert_eq!(meter.readings(Direction::Consumption).len(), 3);
    }

    #[tokio::test]
    async fn test_tempo_calendar_fetched_for_consumption() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .returning(|_, _, _, _| Ok(daily_payload()));

        let mut calendar = MockTariffCalendarSource::new();
        calendar
            .expect_fetch_tempo_days()
            .times(1)
            .returning(|_, _| {
                Ok([
                    (NaiveDate::from_ymd_opt(2023, 3, 2).unwrap(), TempoColor::White),
                    (NaiveDate::from_ymd_opt(2023, 3, 3).unwrap(), TempoColor::Red),
                ]
                .into_iter()
                .collect())
            });

        let mut meter = MeterPoint::new(POINT, Arc::new(source), Some(Arc::new(calendar)))
            .with_zone(LocalZone::Named(Paris));
        meter.set_collect(
            CollectParams::builder(ServiceKind::DailyConsumption)
                .start(date(2023, 3, 1))
                .end(date(2023, 3, 4))
                .prices(tempo_table())
                .build(),
        );
        meter.update_collects().await.unwrap();

        assert_eq!(meter.tempo_day(date(2023, 3, 3)), Some(TempoColor::Red));
        assert_eq!(meter.tempo_day(date(2023, 3, 5)), None);

        let stats = meter.stats().unwrap();
        let rows = &stats[&Direction::Consumption];
        assert_eq!(rows[0].tempo_color, Some(TempoColor::White));
        assert!((rows[0].price.unwrap() - 12.0 * 0.2).abs() < 0.001);
        assert!((rows[1].price.unwrap() - 8.0 * 0.5).abs() < 0.001);
        assert!((rows[1].running_cost_sum.unwrap() - 6.4).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_calendar_failure_marks_collect_incomplete() {
        let mut source = MockMeterDataSource::new();
        source
            .expect_fetch_readings()
            .returning(|_, _, _, _| Ok(daily_payload()));
        let mut calendar = MockTariffCalendarSource::new();
        calendar
            .expect_fetch_tempo_days()
            .returning(|_, _| Err(anyhow!("rte unavailable")));

        let mut meter = MeterPoint::new(POINT, Arc::new(source), Some(Arc::new(calendar)));
        meter.set_collect(
            CollectParams::builder(ServiceKind::DailyConsumption)
                .start(date(2023, 3, 1))
                .end(date(2023, 3, 4))
                .prices(tempo_table())
                .build(),
        );
        meter.update_collects().await.unwrap();

        assert!(!meter.has_collected());
        assert_eq!(meter.tempo_day(date(2023, 3, 2)), None);
    }

    #[test]
    fn test_stats_surfaces_malformed_reading() {
        let mut meter = MeterPoint::new(POINT, Arc::new(MockMeterDataSource::new()), None);
        meter.set_collect(daily_consumption());
        if let Some(collect) = meter.collects.get_mut(&Direction::Consumption) {
            collect.readings = vec![Reading::daily("2023-03-05", "n/a")];
        }

        let err = meter.stats().unwrap_err();
        assert!(matches!(
            err,
            CollectorError::Analytics(AnalyticsError::MalformedReading { index: 0, .. })
        ));
    }
}
