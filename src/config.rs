use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::analytics::LocalZone;
use crate::collector::{CollectParams, MeterDataSource, MeterPoint, TariffCalendarSource};
use crate::domain::{ClassificationTag, IntervalSet, PriceTable, ServiceKind, TariffRate};
use crate::error::AnalyticsError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub meter: MeterConfig,
    #[validate(nested)]
    pub consumption: Option<CollectSection>,
    #[validate(nested)]
    pub production: Option<CollectSection>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MeterConfig {
    /// 14-digit delivery point identifier
    #[validate(length(equal = 14), custom(function = "validate_digits"))]
    pub point_id: String,
    /// IANA zone of the provider timestamps, host zone when absent
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct CollectSection {
    pub service: ServiceKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub intervals: Vec<(String, String)>,
    #[serde(default)]
    pub prices: BTreeMap<ClassificationTag, TariffRate>,
    #[serde(default)]
    pub cum_value: BTreeMap<ClassificationTag, f64>,
    #[serde(default)]
    pub cum_price: BTreeMap<ClassificationTag, f64>,
}

impl CollectSection {
    /// Typed collect parameters; mixed price forms and bad clock strings are rejected
    pub fn to_params(&self) -> Result<CollectParams, AnalyticsError> {
        let mut builder =
            CollectParams::builder(self.service).intervals(IntervalSet::parse(&self.intervals)?);
        if let Some(start) = self.start {
            builder = builder.start(start);
        }
        if let Some(end) = self.end {
            builder = builder.end(end);
        }
        if !self.prices.is_empty() {
            builder = builder.prices(PriceTable::from_rates(self.prices.clone())?);
        }
        for (tag, energy) in &self.cum_value {
            builder = builder.cum_value(*tag, *energy);
        }
        for (tag, cost) in &self.cum_price {
            builder = builder.cum_price(*tag, *cost);
        }
        Ok(builder.build())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("METER__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn zone(&self) -> Result<LocalZone> {
        match &self.meter.timezone {
            Some(name) => Ok(LocalZone::Named(parse_zone(name)?)),
            None => Ok(LocalZone::System),
        }
    }

    /// Meter point with every configured section registered as a collect
    pub fn meter_point(
        &self,
        source: Arc<dyn MeterDataSource>,
        calendar: Option<Arc<dyn TariffCalendarSource>>,
    ) -> Result<MeterPoint> {
        let mut meter =
            MeterPoint::new(self.meter.point_id.clone(), source, calendar).with_zone(self.zone()?);
        for section in [&self.consumption, &self.production].into_iter().flatten() {
            meter.set_collect(section.to_params()?);
        }
        Ok(meter)
    }
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| anyhow!("unknown time zone {name:?}"))
}

fn validate_digits(value: &str) -> Result<(), ValidationError> {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("point_id_digits"))
    }
}

fn validate_timezone(value: &str) -> Result<(), ValidationError> {
    parse_zone(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_timezone"))
}

fn validate_window(section: &CollectSection) -> Result<(), ValidationError> {
    match (section.start, section.end) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::new("start_after_end")),
        _ => Ok(()),
    }
}
