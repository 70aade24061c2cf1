use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{ClassificationTag, TempoColor};
use crate::error::{AnalyticsError, Result};

// ============================================================================
// Price table
// ============================================================================

/// Unit prices of a tempo contract, one per day color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoRates {
    pub blue: f64,
    pub white: f64,
    pub red: f64,
}

impl TempoRates {
    pub fn for_color(&self, color: TempoColor) -> f64 {
        match color {
            TempoColor::Blue => self.blue,
            TempoColor::White => self.white,
            TempoColor::Red => self.red,
        }
    }
}

/// Unit price (currency per kWh) attached to one classification tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TariffRate {
    Flat { price: f64 },
    Tempo(TempoRates),
}

impl TariffRate {
    pub fn is_tempo(&self) -> bool {
        matches!(self, Self::Tempo(_))
    }

    /// Unit price for a bucket. A tempo rate needs the day's color.
    pub fn unit_price(&self, color: Option<TempoColor>) -> Option<f64> {
        match self {
            Self::Flat { price } => Some(*price),
            Self::Tempo(rates) => color.map(|c| rates.for_color(c)),
        }
    }
}

/// Per-tag price table. All entries share the same form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceTable {
    rates: BTreeMap<ClassificationTag, TariffRate>,
}

impl PriceTable {
    pub fn builder() -> PriceTableBuilder {
        PriceTableBuilder::default()
    }

    /// Build from already-keyed rates, rejecting mixed flat/tempo forms
    pub fn from_rates(rates: BTreeMap<ClassificationTag, TariffRate>) -> Result<Self> {
        let tempo = rates.values().filter(|r| r.is_tempo()).count();
        if tempo != 0 && tempo != rates.len() {
            return Err(AnalyticsError::ConfigurationMismatch(
                "price table mixes flat and tempo rates".to_string(),
            ));
        }
        Ok(Self { rates })
    }

    pub fn rate(&self, tag: ClassificationTag) -> Option<&TariffRate> {
        self.rates.get(&tag)
    }

    /// Unit price for a tag, `None` when the tag has no entry or a tempo
    /// entry meets a day without color
    pub fn unit_price(&self, tag: ClassificationTag, color: Option<TempoColor>) -> Option<f64> {
        self.rates.get(&tag).and_then(|rate| rate.unit_price(color))
    }

    pub fn is_tempo(&self) -> bool {
        self.rates.values().any(TariffRate::is_tempo)
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = ClassificationTag> + '_ {
        self.rates.keys().copied()
    }
}

#[derive(Debug, Default)]
pub struct PriceTableBuilder {
    rates: BTreeMap<ClassificationTag, TariffRate>,
}

impl PriceTableBuilder {
    pub fn flat(mut self, tag: ClassificationTag, price: f64) -> Self {
        self.rates.insert(tag, TariffRate::Flat { price });
        self
    }

    pub fn tempo(mut self, tag: ClassificationTag, rates: TempoRates) -> Self {
        self.rates.insert(tag, TariffRate::Tempo(rates));
        self
    }

    pub fn build(self) -> Result<PriceTable> {
        PriceTable::from_rates(self.rates)
    }
}

// ============================================================================
// Carry-over sums
// ============================================================================

/// Running totals carried from a previous billing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarryOver {
    pub energy: f64,
    pub cost: f64,
}

/// Starting point of the running sums, per tag. Missing tags start at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CumulativeCarry(BTreeMap<ClassificationTag, CarryOver>);

impl CumulativeCarry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_energy(mut self, tag: ClassificationTag, energy: f64) -> Self {
        self.0.entry(tag).or_default().energy = energy;
        self
    }

    pub fn with_cost(mut self, tag: ClassificationTag, cost: f64) -> Self {
        self.0.entry(tag).or_default().cost = cost;
        self
    }

    pub fn get(&self, tag: ClassificationTag) -> CarryOver {
        self.0.get(&tag).copied().unwrap_or_default()
    }
}

// ============================================================================
// Tempo calendar
// ============================================================================

/// Day colors keyed by calendar date (`"YYYY-MM-DD"` on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempoCalendar(BTreeMap<NaiveDate, TempoColor>);

impl TempoCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, color: TempoColor) {
        self.0.insert(date, color);
    }

    pub fn color_on(&self, date: NaiveDate) -> Option<TempoColor> {
        self.0.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NaiveDate, TempoColor)> for TempoCalendar {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, TempoColor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
