use chrono::{Duration, NaiveDate};

use crate::domain::{ClassificationTag, CumulativeCarry, IntervalSet, PriceTable, ServiceKind};

/// What to collect for one direction of a meter point and how to price it
#[derive(Debug, Clone)]
pub struct CollectParams {
    pub service: ServiceKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub intervals: IntervalSet,
    pub prices: Option<PriceTable>,
    pub carry: CumulativeCarry,
}

impl CollectParams {
    pub fn builder(service: ServiceKind) -> CollectParamsBuilder {
        CollectParamsBuilder {
            params: CollectParams {
                service,
                start: None,
                end: None,
                intervals: IntervalSet::default(),
                prices: None,
                carry: CumulativeCarry::default(),
            },
        }
    }

    /// Concrete `[start, end]` window: missing bounds default to the
    /// service lookback before `today` and the day after `today`
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self
            .start
            .unwrap_or(today - self.service.default_lookback());
        let end = self.end.unwrap_or(today + Duration::days(1));
        (start, end)
    }
}

pub struct CollectParamsBuilder {
    params: CollectParams,
}

impl CollectParamsBuilder {
    pub fn start(mut self, date: NaiveDate) -> Self {
        self.params.start = Some(date);
        self
    }

    pub fn end(mut self, date: NaiveDate) -> Self {
        self.params.end = Some(date);
        self
    }

    pub fn intervals(mut self, intervals: IntervalSet) -> Self {
        self.params.intervals = intervals;
        self
    }

    pub fn prices(mut self, table: PriceTable) -> Self {
        self.params.prices = Some(table);
        self
    }

    pub fn carry(mut self, carry: CumulativeCarry) -> Self {
        self.params.carry = carry;
        self
    }

    pub fn cum_value(mut self, tag: ClassificationTag, energy: f64) -> Self {
        self.params.carry = self.params.carry.with_energy(tag, energy);
        self
    }

    pub fn cum_price(mut self, tag: ClassificationTag, cost: f64) -> Self {
        self.params.carry = self.params.carry.with_cost(tag, cost);
        self
    }

    pub fn build(self) -> CollectParams {
        self.params
    }
}
