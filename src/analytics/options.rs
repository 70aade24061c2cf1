use super::normalizer::LocalZone;
use crate::domain::{BucketGranularity, CumulativeCarry, IntervalSet, PriceTable, TempoCalendar};

/// Everything [`compute`](super::engine::compute) needs besides the samples.
///
/// Defaults: raw units, no off-peak windows, no grouping (hourly when
/// enabled), no running sums, zero carry, no pricing, no tempo calendar,
/// zero-valued buckets retained, day buckets cut at each sample's own
/// offset (no zone).
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub convert_to_kwh: bool,
    pub intervals: IntervalSet,
    pub group_by_bucket: bool,
    pub granularity: BucketGranularity,
    /// Zone whose calendar days delimit `Day` buckets
    pub zone: Option<LocalZone>,
    pub compute_summary: bool,
    pub carry: CumulativeCarry,
    pub price_table: Option<PriceTable>,
    pub tempo_calendar: Option<TempoCalendar>,
    pub drop_zero_buckets: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            convert_to_kwh: false,
            intervals: IntervalSet::default(),
            group_by_bucket: false,
            granularity: BucketGranularity::Hour,
            zone: None,
            compute_summary: false,
            carry: CumulativeCarry::default(),
            price_table: None,
            tempo_calendar: None,
            drop_zero_buckets: false,
        }
    }
}

impl EngineOptions {
    pub fn builder() -> EngineOptionsBuilder {
        EngineOptionsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct EngineOptionsBuilder {
    options: EngineOptions,
}

impl EngineOptionsBuilder {
    pub fn convert_to_kwh(mut self, convert: bool) -> Self {
        self.options.convert_to_kwh = convert;
        self
    }

    pub fn intervals(mut self, intervals: IntervalSet) -> Self {
        self.options.intervals = intervals;
        self
    }

    /// Group samples into buckets of the given size
    pub fn group_by(mut self, granularity: BucketGranularity) -> Self {
        self.options.group_by_bucket = true;
        self.options.granularity = granularity;
        self
    }

    /// Cut day buckets at local midnight of `zone`, so a DST change day
    /// stays a single bucket
    pub fn zone(mut self, zone: LocalZone) -> Self {
        self.options.zone = Some(zone);
        self
    }

    pub fn summary(mut self, carry: CumulativeCarry) -> Self {
        self.options.compute_summary = true;
        self.options.carry = carry;
        self
    }

    pub fn prices(mut self, table: PriceTable) -> Self {
        self.options.price_table = Some(table);
        self
    }

    pub fn tempo_calendar(mut self, calendar: TempoCalendar) -> Self {
        self.options.tempo_calendar = Some(calendar);
        self
    }

    /// Legacy policy: discard buckets whose summed value is exactly zero
    pub fn drop_zero_buckets(mut self, drop: bool) -> Self {
        self.options.drop_zero_buckets = drop;
        self
    }

    pub fn build(self) -> EngineOptions {
        self.options
    }
}
