//! Classification & aggregation engine
//!
//! Tags canonical samples as off-peak or standard, groups them into
//! time buckets, attaches tempo colors and prices, and accumulates
//! per-tag running sums.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use super::options::EngineOptions;
use crate::domain::{
    AggregatedBucket, BucketGranularity, CanonicalSample, ClassificationTag, IntervalSet,
};

const WH_PER_KWH: f64 = 1000.0;

/// Run the full classification/aggregation pipeline over a normalized series.
///
/// Never fails: missing rates or tempo colors leave prices unset.
pub fn compute(samples: &[CanonicalSample], options: &EngineOptions) -> Vec<AggregatedBucket> {
    if samples.is_empty() {
        return Vec::new();
    }

    // Rows come out ordered by (tag, bucket_start) from both branches
    let mut rows = if options.group_by_bucket {
        group(samples, options)
    } else {
        let mut rows: Vec<AggregatedBucket> = samples
            .iter()
            .map(|s| {
                AggregatedBucket::new(
                    s.instant,
                    classify(s, &options.intervals),
                    energy_value(s, options.convert_to_kwh),
                )
            })
            .collect();
        rows.sort_by_key(|r| (r.classification, r.bucket_start));
        rows
    };

    if let Some(calendar) = &options.tempo_calendar {
        for row in rows.iter_mut() {
            row.tempo_color = calendar.color_on(row.bucket_start.date_naive());
        }
    }

    if let Some(table) = &options.price_table {
        let mut unpriced = 0usize;
        for row in rows.iter_mut() {
            row.price = table
                .unit_price(row.classification, row.tempo_color)
                .map(|unit| row.energy_value * unit);
            if row.price.is_none() {
                unpriced += 1;
            }
        }
        if unpriced > 0 {
            debug!(unpriced, total = rows.len(), "Buckets left without a price");
        }
    }

    if options.compute_summary {
        accumulate(&mut rows, options);
    }

    rows.sort_by_key(|r| (r.bucket_start, r.classification));
    debug!(
        samples = samples.len(),
        buckets = rows.len(),
        grouped = options.group_by_bucket,
        "Aggregated meter samples"
    );
    rows
}

/// OffPeak when the sample's wall-clock time falls in any configured window
pub fn classify(sample: &CanonicalSample, intervals: &IntervalSet) -> ClassificationTag {
    if intervals.contains(sample.time_of_day()) {
        ClassificationTag::OffPeak
    } else {
        ClassificationTag::Standard
    }
}

/// Energy carried by a sample: raw value scaled by its duration weight
pub fn energy_value(sample: &CanonicalSample, convert_to_kwh: bool) -> f64 {
    let value = sample.raw_value * sample.duration_weight;
    if convert_to_kwh {
        value / WH_PER_KWH
    } else {
        value
    }
}

fn group(samples: &[CanonicalSample], options: &EngineOptions) -> Vec<AggregatedBucket> {
    let mut groups: BTreeMap<(ClassificationTag, DateTime<FixedOffset>), f64> = BTreeMap::new();
    for sample in samples {
        let tag = classify(sample, &options.intervals);
        let start = bucket_start(sample.instant, options);
        *groups.entry((tag, start)).or_insert(0.0) += energy_value(sample, options.convert_to_kwh);
    }

    let before = groups.len();
    let rows: Vec<AggregatedBucket> = groups
        .into_iter()
        .filter(|(_, value)| !(options.drop_zero_buckets && *value == 0.0))
        .map(|((tag, start), value)| AggregatedBucket::new(start, tag, value))
        .collect();
    if rows.len() < before {
        debug!(dropped = before - rows.len(), "Dropped zero-valued buckets");
    }
    rows
}

/// Bucket holding `instant`. Day buckets follow the configured zone's
/// calendar when one is set.
fn bucket_start(
    instant: DateTime<FixedOffset>,
    options: &EngineOptions,
) -> DateTime<FixedOffset> {
    match (options.granularity, options.zone) {
        (BucketGranularity::Day, Some(zone)) => zone
            .day_start(instant)
            .unwrap_or_else(|| BucketGranularity::Day.truncate(instant)),
        (granularity, _) => granularity.truncate(instant),
    }
}

/// Per-tag running sums. Expects rows in ascending bucket order within each tag.
fn accumulate(rows: &mut [AggregatedBucket], options: &EngineOptions) {
    let priced = options.price_table.is_some();
    let mut totals: BTreeMap<ClassificationTag, (f64, f64)> = BTreeMap::new();

    for row in rows.iter_mut() {
        let (energy, cost) = totals.entry(row.classification).or_insert_with(|| {
            let carry = options.carry.get(row.classification);
            (carry.energy, carry.cost)
        });

        *energy += row.energy_value;
        row.running_energy_sum = Some(*energy);

        if priced {
            if let Some(price) = row.price {
                *cost += price;
                row.running_cost_sum = Some(*cost);
            }
        }
    }
}
