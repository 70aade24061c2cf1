//! Reading normalizer
//!
//! Turns provider records into a canonical, ordered sample series:
//! timestamp parsing, local/UTC time reference, midnight rollover fix,
//! start-boundary truncation and duration weights.

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::debug;

use crate::domain::{CanonicalSample, Reading};
use crate::error::{AnalyticsError, ReadingField, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time zone the provider's naive timestamps are expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// Zone of the host system
    #[default]
    System,
    /// Explicit IANA zone, e.g. `Europe/Paris`
    Named(Tz),
}

impl LocalZone {
    /// Attach the zone to a naive wall-clock timestamp.
    ///
    /// Ambiguous times (fall back) resolve to the earliest instant, times in a
    /// spring-forward gap to the first valid minute after it.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::System => localize_in(&Local, naive),
            Self::Named(tz) => localize_in(tz, naive),
        }
    }

    /// Local midnight of the calendar day holding `instant` in this zone.
    ///
    /// On DST change days the offset is the one in force at midnight, not the
    /// instant's own.
    pub fn day_start(&self, instant: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let date = match self {
            Self::System => instant.with_timezone(&Local).date_naive(),
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
        };
        date.and_hms_opt(0, 0, 0).and_then(|midnight| self.localize(midnight))
    }
}

fn localize_in<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.fixed_offset()),
        LocalResult::None => (1..=120)
            .find_map(|m| {
                zone.from_local_datetime(&(naive + Duration::minutes(m)))
                    .single()
            })
            .map(|dt| dt.fixed_offset()),
    }
}

/// Parses and orders raw readings
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    zone: LocalZone,
}

impl Normalizer {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }

    pub fn with_timezone(tz: Tz) -> Self {
        Self::new(LocalZone::Named(tz))
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Normalize a batch of readings.
    ///
    /// Fails with [`AnalyticsError::MalformedReading`] on the first record
    /// whose date or value cannot be parsed; nothing is skipped silently.
    pub fn normalize(
        &self,
        readings: &[Reading],
        use_utc: bool,
        start_boundary: Option<NaiveDate>,
    ) -> Result<Vec<CanonicalSample>> {
        let boundary_end = match start_boundary {
            Some(day) => Some(self.boundary_end(day)?),
            None => None,
        };

        let mut samples = Vec::with_capacity(readings.len());
        for (index, reading) in readings.iter().enumerate() {
            let sample = self.normalize_one(index, reading, use_utc)?;
            if boundary_end.map_or(true, |end| sample.instant > end) {
                samples.push(sample);
            }
        }

        // stable: equal instants keep their input order
        samples.sort_by_key(|s| s.instant);

        debug!(
            readings = readings.len(),
            samples = samples.len(),
            use_utc,
            "normalized meter readings"
        );
        Ok(samples)
    }

    fn normalize_one(&self, index: usize, reading: &Reading, use_utc: bool) -> Result<CanonicalSample> {
        let malformed = |field: ReadingField, input: &str| AnalyticsError::MalformedReading {
            index,
            field,
            input: input.to_string(),
        };

        let naive = parse_timestamp(&reading.date).ok_or_else(|| malformed(ReadingField::Date, &reading.date))?;
        let raw_value: f64 = reading
            .value
            .trim()
            .parse()
            .map_err(|_| malformed(ReadingField::Value, &reading.value))?;

        let sub_daily = reading
            .interval_length
            .as_deref()
            .is_some_and(|code| !code.trim().is_empty());

        let mut instant = self
            .zone
            .localize(naive)
            .ok_or_else(|| malformed(ReadingField::Date, &reading.date))?;

        // The provider stamps the last slot of a day at 00:00 of the next day
        if sub_daily && naive.num_seconds_from_midnight() == 0 {
            instant -= Duration::minutes(1);
        }

        if use_utc {
            instant = instant.with_timezone(&Utc).fixed_offset();
        }

        Ok(CanonicalSample {
            instant,
            raw_value,
            duration_weight: duration_weight(reading.interval_length.as_deref()),
            sub_daily,
        })
    }

    fn boundary_end(&self, day: NaiveDate) -> Result<DateTime<FixedOffset>> {
        day.and_hms_opt(23, 59, 59)
            .and_then(|naive| self.zone.localize(naive))
            .ok_or_else(|| {
                AnalyticsError::ConfigurationMismatch(format!("start boundary {day} cannot be localized"))
            })
    }
}

/// Normalize with the system time zone
pub fn normalize(
    readings: &[Reading],
    use_utc: bool,
    start_boundary: Option<NaiveDate>,
) -> Result<Vec<CanonicalSample>> {
    Normalizer::default().normalize(readings, use_utc, start_boundary)
}

/// `"%Y-%m-%d %H:%M:%S"`, falling back to `"%Y-%m-%d"` at midnight
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Sample length in hours from an interval code.
///
/// Exactly one `PT{mm}M` fragment gives `mm / 60`; anything else, including
/// no code at all, gives 1.
pub fn duration_weight(code: Option<&str>) -> f64 {
    let Some(code) = code else {
        return 1.0;
    };

    let minutes: Vec<u32> = code
        .match_indices("PT")
        .filter_map(|(i, _)| {
            let rest = &code[i + 2..];
            let digits = rest.get(..2)?;
            if digits.bytes().all(|b| b.is_ascii_digit()) && rest[2..].starts_with('M') {
                digits.parse().ok()
            } else {
                None
            }
        })
        .collect();

    match minutes.as_slice() {
        [m] => f64::from(*m) / 60.0,
        _ => 1.0,
    }
}
