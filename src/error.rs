use thiserror::Error;

/// Field of a raw reading that failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReadingField {
    Date,
    Value,
}

/// Errors raised by the normalizer and by the typed configuration builders
#[derive(Debug, Error, PartialEq)]
pub enum AnalyticsError {
    /// A raw record could not be parsed. Fatal for the whole batch.
    #[error("Malformed reading #{index}: invalid {field} {input:?}")]
    MalformedReading {
        index: usize,
        field: ReadingField,
        input: String,
    },

    /// Inconsistent tariff or interval configuration, rejected at the boundary.
    #[error("Configuration mismatch: {0}")]
    ConfigurationMismatch(String),
}

pub type Result<T, E = AnalyticsError> = std::result::Result<T, E>;
