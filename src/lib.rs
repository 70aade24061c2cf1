//! Billing-ready statistics from smart meter load curves and daily indexes.
//!
//! Provider records are normalized into an ordered sample series
//! ([`analytics::Normalizer`]), classified into off-peak and standard bands,
//! grouped into hourly or daily buckets, priced and accumulated
//! ([`analytics::compute`]). [`collector::MeterPoint`] ties the pipeline to
//! asynchronous data providers.

pub mod analytics;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod telemetry;

pub use analytics::{compute, normalize, EngineOptions, LocalZone, Normalizer};
pub use collector::{CollectParams, CollectorError, MeterPoint};
pub use error::{AnalyticsError, Result};
