pub mod engine;
pub mod normalizer;
pub mod options;

pub use engine::{classify, compute, energy_value};
pub use normalizer::{duration_weight, normalize, parse_timestamp, LocalZone, Normalizer};
pub use options::{EngineOptions, EngineOptionsBuilder};
