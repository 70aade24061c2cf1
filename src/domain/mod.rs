pub mod bucket;
pub mod intervals;
pub mod meter;
pub mod tariff;
pub mod types;

pub use bucket::*;
pub use intervals::*;
pub use meter::*;
pub use tariff::*;
pub use types::*;
