pub mod audit;
pub mod coerce;
pub mod engine;
pub mod error;
pub mod imputation;
pub mod regions;
pub mod thresholds;
