pub mod cleaned;
pub(crate) mod lenient;
pub mod observation;
pub mod province;
pub mod station;
