pub mod error;
pub mod inventory;
