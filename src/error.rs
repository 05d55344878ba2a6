use crate::cleaning::error::CleaningError;
use crate::config::ConfigError;
use crate::extraction::error::ExtractionError;
use crate::load::error::LoadError;
use crate::stations::error::InventoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Cleaning(#[from] CleaningError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<InventoryError> for EtlError {
    fn from(e: InventoryError) -> Self {
        EtlError::Extraction(ExtractionError::Inventory(e))
    }
}
