use crate::extraction::error::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Station inventory unavailable")]
    UpstreamUnavailable(#[source] FetchError),

    #[error("Station inventory is missing the '{0}' column")]
    MissingColumn(String),

    #[error("Failed to parse station inventory entry")]
    JsonParse(#[from] serde_json::Error),
}
