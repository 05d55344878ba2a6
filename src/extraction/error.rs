use crate::stations::error::InventoryError;
use polars::error::PolarsError;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single provider call (either step of the two-step fetch).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("Provider rejected {url} with estado {estado}: {description}")]
    Upstream {
        url: String,
        estado: u16,
        description: String,
    },

    // estado 404: "No hay datos que satisfagan esos criterios"
    #[error("No data available for {0}")]
    NoData(String),

    #[error("Malformed payload from {url}: {message}")]
    MalformedPayload { url: String, message: String },
}

impl FetchError {
    /// Whether the two-step fetch should be attempted again after this error.
    ///
    /// Missing data and rejected credentials are final; everything else
    /// (transport errors, timeouts, non-success statuses, bad payloads) is
    /// treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::NetworkRequest(..) => true,
            FetchError::HttpStatus { status, .. } => !is_credential_status(status.as_u16()),
            FetchError::Upstream { estado, .. } => !is_credential_status(*estado),
            FetchError::NoData(_) => false,
            FetchError::MalformedPayload { .. } => true,
        }
    }
}

fn is_credential_status(code: u16) -> bool {
    code == 401 || code == 403
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Failed to build the HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to read raw store '{0}'")]
    RawStoreRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write raw store '{0}'")]
    RawStoreWrite(PathBuf, #[source] PolarsError),

    #[error("I/O error on raw store '{0}'")]
    RawStoreIo(PathBuf, #[source] std::io::Error),

    #[error("Raw store '{path}' has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
