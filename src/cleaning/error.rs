use crate::extraction::error::ExtractionError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("Province alias '{alias}' points to unknown province '{target}'")]
    RegionMapping { alias: String, target: String },

    #[error("Failed to read raw input")]
    RawInput(#[from] ExtractionError),

    #[error("Failed to read cleaned file '{0}'")]
    CleanedRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write cleaned file '{0}'")]
    CleanedWrite(PathBuf, #[source] PolarsError),

    #[error("I/O error on cleaned file '{0}'")]
    CleanedIo(PathBuf, #[source] std::io::Error),

    #[error("Cleaned file '{path}' has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
