//! Incremental extract-clean-load pipeline for AEMET daily climatological
//! observations: station inventory, watermark-driven window planning, rate
//! limited downloads with retry, gap-aware imputation and chunked loading.

mod cleaning;
mod config;
mod error;
mod extraction;
mod load;
mod pipeline;
mod stations;
mod types;
mod utils;

pub use self::config::*;
pub use error::EtlError;
pub use pipeline::{EtlPipeline, RunSummary};

pub use stations::error::InventoryError;
pub use stations::inventory::fetch_inventory;

pub use extraction::api::{daily_endpoint, AemetClient, OpenDataApi, INVENTORY_ENDPOINT};
pub use extraction::downloader::{StationDownload, StationDownloader, EXTRACTION_TIMESTAMP_FORMAT};
pub use extraction::error::{ExtractionError, FetchError};
pub use extraction::orchestrator::{ExtractionOutcome, ExtractionSummary, Extractor};
pub use extraction::planner::{DateWindow, WindowPlan, WindowPlanner};
pub use extraction::raw_store::RawStore;
pub use extraction::retry::RetryPolicy;
pub use extraction::throttle::Throttle;

pub use cleaning::audit::{read_cleaned_csv, write_cleaned_csv};
pub use cleaning::coerce::{parse_date, parse_decimal, parse_timestamp, Rejection};
pub use cleaning::engine::{dedup_keep_last, Cleaner, CleaningReport};
pub use cleaning::error::CleaningError;
pub use cleaning::imputation::{fill_series, impute_station, median, missing_runs, DEFAULT_GAP_THRESHOLD};
pub use cleaning::regions::ProvinceMap;
pub use cleaning::thresholds::{enforce_temperature_order, Thresholds};

pub use load::error::LoadError;
pub use load::loader::Loader;
pub use load::session::StoreSession;

pub use types::cleaned::{CleanedRecord, CLEANED_COLUMNS};
pub use types::observation::{ObservationField, RawObservation, UnknownField, RAW_COLUMNS};
pub use types::province::{fold_label, province_by_code, Province, PROVINCES, PROVINCE_ALIASES};
pub use types::station::{parse_coordinate, Station};
