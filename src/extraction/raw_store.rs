//! The append-only raw incremental CSV and the per-station watermarks
//! derived from it.

use crate::extraction::error::ExtractionError;
use crate::types::observation::{RawObservation, RAW_COLUMNS};
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::task;

const REQUIRED_COLUMNS: [&str; 2] = ["indicativo", "fecha"];
const RAW_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct RawStore {
    path: PathBuf,
}

impl RawStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored record back, all values as text.
    ///
    /// A missing file is an empty store. The file must at least carry the
    /// station code and date columns; any other known column may be absent.
    pub async fn read_all(&self) -> Result<Vec<RawObservation>, ExtractionError> {
        let path = self.path.clone();
        task::spawn_blocking(move || read_raw_csv(&path)).await?
    }

    /// Latest stored date per station code. Rows with an unparseable date
    /// are ignored.
    pub async fn watermarks(&self) -> Result<HashMap<String, NaiveDate>, ExtractionError> {
        let rows = self.read_all().await?;
        let mut watermarks: HashMap<String, NaiveDate> = HashMap::new();
        for row in &rows {
            let (Some(code), Some(date)) = (row.station_code.as_deref(), row.date.as_deref()) else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(date, RAW_DATE_FORMAT) else {
                continue;
            };
            watermarks
                .entry(code.to_string())
                .and_modify(|d| *d = (*d).max(date))
                .or_insert(date);
        }
        debug!(
            "Derived watermarks for {} stations from {}",
            watermarks.len(),
            self.path.display()
        );
        Ok(watermarks)
    }

    /// Appends `rows` to the store. The header is written only when the file
    /// is new or empty.
    pub async fn append(&self, rows: &[RawObservation]) -> Result<(), ExtractionError> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.path.clone();
        let mut df = observations_to_frame(rows)
            .map_err(|e| ExtractionError::RawStoreWrite(path.clone(), e))?;

        crate::utils::ensure_parent_exists(&path)
            .await
            .map_err(|e| ExtractionError::RawStoreIo(path.clone(), e))?;

        task::spawn_blocking(move || {
            let write_header = std::fs::metadata(&path)
                .map(|m| m.len() == 0)
                .unwrap_or(true);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| ExtractionError::RawStoreIo(path.clone(), e))?;

            CsvWriter::new(&mut file)
                .include_header(write_header)
                .finish(&mut df)
                .map_err(|e| ExtractionError::RawStoreWrite(path.clone(), e))?;

            info!("Appended {} rows to {}", df.height(), path.display());
            Ok(())
        })
        .await?
    }
}

/// Reads a raw CSV with every column as text.
pub(crate) fn read_raw_csv(path: &Path) -> Result<Vec<RawObservation>, ExtractionError> {
    let empty = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    if empty {
        return Ok(Vec::new());
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ExtractionError::RawStoreRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| ExtractionError::RawStoreRead(path.to_path_buf(), e))?;

    for column in REQUIRED_COLUMNS {
        if df.column(column).is_err() {
            return Err(ExtractionError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    frame_to_observations(&df).map_err(|e| ExtractionError::RawStoreRead(path.to_path_buf(), e))
}

fn frame_to_observations(df: &DataFrame) -> PolarsResult<Vec<RawObservation>> {
    let mut rows = vec![RawObservation::default(); df.height()];
    for name in RAW_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let column = column.cast(&DataType::String)?;
        for (row, value) in rows.iter_mut().zip(column.str()?.into_iter()) {
            if let Some(slot) = row.column_mut(name) {
                *slot = value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }
    Ok(rows)
}

fn observations_to_frame(rows: &[RawObservation]) -> PolarsResult<DataFrame> {
    let columns = RAW_COLUMNS
        .iter()
        .map(|name| {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|r| r.column(name).map(str::to_string))
                .collect();
            Column::new((*name).into(), values)
        })
        .collect::<Vec<_>>();
    DataFrame::new(columns)
}
