//! The cleaned CSV: rewritten in full by every cleaning run, and readable
//! again for loading without re-cleaning.

use crate::cleaning::coerce::{parse_date, parse_decimal, parse_timestamp, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::cleaning::error::CleaningError;
use crate::types::cleaned::{CleanedRecord, CLEANED_COLUMNS};
use crate::types::observation::ObservationField;
use log::{info, warn};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tokio::task;

const REQUIRED_COLUMNS: [&str; 2] = ["indicativo", "fecha"];

pub async fn write_cleaned_csv(path: &Path, records: &[CleanedRecord]) -> Result<(), CleaningError> {
    let path_buf = path.to_path_buf();
    let mut df = records_to_frame(records).map_err(|e| CleaningError::CleanedWrite(path_buf.clone(), e))?;
    crate::utils::ensure_parent_exists(path)
        .await
        .map_err(|e| CleaningError::CleanedIo(path_buf.clone(), e))?;

    task::spawn_blocking(move || {
        let mut file =
            File::create(&path_buf).map_err(|e| CleaningError::CleanedIo(path_buf.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| CleaningError::CleanedWrite(path_buf.clone(), e))?;
        info!("Cleaned CSV saved to {} ({} rows)", path_buf.display(), df.height());
        Ok(())
    })
    .await?
}

pub async fn read_cleaned_csv(path: &Path) -> Result<Vec<CleanedRecord>, CleaningError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || read_cleaned_blocking(&path_buf)).await?
}

fn read_cleaned_blocking(path: &Path) -> Result<Vec<CleanedRecord>, CleaningError> {
    let read_err = |e: PolarsError| CleaningError::CleanedRead(path.to_path_buf(), e);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(read_err)?
        .finish()
        .map_err(read_err)?;

    let mut columns: HashMap<&str, Vec<Option<String>>> = HashMap::new();
    for name in CLEANED_COLUMNS {
        match df.column(name) {
            Ok(column) => {
                columns.insert(name, text_values(column).map_err(read_err)?);
            }
            Err(_) if REQUIRED_COLUMNS.contains(&name) => {
                return Err(CleaningError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                });
            }
            Err(_) => {}
        }
    }

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0;
    for row in 0..df.height() {
        let (Some(code), Some(date)) = (
            cell(&columns, "indicativo", row),
            cell(&columns, "fecha", row).and_then(parse_date),
        ) else {
            skipped += 1;
            continue;
        };
        let mut record = CleanedRecord::empty(code, date);
        record.cleaning_id = cell(&columns, "id_limpieza", row)
            .and_then(|v| v.parse().ok())
            .unwrap_or(row as i64 + 1);
        record.batch_id = cell(&columns, "id_descarga", row).map(str::to_string);
        record.station_name = cell(&columns, "nombre", row).map(str::to_string);
        record.province = cell(&columns, "provincia", row).map(str::to_string);
        record.province_code = cell(&columns, "codigo_provincia", row).and_then(|v| v.parse().ok());
        record.region_code = cell(&columns, "codigo_ca", row).and_then(|v| v.parse().ok());
        record.extracted_at = cell(&columns, "timestamp_extraccion", row).and_then(parse_timestamp);
        for field in ObservationField::IMPUTED
            .into_iter()
            .chain([ObservationField::Altitude])
        {
            *record.value_mut(field) = cell(&columns, field.column_name(), row).and_then(parse_decimal);
        }
        records.push(record);
    }
    if skipped > 0 {
        warn!("Skipped {} cleaned rows without station code or date", skipped);
    }
    Ok(records)
}

fn text_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let column = column.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string))
        .collect();
    Ok(values)
}

fn cell<'a>(columns: &'a HashMap<&str, Vec<Option<String>>>, name: &str, row: usize) -> Option<&'a str> {
    columns.get(name).and_then(|values| values.get(row)).and_then(|v| v.as_deref())
}

fn text_column(records: &[CleanedRecord], f: impl Fn(&CleanedRecord) -> Option<String>) -> Vec<Option<String>> {
    records.iter().map(f).collect()
}

fn records_to_frame(records: &[CleanedRecord]) -> PolarsResult<DataFrame> {
    let mut columns = Vec::with_capacity(CLEANED_COLUMNS.len());
    for name in CLEANED_COLUMNS {
        let column = match name {
            "id_descarga" => Column::new(name.into(), text_column(records, |r| r.batch_id.clone())),
            "indicativo" => Column::new(name.into(), text_column(records, |r| Some(r.station_code.clone()))),
            "nombre" => Column::new(name.into(), text_column(records, |r| r.station_name.clone())),
            "provincia" => Column::new(name.into(), text_column(records, |r| r.province.clone())),
            "codigo_provincia" => Column::new(
                name.into(),
                records.iter().map(|r| r.province_code).collect::<Vec<_>>(),
            ),
            "codigo_ca" => Column::new(
                name.into(),
                records.iter().map(|r| r.region_code).collect::<Vec<_>>(),
            ),
            "fecha" => Column::new(
                name.into(),
                text_column(records, |r| Some(r.date.format(DATE_FORMAT).to_string())),
            ),
            "timestamp_extraccion" => Column::new(
                name.into(),
                text_column(records, |r| {
                    r.extracted_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                }),
            ),
            "id_limpieza" => Column::new(
                name.into(),
                records.iter().map(|r| r.cleaning_id).collect::<Vec<_>>(),
            ),
            other => match other.parse::<ObservationField>() {
                Ok(field) => Column::new(
                    name.into(),
                    records.iter().map(|r| r.value(field)).collect::<Vec<_>>(),
                ),
                Err(_) => Column::new(name.into(), vec![None::<String>; records.len()]),
            },
        };
        columns.push(column);
    }
    DataFrame::new(columns)
}
