//! Text-to-typed conversion of raw observations.

use crate::types::cleaned::CleanedRecord;
use crate::types::observation::{ObservationField, RawObservation};
use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a decimal number written with either a comma or a dot.
/// Anything else (including the provider's "Ip" trace marker) is missing.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Why a raw row could not become a record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingStationCode,
    InvalidDate,
}

/// Converts a raw row into a typed record. Province codes are left empty.
pub fn coerce(raw: &RawObservation) -> Result<CleanedRecord, Rejection> {
    let code = raw
        .station_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(Rejection::MissingStationCode)?;
    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or(Rejection::InvalidDate)?;

    let mut record = CleanedRecord::empty(code, date);
    record.batch_id = raw.batch_id.clone();
    record.station_name = raw.station_name.clone();
    record.province = raw.province.clone();
    record.extracted_at = raw.extracted_at.as_deref().and_then(parse_timestamp);
    for field in ObservationField::IMPUTED
        .into_iter()
        .chain([ObservationField::Altitude])
    {
        *record.value_mut(field) = raw.field(field).and_then(parse_decimal);
    }
    Ok(record)
}
