use crate::types::observation::ObservationField;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column order of the cleaned CSV and of the weather-facts table.
pub const CLEANED_COLUMNS: [&str; 17] = [
    "id_descarga",
    "indicativo",
    "nombre",
    "provincia",
    "codigo_provincia",
    "codigo_ca",
    "altitud",
    "fecha",
    "tmin",
    "tmax",
    "tmed",
    "prec",
    "velmedia",
    "racha",
    "hrMedia",
    "timestamp_extraccion",
    "id_limpieza",
];

/// A typed daily observation shared by the cleaning and loading stages.
///
/// Once the cleaning run has finished there is exactly one record per
/// (`date`, `station_code`), `tmed` is always present and `prec` is never
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    /// Strictly increasing identifier assigned by the cleaning run (`id_limpieza`).
    pub cleaning_id: i64,
    /// Extraction batch the record came from (`id_descarga`).
    pub batch_id: Option<String>,
    pub station_code: String,
    pub station_name: Option<String>,
    /// Canonical province name, or the raw label when it could not be mapped.
    pub province: Option<String>,
    /// INE province code (1..=52).
    pub province_code: Option<i32>,
    /// INE autonomous community code (1..=19).
    pub region_code: Option<i32>,
    pub altitude: Option<f64>,
    pub date: NaiveDate,
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
    pub tmed: Option<f64>,
    pub prec: Option<f64>,
    pub velmedia: Option<f64>,
    pub racha: Option<f64>,
    pub hr_media: Option<f64>,
    pub extracted_at: Option<NaiveDateTime>,
}

impl CleanedRecord {
    /// A record for `station_code` on `date` with every optional value missing.
    pub fn empty(station_code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            cleaning_id: 0,
            batch_id: None,
            station_code: station_code.into(),
            station_name: None,
            province: None,
            province_code: None,
            region_code: None,
            altitude: None,
            date,
            tmin: None,
            tmax: None,
            tmed: None,
            prec: None,
            velmedia: None,
            racha: None,
            hr_media: None,
            extracted_at: None,
        }
    }

    pub fn value(&self, field: ObservationField) -> Option<f64> {
        match field {
            ObservationField::Tmin => self.tmin,
            ObservationField::Tmax => self.tmax,
            ObservationField::Tmed => self.tmed,
            ObservationField::Prec => self.prec,
            ObservationField::Velmedia => self.velmedia,
            ObservationField::Racha => self.racha,
            ObservationField::HrMedia => self.hr_media,
            ObservationField::Altitude => self.altitude,
        }
    }

    pub fn value_mut(&mut self, field: ObservationField) -> &mut Option<f64> {
        match field {
            ObservationField::Tmin => &mut self.tmin,
            ObservationField::Tmax => &mut self.tmax,
            ObservationField::Tmed => &mut self.tmed,
            ObservationField::Prec => &mut self.prec,
            ObservationField::Velmedia => &mut self.velmedia,
            ObservationField::Racha => &mut self.racha,
            ObservationField::HrMedia => &mut self.hr_media,
            ObservationField::Altitude => &mut self.altitude,
        }
    }

    /// Dedup key of the cleaned output.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.station_code.as_str())
    }
}
