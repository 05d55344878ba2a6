//! Raw daily observations as delivered by the provider, and the set of numeric
//! fields the cleaning stages operate on.

use crate::types::lenient::lenient_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric fields of a daily observation.
///
/// Every variant can carry a validity band in the configuration. All of them
/// except [`ObservationField::Altitude`] are imputed per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObservationField {
    /// Minimum temperature (°C).
    Tmin,
    /// Maximum temperature (°C).
    Tmax,
    /// Mean temperature (°C).
    Tmed,
    /// Precipitation (mm).
    Prec,
    /// Mean wind speed (m/s).
    Velmedia,
    /// Maximum wind gust (m/s).
    Racha,
    /// Mean relative humidity (%).
    HrMedia,
    /// Station altitude (m).
    Altitude,
}

impl ObservationField {
    /// Fields filled by the gap-aware imputation.
    pub const IMPUTED: [ObservationField; 7] = [
        ObservationField::Tmin,
        ObservationField::Tmax,
        ObservationField::Tmed,
        ObservationField::Prec,
        ObservationField::Velmedia,
        ObservationField::Racha,
        ObservationField::HrMedia,
    ];

    /// Column name used by the provider and by the CSV/table outputs.
    pub fn column_name(&self) -> &'static str {
        match self {
            ObservationField::Tmin => "tmin",
            ObservationField::Tmax => "tmax",
            ObservationField::Tmed => "tmed",
            ObservationField::Prec => "prec",
            ObservationField::Velmedia => "velmedia",
            ObservationField::Racha => "racha",
            ObservationField::HrMedia => "hrMedia",
            ObservationField::Altitude => "altitud",
        }
    }
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// Error returned when a configuration key does not name an [`ObservationField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown observation field '{}'", self.0)
    }
}

impl std::error::Error for UnknownField {}

/// Accepts the column name in any case, plus `hr_media` for humidity.
///
/// # Examples
///
/// ```
/// use aemet_etl::ObservationField;
///
/// assert_eq!("hrMedia".parse::<ObservationField>().unwrap(), ObservationField::HrMedia);
/// assert_eq!("TMAX".parse::<ObservationField>().unwrap(), ObservationField::Tmax);
/// assert!("snow".parse::<ObservationField>().is_err());
/// ```
impl FromStr for ObservationField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tmin" => Ok(ObservationField::Tmin),
            "tmax" => Ok(ObservationField::Tmax),
            "tmed" => Ok(ObservationField::Tmed),
            "prec" => Ok(ObservationField::Prec),
            "velmedia" => Ok(ObservationField::Velmedia),
            "racha" => Ok(ObservationField::Racha),
            "hrmedia" | "hr_media" => Ok(ObservationField::HrMedia),
            "altitud" | "altitude" => Ok(ObservationField::Altitude),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// Column order of the raw incremental CSV.
pub const RAW_COLUMNS: [&str; 14] = [
    "indicativo",
    "nombre",
    "provincia",
    "altitud",
    "fecha",
    "tmin",
    "tmax",
    "tmed",
    "prec",
    "velmedia",
    "racha",
    "hrMedia",
    "id_descarga",
    "timestamp_extraccion",
];

/// One row per (station, date) as returned by the provider, annotated with the
/// extraction batch and capture time.
///
/// Values are kept as text: type coercion belongs to the cleaning stage. The
/// serde names match the provider JSON and the raw CSV header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(rename = "indicativo", default, deserialize_with = "lenient_text")]
    pub station_code: Option<String>,
    #[serde(rename = "nombre", default, deserialize_with = "lenient_text")]
    pub station_name: Option<String>,
    #[serde(rename = "provincia", default, deserialize_with = "lenient_text")]
    pub province: Option<String>,
    #[serde(rename = "altitud", default, deserialize_with = "lenient_text")]
    pub altitude: Option<String>,
    #[serde(rename = "fecha", default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tmin: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tmax: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tmed: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub prec: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub velmedia: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub racha: Option<String>,
    #[serde(rename = "hrMedia", default, deserialize_with = "lenient_text")]
    pub hr_media: Option<String>,
    /// Identifier shared by every record of one extraction run.
    #[serde(rename = "id_descarga", default, deserialize_with = "lenient_text")]
    pub batch_id: Option<String>,
    /// When the record was captured (not when it was observed).
    #[serde(
        rename = "timestamp_extraccion",
        default,
        deserialize_with = "lenient_text"
    )]
    pub extracted_at: Option<String>,
}

impl RawObservation {
    /// Text of a raw column, addressed by its name in [`RAW_COLUMNS`].
    pub fn column(&self, name: &str) -> Option<&str> {
        let value = match name {
            "indicativo" => &self.station_code,
            "nombre" => &self.station_name,
            "provincia" => &self.province,
            "altitud" => &self.altitude,
            "fecha" => &self.date,
            "tmin" => &self.tmin,
            "tmax" => &self.tmax,
            "tmed" => &self.tmed,
            "prec" => &self.prec,
            "velmedia" => &self.velmedia,
            "racha" => &self.racha,
            "hrMedia" => &self.hr_media,
            "id_descarga" => &self.batch_id,
            "timestamp_extraccion" => &self.extracted_at,
            _ => return None,
        };
        value.as_deref()
    }

    /// Mutable slot of a raw column, addressed by its name in [`RAW_COLUMNS`].
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "indicativo" => &mut self.station_code,
            "nombre" => &mut self.station_name,
            "provincia" => &mut self.province,
            "altitud" => &mut self.altitude,
            "fecha" => &mut self.date,
            "tmin" => &mut self.tmin,
            "tmax" => &mut self.tmax,
            "tmed" => &mut self.tmed,
            "prec" => &mut self.prec,
            "velmedia" => &mut self.velmedia,
            "racha" => &mut self.racha,
            "hrMedia" => &mut self.hr_media,
            "id_descarga" => &mut self.batch_id,
            "timestamp_extraccion" => &mut self.extracted_at,
            _ => return None,
        })
    }

    /// Raw text of a numeric field.
    pub fn field(&self, field: ObservationField) -> Option<&str> {
        self.column(field.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_observation_from_provider_json() {
        let json = r#"{"fecha":"2024-03-01","indicativo":"3195","nombre":"MADRID, RETIRO",
            "provincia":"MADRID","altitud":"667","tmed":"9,4","prec":"Ip","tmin":"4,1",
            "horatmin":"06:40","tmax":"14,6","dir":"99","velmedia":"1,4","racha":"6,1",
            "hrMedia":"62"}"#;
        let obs: RawObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.station_code.as_deref(), Some("3195"));
        assert_eq!(obs.date.as_deref(), Some("2024-03-01"));
        assert_eq!(obs.field(ObservationField::Tmed), Some("9,4"));
        assert_eq!(obs.field(ObservationField::Prec), Some("Ip"));
        assert_eq!(obs.field(ObservationField::HrMedia), Some("62"));
        assert_eq!(obs.batch_id, None);
    }

    #[test]
    fn test_column_accessors_cover_raw_columns() {
        let mut obs = RawObservation::default();
        for name in RAW_COLUMNS {
            *obs.column_mut(name).unwrap() = Some(name.to_string());
        }
        for name in RAW_COLUMNS {
            assert_eq!(obs.column(name), Some(name));
        }
        assert!(obs.column("horatmin").is_none());
    }
}
