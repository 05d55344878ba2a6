//! Defines the data structures representing AEMET observing stations as listed
//! by the climatological station inventory, plus the conversion from the
//! provider's loosely typed JSON entries.

use crate::types::lenient::lenient_text;
use serde::{Deserialize, Serialize};

// --- Data Structures ---

/// A single observing station from the AEMET climatological inventory.
///
/// Stations are immutable reference data: the whole list is fetched again on
/// every extraction run and nothing is carried over between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// The unique AEMET station code, known upstream as `indicativo` (e.g. "3195").
    pub code: String,
    /// Display name of the station (e.g. "MADRID, RETIRO").
    pub name: String,
    /// Raw province label as published by the provider (e.g. "MADRID").
    pub province: Option<String>,
    /// Altitude above sea level in metres, if published.
    pub altitude: Option<f64>,
    /// Latitude in signed decimal degrees (positive for North).
    pub latitude: Option<f64>,
    /// Longitude in signed decimal degrees (positive for East).
    pub longitude: Option<f64>,
    /// SYNOP identifier, when the station is part of the synoptic network.
    pub synop_code: Option<String>,
}

/// One entry of the inventory payload, exactly as the provider sends it.
///
/// Every field is optional text because the provider mixes JSON strings and
/// numbers and omits fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct InventoryEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub indicativo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub provincia: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub altitud: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub latitud: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub longitud: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub indsinop: Option<String>,
}

impl Station {
    /// Builds a station from an inventory entry. Entries without a code are rejected.
    pub(crate) fn from_entry(entry: InventoryEntry) -> Option<Station> {
        let code = entry.indicativo?;
        Some(Station {
            name: entry.nombre.unwrap_or_default(),
            province: entry.provincia,
            altitude: entry
                .altitud
                .as_deref()
                .and_then(|a| a.replace(',', ".").parse::<f64>().ok()),
            latitude: entry.latitud.as_deref().and_then(parse_coordinate),
            longitude: entry.longitud.as_deref().and_then(parse_coordinate),
            synop_code: entry.indsinop,
            code,
        })
    }
}

/// Converts an AEMET `DDMMSS[NSEW]` (or `DDDMMSS[NSEW]`) coordinate into signed
/// decimal degrees.
///
/// Returns `None` for anything that does not follow the format or has minutes or
/// seconds outside `0..60`.
///
/// # Examples
///
/// ```
/// use aemet_etl::parse_coordinate;
///
/// let lat = parse_coordinate("402443N").unwrap();
/// assert!((lat - 40.411944).abs() < 1e-6);
/// assert!(parse_coordinate("034041W").unwrap() < 0.0);
/// ```
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let hemisphere = raw.chars().last()?;
    let sign = match hemisphere.to_ascii_uppercase() {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return None,
    };
    let digits = &raw[..raw.len() - 1];
    if digits.len() < 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (deg, rest) = digits.split_at(digits.len() - 4);
    let (min, sec) = rest.split_at(2);
    let degrees: f64 = deg.parse().ok()?;
    let minutes: f64 = min.parse().ok()?;
    let seconds: f64 = sec.parse().ok()?;
    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    Some(sign * (degrees + minutes / 60.0 + seconds / 3600.0))
}
