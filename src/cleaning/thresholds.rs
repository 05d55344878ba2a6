use crate::config::{Bounds, ConfigError};
use crate::types::cleaned::CleanedRecord;
use crate::types::observation::ObservationField;
use std::collections::{BTreeMap, HashMap};

/// Per-field validity bands. Values outside their band are nulled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    bands: BTreeMap<ObservationField, Bounds>,
}

impl Thresholds {
    /// Resolves configuration keys to fields. Unknown field names and
    /// inverted bands are rejected.
    pub fn from_config(bands: &HashMap<String, Bounds>) -> Result<Self, ConfigError> {
        let mut resolved = BTreeMap::new();
        for (name, bounds) in bands {
            let field: ObservationField = name.parse()?;
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(ConfigError::InvalidBounds {
                        field: name.clone(),
                        min,
                        max,
                    });
                }
            }
            resolved.insert(field, *bounds);
        }
        Ok(Self { bands: resolved })
    }

    pub fn with_band(mut self, field: ObservationField, min: Option<f64>, max: Option<f64>) -> Self {
        self.bands.insert(field, Bounds { min, max });
        self
    }

    pub fn band(&self, field: ObservationField) -> Option<&Bounds> {
        self.bands.get(&field)
    }

    /// Nulls out-of-band values of `record`, returning how many were nulled.
    pub fn apply(&self, record: &mut CleanedRecord) -> usize {
        let mut nulled = 0;
        for (field, bounds) in &self.bands {
            let slot = record.value_mut(*field);
            let Some(value) = *slot else {
                continue;
            };
            let below = bounds.min.is_some_and(|min| value < min);
            let above = bounds.max.is_some_and(|max| value > max);
            if below || above {
                *slot = None;
                nulled += 1;
            }
        }
        nulled
    }
}

/// Nulls the whole temperature triple when `tmin > tmax`. Returns whether it did.
pub fn enforce_temperature_order(record: &mut CleanedRecord) -> bool {
    match (record.tmin, record.tmax) {
        (Some(tmin), Some(tmax)) if tmin > tmax => {
            record.tmin = None;
            record.tmax = None;
            record.tmed = None;
            true
        }
        _ => false,
    }
}
