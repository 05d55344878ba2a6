use crate::cleaning::error::CleaningError;
use crate::types::cleaned::CleanedRecord;
use crate::types::province::{fold_label, province_by_code, Province, PROVINCES, PROVINCE_ALIASES};
use std::collections::{BTreeSet, HashMap};

/// Maps raw province labels to provinces. Labels are folded before lookup.
#[derive(Debug, Clone)]
pub struct ProvinceMap {
    by_label: HashMap<String, &'static Province>,
}

impl Default for ProvinceMap {
    fn default() -> Self {
        let mut by_label = HashMap::new();
        for province in PROVINCES.iter() {
            by_label.insert(fold_label(province.name), province);
            // Bilingual names are also known by each half.
            for part in province.name.split('/') {
                by_label.insert(fold_label(part), province);
            }
        }
        for (alias, code) in PROVINCE_ALIASES {
            if let Some(province) = province_by_code(code) {
                by_label.insert(alias.to_string(), province);
            }
        }
        Self { by_label }
    }
}

impl ProvinceMap {
    /// The built-in table extended with `extra_aliases` (raw label to any label
    /// the table already knows). An alias to an unknown province is an error.
    pub fn with_aliases(extra_aliases: &HashMap<String, String>) -> Result<Self, CleaningError> {
        let mut map = Self::default();
        for (alias, target) in extra_aliases {
            let province = map
                .lookup(target)
                .ok_or_else(|| CleaningError::RegionMapping {
                    alias: alias.clone(),
                    target: target.clone(),
                })?;
            map.by_label.insert(fold_label(alias), province);
        }
        Ok(map)
    }

    pub fn lookup(&self, label: &str) -> Option<&'static Province> {
        self.by_label.get(&fold_label(label)).copied()
    }

    /// Replaces the record's province label with the canonical name and sets
    /// both codes. Returns `false` (record untouched) for unknown labels.
    pub fn apply(&self, record: &mut CleanedRecord) -> bool {
        let Some(province) = record.province.as_deref().and_then(|l| self.lookup(l)) else {
            return false;
        };
        record.province = Some(province.name.to_string());
        record.province_code = Some(province.code);
        record.region_code = Some(province.region_code);
        true
    }

    /// Maps every record and returns the distinct labels that could not be mapped.
    pub fn apply_all(&self, records: &mut [CleanedRecord]) -> BTreeSet<String> {
        let mut unmapped = BTreeSet::new();
        for record in records.iter_mut() {
            if !self.apply(record) {
                unmapped.insert(record.province.clone().unwrap_or_else(|| "<missing>".to_string()));
            }
        }
        unmapped
    }
}
