use crate::cleaning::coerce::{coerce, Rejection};
use crate::cleaning::imputation::{impute_station, DEFAULT_GAP_THRESHOLD};
use crate::cleaning::regions::ProvinceMap;
use crate::cleaning::thresholds::{enforce_temperature_order, Thresholds};
use crate::types::cleaned::CleanedRecord;
use crate::types::observation::{ObservationField, RawObservation};
use bon::bon;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What happened to the rows of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub rejected_missing_code: usize,
    pub rejected_invalid_date: usize,
    pub unmapped_provinces: BTreeSet<String>,
    pub values_out_of_range: usize,
    pub inconsistent_temperatures: usize,
    pub values_imputed: usize,
    pub dropped_without_tmed: usize,
    pub duplicates_removed: usize,
    pub output_rows: usize,
}

/// Turns a raw batch into deduplicated, imputed records.
///
/// Stages run in order: type coercion, region mapping, threshold filtering,
/// temperature consistency, per-station imputation and finalization.
#[derive(Debug, Clone)]
pub struct Cleaner {
    province_map: ProvinceMap,
    thresholds: Thresholds,
    gap_threshold: usize,
}

#[bon]
impl Cleaner {
    #[builder]
    pub fn new(
        province_map: Option<ProvinceMap>,
        thresholds: Option<Thresholds>,
        gap_threshold: Option<usize>,
    ) -> Self {
        Self {
            province_map: province_map.unwrap_or_default(),
            thresholds: thresholds.unwrap_or_default(),
            gap_threshold: gap_threshold.unwrap_or(DEFAULT_GAP_THRESHOLD),
        }
    }

    pub fn clean(&self, raw: &[RawObservation]) -> (Vec<CleanedRecord>, CleaningReport) {
        let mut report = CleaningReport {
            input_rows: raw.len(),
            ..CleaningReport::default()
        };
        if raw.is_empty() {
            warn!("No data to clean");
            return (Vec::new(), report);
        }

        // --- Type coercion ---
        let mut records = Vec::with_capacity(raw.len());
        for row in raw {
            match coerce(row) {
                Ok(record) => records.push(record),
                Err(Rejection::MissingStationCode) => report.rejected_missing_code += 1,
                Err(Rejection::InvalidDate) => report.rejected_invalid_date += 1,
            }
        }
        if report.rejected_missing_code + report.rejected_invalid_date > 0 {
            warn!(
                "Dropped {} rows without a station code and {} rows with an invalid date",
                report.rejected_missing_code, report.rejected_invalid_date
            );
        }

        // --- Region mapping ---
        report.unmapped_provinces = self.province_map.apply_all(&mut records);
        if !report.unmapped_provinces.is_empty() {
            warn!("Unmapped provinces: {:?}", report.unmapped_provinces);
        }

        // --- Thresholds and consistency ---
        for record in &mut records {
            report.values_out_of_range += self.thresholds.apply(record);
            if enforce_temperature_order(record) {
                report.inconsistent_temperatures += 1;
            }
        }
        debug!(
            "Nulled {} out-of-range values and {} inconsistent temperature triples",
            report.values_out_of_range, report.inconsistent_temperatures
        );

        // --- Imputation per station ---
        let mut by_station: BTreeMap<String, Vec<CleanedRecord>> = BTreeMap::new();
        for record in records {
            by_station
                .entry(record.station_code.clone())
                .or_default()
                .push(record);
        }
        let mut imputed = Vec::new();
        for (_, mut station_records) in by_station {
            // Stable: duplicates of one date stay in arrival order.
            station_records.sort_by_key(|r| r.date);
            report.values_imputed += impute_station(
                &mut station_records,
                &ObservationField::IMPUTED,
                self.gap_threshold,
            );
            imputed.extend(station_records);
        }

        // --- Finalization ---
        let before_drop = imputed.len();
        imputed.retain(|r| r.tmed.is_some());
        report.dropped_without_tmed = before_drop - imputed.len();

        for (i, record) in imputed.iter_mut().enumerate() {
            if record.prec.is_none() {
                record.prec = Some(0.0);
            }
            record.cleaning_id = i as i64 + 1;
        }

        let cleaned = dedup_keep_last(imputed);
        report.duplicates_removed = before_drop - report.dropped_without_tmed - cleaned.len();
        report.output_rows = cleaned.len();

        info!(
            "Cleaned {} raw rows into {} records ({} imputed values, {} duplicates removed)",
            report.input_rows, report.output_rows, report.values_imputed, report.duplicates_removed
        );
        (cleaned, report)
    }
}

/// Keeps the last record of every (date, station) key, preserving order.
pub fn dedup_keep_last(records: Vec<CleanedRecord>) -> Vec<CleanedRecord> {
    let mut last = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last.insert(record.key(), i);
    }
    let keep: Vec<bool> = records
        .iter()
        .enumerate()
        .map(|(i, r)| last.get(&r.key()) == Some(&i))
        .collect();
    drop(last);

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(r, keep)| keep.then_some(r))
        .collect()
}
