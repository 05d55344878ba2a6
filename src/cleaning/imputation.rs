//! Gap-aware imputation over a single station's date-ordered series.
//!
//! Short runs of missing values (length <= gap threshold) take the station's
//! median for the field. Longer runs are filled by linear interpolation over
//! position, holding the nearest observed value at the series edges. A series
//! with no observed value at all stays missing.

use crate::types::cleaned::CleanedRecord;
use crate::types::observation::ObservationField;
use std::ops::Range;

pub const DEFAULT_GAP_THRESHOLD: usize = 3;

/// Median of the given values, `None` when empty.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Maximal runs of consecutive missing values.
pub fn missing_runs(series: &[Option<f64>]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, value) in series.iter().enumerate() {
        match (value.is_none(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..series.len());
    }
    runs
}

/// Fills `series` in place and returns how many values were filled.
pub fn fill_series(series: &mut [Option<f64>], gap_threshold: usize) -> usize {
    let Some(med) = median(series.iter().flatten().copied()) else {
        return 0;
    };
    let runs = missing_runs(series);
    let mut filled = 0;

    for run in runs.iter().filter(|r| r.len() <= gap_threshold) {
        series[run.clone()].fill(Some(med));
        filled += run.len();
    }

    for run in runs.into_iter().filter(|r| r.len() > gap_threshold) {
        let before = run.start.checked_sub(1).and_then(|i| series[i].map(|v| (i, v)));
        let after = series.get(run.end).copied().flatten().map(|v| (run.end, v));
        for i in run {
            let value = match (before, after) {
                (Some((i0, v0)), Some((i1, v1))) => {
                    v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                }
                (Some((_, v)), None) | (None, Some((_, v))) => v,
                (None, None) => med,
            };
            series[i] = Some(value);
            filled += 1;
        }
    }
    filled
}

/// Imputes `fields` across one station's records, which must be sorted by date.
/// Only the given records are touched; no dates are added.
pub fn impute_station(
    records: &mut [CleanedRecord],
    fields: &[ObservationField],
    gap_threshold: usize,
) -> usize {
    let mut filled = 0;
    for &field in fields {
        let mut series: Vec<Option<f64>> = records.iter().map(|r| r.value(field)).collect();
        filled += fill_series(&mut series, gap_threshold);
        for (record, value) in records.iter_mut().zip(series) {
            *record.value_mut(field) = value;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_median() {
        assert_eq!(median([10.0, 13.0, 14.0]), Some(13.0));
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_missing_runs() {
        let s = [None, Some(1.0), None, None, Some(2.0), None];
        assert_eq!(missing_runs(&s), vec![0..1, 2..4, 5..6]);
        assert!(missing_runs(&[Some(1.0)]).is_empty());
    }

    #[test]
    fn test_short_gap_takes_median() {
        let mut s = [Some(10.0), None, None, Some(13.0), Some(14.0)];
        assert_eq!(fill_series(&mut s, 3), 2);
        assert_eq!(s, [Some(10.0), Some(13.0), Some(13.0), Some(13.0), Some(14.0)]);
    }

    #[test]
    fn test_long_gap_is_interpolated_within_anchors() {
        let mut s = [Some(0.0), None, None, None, None, Some(10.0), Some(100.0)];
        assert_eq!(fill_series(&mut s, 3), 4);
        let filled: Vec<f64> = s.iter().flatten().copied().collect();
        assert_eq!(&filled[..6], &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        for v in &filled[1..5] {
            assert!((0.0..=10.0).contains(v));
        }
    }

    #[test]
    fn test_long_edge_gaps_hold_nearest_value() {
        let mut s = [None, None, Some(5.0), Some(7.0), None, None];
        fill_series(&mut s, 1);
        assert_eq!(s, [Some(5.0), Some(5.0), Some(5.0), Some(7.0), Some(7.0), Some(7.0)]);
    }

    #[test]
    fn test_mixed_runs() {
        // short run of 1 gets the median (5), long run of 4 is interpolated 0 -> 10
        let mut s = [Some(0.0), None, None, None, None, Some(10.0), None, Some(5.0)];
        fill_series(&mut s, 3);
        assert_eq!(s[6], Some(5.0));
        assert_eq!(s[1], Some(2.0));
        assert_eq!(s[4], Some(8.0));
    }

    #[test]
    fn test_all_missing_stays_missing() {
        let mut s = [None, None, None];
        assert_eq!(fill_series(&mut s, 3), 0);
        assert!(s.iter().all(Option::is_none));
    }

    #[test]
    fn test_impute_station_only_touches_missing_fields() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tmed = [Some(10.0), None, None, Some(13.0), Some(14.0)];
        let mut records: Vec<CleanedRecord> = tmed
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut r = CleanedRecord::empty("1234X", start + Duration::days(i as i64));
                r.tmed = *v;
                r.altitude = Some(100.0);
                r
            })
            .collect();

        let filled = impute_station(&mut records, &ObservationField::IMPUTED, 3);
        assert_eq!(filled, 2);
        assert_eq!(records[1].tmed, Some(13.0));
        assert_eq!(records[2].tmed, Some(13.0));
        // Fields with no observation anywhere are left alone
        assert!(records.iter().all(|r| r.tmax.is_none()));
        assert_eq!(records[0].date, start);
    }
}
