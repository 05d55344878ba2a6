use aemet_etl::{impute_station, CleanedRecord, ObservationField, DEFAULT_GAP_THRESHOLD};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Two years of one station with a missing value every 7th day and a
/// 10-day outage every 90 days.
fn station_series() -> Vec<CleanedRecord> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    (0..730)
        .map(|i| {
            let mut r = CleanedRecord::empty("3195", start + Duration::days(i));
            let value = 15.0 + 10.0 * ((i as f64) / 58.0).sin();
            let missing = i % 7 == 3 || i % 90 < 10;
            for field in ObservationField::IMPUTED {
                *r.value_mut(field) = if missing { None } else { Some(value) };
            }
            r
        })
        .collect()
}

fn bench_imputation(c: &mut Criterion) {
    let series = station_series();
    c.bench_function("impute_station_730_days", |b| {
        b.iter(|| {
            let mut records = series.clone();
            impute_station(
                black_box(&mut records),
                &ObservationField::IMPUTED,
                DEFAULT_GAP_THRESHOLD,
            )
        })
    });
}

criterion_group!(benches, bench_imputation);
criterion_main!(benches);
