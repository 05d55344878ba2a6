use crate::extraction::api::OpenDataApi;
use crate::extraction::downloader::StationDownloader;
use crate::extraction::error::ExtractionError;
use crate::extraction::planner::{WindowPlan, WindowPlanner};
use crate::extraction::raw_store::RawStore;
use crate::extraction::retry::RetryPolicy;
use crate::stations::inventory::fetch_inventory;
use crate::types::observation::RawObservation;
use bon::bon;
use chrono::NaiveDate;
use log::{debug, info, warn};
use uuid::Uuid;

/// Counters of one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub stations: usize,
    pub stations_skipped: usize,
    pub windows_requested: usize,
    pub windows_empty: usize,
    pub windows_failed: usize,
    pub rows: usize,
}

/// New rows of one extraction run, all tagged with `run_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub run_id: String,
    pub rows: Vec<RawObservation>,
    pub summary: ExtractionSummary,
}

impl ExtractionOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Coordinates inventory, planner and downloader across every station, then
/// appends the new batch to the raw store.
pub struct Extractor<A: OpenDataApi> {
    api: A,
    planner: WindowPlanner,
    retry: RetryPolicy,
    raw_store: RawStore,
}

#[bon]
impl<A: OpenDataApi> Extractor<A> {
    #[builder]
    pub fn new(
        api: A,
        raw_store: RawStore,
        planner: Option<WindowPlanner>,
        retry: Option<RetryPolicy>,
    ) -> Self {
        Self {
            api,
            planner: planner.unwrap_or_default(),
            retry: retry.unwrap_or_default(),
            raw_store,
        }
    }

    pub fn raw_store(&self) -> &RawStore {
        &self.raw_store
    }

    /// Runs one incremental extraction up to `today`.
    ///
    /// Stations are processed one at a time. When no station yields rows the
    /// outcome is empty and the raw store is left untouched.
    pub async fn run(&self, today: NaiveDate) -> Result<ExtractionOutcome, ExtractionError> {
        let stations = fetch_inventory(&self.api, &self.retry).await?;
        let watermarks = self.raw_store.watermarks().await?;
        let run_id = Uuid::new_v4().to_string();
        let downloader = StationDownloader::new(&self.api, &self.retry);

        let mut summary = ExtractionSummary {
            stations: stations.len(),
            ..ExtractionSummary::default()
        };
        let mut rows = Vec::new();

        for station in &stations {
            let plan = self.planner.plan(today, watermarks.get(&station.code).copied());
            let windows = match plan {
                WindowPlan::UpToDate => {
                    debug!("Station {} is up to date, skipping", station.code);
                    summary.stations_skipped += 1;
                    continue;
                }
                WindowPlan::Windows(windows) => windows,
            };

            let download = downloader.download(station, &windows, &run_id).await;
            summary.windows_requested += download.windows_requested;
            summary.windows_empty += download.empty_windows;
            summary.windows_failed += download.failed_windows.len();
            rows.extend(download.rows);
        }

        summary.rows = rows.len();
        if summary.windows_failed > 0 {
            warn!(
                "{} of {} windows could not be fetched and are missing from this run",
                summary.windows_failed, summary.windows_requested
            );
        }

        if rows.is_empty() {
            info!("No new data: {} stations checked, nothing to append", summary.stations);
        } else {
            self.raw_store.append(&rows).await?;
            info!(
                "Extraction run {} collected {} rows from {} stations ({} up to date)",
                run_id,
                rows.len(),
                summary.stations - summary.stations_skipped,
                summary.stations_skipped
            );
        }

        Ok(ExtractionOutcome {
            run_id,
            rows,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::api::fake::FakeApi;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn api() -> FakeApi {
        FakeApi::default()
            .with_inventory(vec![
                json!({"indicativo": "3195", "nombre": "MADRID, RETIRO", "provincia": "MADRID"}),
                json!({"indicativo": "B013X", "nombre": "ESCORCA, LLUC", "provincia": "ILLES BALEARS"}),
            ])
            .with_rows(
                "3195",
                vec![
                    json!({"fecha": "2024-01-08", "indicativo": "3195", "tmed": "9,4"}),
                    json!({"fecha": "2024-01-09", "indicativo": "3195", "tmed": "8,0"}),
                    json!({"fecha": "2024-01-10", "indicativo": "3195", "tmed": "7,5"}),
                ],
            )
            .with_rows(
                "B013X",
                vec![json!({"fecha": "2024-01-10", "indicativo": "B013X", "tmed": "12,0"})],
            )
    }

    fn extractor(api: FakeApi, path: PathBuf) -> Extractor<FakeApi> {
        Extractor::builder()
            .api(api)
            .raw_store(RawStore::new(path))
            .planner(WindowPlanner::new(5, 3))
            .retry(RetryPolicy::fixed(2, Duration::from_millis(1)))
            .build()
    }

    #[tokio::test]
    async fn test_cold_start_collects_all_stations() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let extractor = extractor(api(), dir.path().join("raw.csv"));

        let outcome = extractor.run(today()).await?;
        assert_eq!(outcome.rows.len(), 4);
        assert!(outcome
            .rows
            .iter()
            .all(|r| r.batch_id.as_deref() == Some(outcome.run_id.as_str())));
        assert_eq!(outcome.summary.stations, 2);
        assert_eq!(outcome.summary.stations_skipped, 0);
        // lookback 5 days in windows of 3 -> 2 windows per station
        assert_eq!(outcome.summary.windows_requested, 4);
        assert_eq!(extractor.raw_store().read_all().await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_without_new_data_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        extractor(api(), path.clone()).run(today()).await?;
        let before = std::fs::read(&path)?;

        let second = extractor(api(), path.clone());
        let outcome = second.run(today()).await?;
        assert!(outcome.is_empty());
        assert_eq!(outcome.summary.stations_skipped, 2);
        assert_eq!(std::fs::read(&path)?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_warm_start_requests_single_window() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        let store = RawStore::new(&path);
        store
            .append(&[RawObservation {
                station_code: Some("3195".to_string()),
                date: Some("2024-01-08".to_string()),
                ..RawObservation::default()
            }])
            .await?;

        let api = api();
        let outcome = extractor(api, path).run(today()).await?;
        let from_3195: Vec<_> = outcome
            .rows
            .iter()
            .filter(|r| r.station_code.as_deref() == Some("3195"))
            .filter_map(|r| r.date.clone())
            .collect();
        assert_eq!(from_3195, vec!["2024-01-09", "2024-01-10"]);
        // 1 warm window for 3195, 2 cold windows for B013X
        assert_eq!(outcome.summary.windows_requested, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_station_does_not_abort_run() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let extractor = extractor(api().failing("3195", 100), dir.path().join("raw.csv"));

        let outcome = extractor.run(today()).await?;
        assert_eq!(outcome.summary.windows_failed, 2);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].station_code.as_deref(), Some("B013X"));
        Ok(())
    }

    #[tokio::test]
    async fn test_inventory_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(FakeApi::default(), dir.path().join("raw.csv"));
        let err = extractor.run(today()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Inventory(_)));
    }
}
