use crate::extraction::api::{daily_endpoint, OpenDataApi};
use crate::extraction::error::FetchError;
use crate::extraction::planner::DateWindow;
use crate::extraction::retry::RetryPolicy;
use crate::types::observation::RawObservation;
use crate::types::station::Station;
use chrono::Utc;
use log::{debug, info, warn};

pub const EXTRACTION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of downloading every planned window of one station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationDownload {
    pub rows: Vec<RawObservation>,
    pub windows_requested: usize,
    /// Windows answered with "no data"; not failures.
    pub empty_windows: usize,
    /// Windows whose fetch still failed after retries; their data is missing.
    pub failed_windows: Vec<DateWindow>,
}

/// Fetches daily observations for one station, window by window.
pub struct StationDownloader<'a, A: OpenDataApi> {
    api: &'a A,
    retry: &'a RetryPolicy,
}

impl<'a, A: OpenDataApi> StationDownloader<'a, A> {
    pub fn new(api: &'a A, retry: &'a RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Runs the two-step fetch for one window, retrying transient failures, and
    /// annotates every row with the station name, `batch_id` and capture time.
    pub async fn download_window(
        &self,
        station: &Station,
        window: &DateWindow,
        batch_id: &str,
    ) -> Result<Vec<RawObservation>, FetchError> {
        let endpoint = daily_endpoint(&station.code, window);
        let operation = format!("daily values {} {}", station.code, window);
        let api = self.api;

        let mut rows = self
            .retry
            .run(&operation, || {
                let endpoint = endpoint.as_str();
                async move {
                    let body = api.fetch_dataset(endpoint).await?;
                    serde_json::from_str::<Vec<RawObservation>>(&body).map_err(|e| {
                        FetchError::MalformedPayload {
                            url: endpoint.to_string(),
                            message: e.to_string(),
                        }
                    })
                }
            })
            .await?;

        let extracted_at = Utc::now().format(EXTRACTION_TIMESTAMP_FORMAT).to_string();
        for row in &mut rows {
            if row.station_code.is_none() {
                row.station_code = Some(station.code.clone());
            }
            row.station_name = Some(station.name.clone());
            row.batch_id = Some(batch_id.to_string());
            row.extracted_at = Some(extracted_at.clone());
        }
        Ok(rows)
    }

    /// Downloads every window in order. A failing window is logged and
    /// skipped; it never aborts the station or the run.
    pub async fn download(
        &self,
        station: &Station,
        windows: &[DateWindow],
        batch_id: &str,
    ) -> StationDownload {
        let mut result = StationDownload {
            windows_requested: windows.len(),
            ..StationDownload::default()
        };

        for window in windows {
            match self.download_window(station, window, batch_id).await {
                Ok(rows) => {
                    debug!("Station {} window {}: {} rows", station.code, window, rows.len());
                    result.rows.extend(rows);
                }
                Err(FetchError::NoData(_)) => {
                    info!("Station {} has no data for {}", station.code, window);
                    result.empty_windows += 1;
                }
                Err(e) => {
                    warn!(
                        "Skipping window {} of station {} after failed fetch: {}",
                        window, station.code, e
                    );
                    result.failed_windows.push(*window);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::api::fake::FakeApi;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;

    fn station(code: &str) -> Station {
        Station {
            code: code.to_string(),
            name: format!("STATION {code}"),
            province: Some("MADRID".to_string()),
            altitude: None,
            latitude: None,
            longitude: None,
            synop_code: None,
        }
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
    }

    fn rows() -> Vec<serde_json::Value> {
        vec![
            json!({"fecha": "2024-01-01", "indicativo": "3195", "tmed": "9,4", "prec": "0,0"}),
            json!({"fecha": "2024-01-02", "indicativo": "3195", "tmed": "8,1", "prec": "Ip"}),
            json!({"fecha": "2024-02-15", "indicativo": "3195", "tmed": "11,0"}),
        ]
    }

    #[tokio::test]
    async fn test_download_annotates_rows() -> Result<(), FetchError> {
        let api = FakeApi::default().with_rows("3195", rows());
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let downloader = StationDownloader::new(&api, &policy);

        let rows = downloader
            .download_window(&station("3195"), &window("2024-01-01", "2024-01-31"), "batch-1")
            .await?;

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.station_name.as_deref(), Some("STATION 3195"));
            assert_eq!(row.batch_id.as_deref(), Some("batch-1"));
            assert!(row.extracted_at.is_some());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let api = FakeApi::default().with_rows("3195", rows()).failing("3195", 2);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let downloader = StationDownloader::new(&api, &policy);

        let result = downloader
            .download(&station("3195"), &[window("2024-01-01", "2024-03-01")], "b")
            .await;

        assert_eq!(result.rows.len(), 3);
        assert!(result.failed_windows.is_empty());
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_window_is_skipped_not_fatal() {
        let api = FakeApi::default().with_rows("3195", rows()).failing("3195", 3);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let downloader = StationDownloader::new(&api, &policy);

        let windows = [window("2024-01-01", "2024-01-31"), window("2024-02-01", "2024-02-29")];
        let result = downloader.download(&station("3195"), &windows, "b").await;

        // First window burns all three failures, second succeeds.
        assert_eq!(result.windows_requested, 2);
        assert_eq!(result.failed_windows, vec![windows[0]]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].date.as_deref(), Some("2024-02-15"));
    }

    #[tokio::test]
    async fn test_no_data_window_is_empty() {
        let api = FakeApi::default().with_rows("3195", rows());
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let downloader = StationDownloader::new(&api, &policy);

        let result = downloader
            .download(&station("3195"), &[window("2023-01-01", "2023-06-30")], "b")
            .await;

        assert!(result.rows.is_empty());
        assert_eq!(result.empty_windows, 1);
        assert!(result.failed_windows.is_empty());
        // "No data" is final, not retried
        assert_eq!(api.call_count(), 1);
    }
}
