use crate::cleaning::audit::{read_cleaned_csv, write_cleaned_csv};
use crate::cleaning::engine::{Cleaner, CleaningReport};
use crate::cleaning::regions::ProvinceMap;
use crate::cleaning::thresholds::Thresholds;
use crate::config::EtlConfig;
use crate::error::EtlError;
use crate::extraction::api::{AemetClient, OpenDataApi};
use crate::extraction::error::ExtractionError;
use crate::extraction::orchestrator::{ExtractionOutcome, ExtractionSummary, Extractor};
use crate::extraction::planner::WindowPlanner;
use crate::extraction::raw_store::RawStore;
use crate::extraction::retry::RetryPolicy;
use crate::load::loader::Loader;
use crate::load::session::StoreSession;
use crate::types::cleaned::CleanedRecord;
use crate::types::observation::RawObservation;
use chrono::NaiveDate;
use log::info;
use std::path::Path;

/// Counters of one full ETL run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub extraction: ExtractionSummary,
    pub cleaning: Option<CleaningReport>,
    pub rows_loaded: u64,
}

/// Wires the stages together from one configuration.
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    config: EtlConfig,
}

impl EtlPipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    fn cleaner(&self) -> Result<Cleaner, EtlError> {
        let province_map = ProvinceMap::with_aliases(&self.config.province_aliases)?;
        let thresholds = Thresholds::from_config(&self.config.thresholds)?;
        Ok(Cleaner::builder()
            .province_map(province_map)
            .thresholds(thresholds)
            .gap_threshold(self.config.cleaning.gap_threshold)
            .build())
    }

    fn extractor<A: OpenDataApi>(&self, api: A) -> Extractor<A> {
        Extractor::builder()
            .api(api)
            .raw_store(RawStore::new(self.config.paths.raw_store()))
            .planner(WindowPlanner::from(&self.config.extraction))
            .retry(RetryPolicy::from(&self.config.retry))
            .build()
    }

    /// Incremental extraction against the live provider.
    pub async fn extract(&self, api_key: &str, today: NaiveDate) -> Result<ExtractionOutcome, EtlError> {
        let client =
            AemetClient::new(api_key, &self.config.extraction).map_err(ExtractionError::HttpClient)?;
        self.extract_with(client, today).await
    }

    pub async fn extract_with<A: OpenDataApi>(
        &self,
        api: A,
        today: NaiveDate,
    ) -> Result<ExtractionOutcome, EtlError> {
        Ok(self.extractor(api).run(today).await?)
    }

    /// Cleans a raw batch and rewrites the cleaned audit file.
    pub async fn clean(
        &self,
        raw: &[RawObservation],
    ) -> Result<(Vec<CleanedRecord>, CleaningReport), EtlError> {
        let cleaner = self.cleaner()?;
        let (records, report) = cleaner.clean(raw);
        write_cleaned_csv(&self.config.paths.cleaned_file(), &records).await?;
        Ok((records, report))
    }

    /// Re-cleans a whole raw CSV without touching the provider.
    pub async fn clean_file(&self, input: &Path) -> Result<(Vec<CleanedRecord>, CleaningReport), EtlError> {
        let raw = RawStore::new(input).read_all().await?;
        info!("Read {} raw rows from {}", raw.len(), input.display());
        self.clean(&raw).await
    }

    /// Appends records to the store, opening and releasing one session.
    pub async fn load(&self, records: &[CleanedRecord], database_url: &str) -> Result<u64, EtlError> {
        let session = StoreSession::connect(database_url).await?;
        let result = match Loader::new(&session, &self.config.load.table, self.config.load.chunk_size) {
            Ok(loader) => loader.append(records).await,
            Err(e) => Err(e),
        };
        session.close().await;
        Ok(result?)
    }

    pub async fn load_file(&self, input: &Path, database_url: &str) -> Result<u64, EtlError> {
        let records = read_cleaned_csv(input).await?;
        self.load(&records, database_url).await
    }

    /// Full run against the live provider: extract, clean, load.
    pub async fn run(
        &self,
        api_key: &str,
        database_url: &str,
        today: NaiveDate,
    ) -> Result<RunSummary, EtlError> {
        let client =
            AemetClient::new(api_key, &self.config.extraction).map_err(ExtractionError::HttpClient)?;
        self.run_with(client, database_url, today).await
    }

    pub async fn run_with<A: OpenDataApi>(
        &self,
        api: A,
        database_url: &str,
        today: NaiveDate,
    ) -> Result<RunSummary, EtlError> {
        let outcome = self.extract_with(api, today).await?;
        let mut summary = RunSummary {
            extraction: outcome.summary,
            ..RunSummary::default()
        };
        if outcome.is_empty() {
            info!("No data to process");
            return Ok(summary);
        }

        let (records, report) = self.clean(&outcome.rows).await?;
        summary.cleaning = Some(report);
        summary.rows_loaded = self.load(&records, database_url).await?;

        info!(
            "ETL run {} finished: {} stations, {} skipped, {}/{} windows failed, {} raw rows, {} cleaned, {} loaded",
            outcome.run_id,
            summary.extraction.stations,
            summary.extraction.stations_skipped,
            summary.extraction.windows_failed,
            summary.extraction.windows_requested,
            summary.extraction.rows,
            records.len(),
            summary.rows_loaded
        );
        Ok(summary)
    }
}
