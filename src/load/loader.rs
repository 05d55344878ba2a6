use crate::cleaning::coerce::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::load::error::LoadError;
use crate::load::session::StoreSession;
use crate::types::cleaned::{CleanedRecord, CLEANED_COLUMNS};
use log::{debug, info, warn};
use sqlx::{Any, QueryBuilder};

/// SQLite caps bound parameters per statement at 32766.
const MAX_ROWS_PER_STATEMENT: usize = 32766 / CLEANED_COLUMNS.len();

/// Appends cleaned records to the weather-facts table.
///
/// Every chunk of `chunk_size` rows is committed in its own transaction.
/// Chunks committed before a failure stay in the store.
pub struct Loader<'a> {
    session: &'a StoreSession,
    table: String,
    chunk_size: usize,
}

impl<'a> Loader<'a> {
    pub fn new(session: &'a StoreSession, table: &str, chunk_size: usize) -> Result<Self, LoadError> {
        validate_table_name(table)?;
        Ok(Self {
            session,
            table: table.to_string(),
            chunk_size: chunk_size.max(1),
        })
    }

    /// Inserts every record, returning the number of rows written.
    pub async fn append(&self, records: &[CleanedRecord]) -> Result<u64, LoadError> {
        if records.is_empty() {
            warn!("No data to load into '{}'", self.table);
            return Ok(0);
        }

        info!("Loading {} rows into '{}'", records.len(), self.table);
        let mut written = 0;
        for chunk in records.chunks(self.chunk_size) {
            written += self.insert_chunk(chunk).await?;
            debug!("Committed {}/{} rows", written, records.len());
        }
        info!("{} rows inserted into '{}'", written, self.table);
        Ok(written)
    }

    async fn insert_chunk(&self, chunk: &[CleanedRecord]) -> Result<u64, LoadError> {
        let map_err = |source: sqlx::Error| LoadError::Insert {
            table: self.table.clone(),
            source,
        };

        let mut tx = self.session.pool().begin().await.map_err(map_err)?;
        let mut written = 0;
        for rows in chunk.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Any> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                self.table,
                CLEANED_COLUMNS.join(", ")
            ));
            builder.push_values(rows, |mut row, r| {
                row.push_bind(r.batch_id.clone())
                    .push_bind(r.station_code.clone())
                    .push_bind(r.station_name.clone())
                    .push_bind(r.province.clone())
                    .push_bind(r.province_code)
                    .push_bind(r.region_code)
                    .push_bind(r.altitude)
                    .push_bind(r.date.format(DATE_FORMAT).to_string())
                    .push_bind(r.tmin)
                    .push_bind(r.tmax)
                    .push_bind(r.tmed)
                    .push_bind(r.prec)
                    .push_bind(r.velmedia)
                    .push_bind(r.racha)
                    .push_bind(r.hr_media)
                    .push_bind(r.extracted_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string()))
                    .push_bind(r.cleaning_id);
            });
            let result = builder.build().execute(&mut *tx).await.map_err(map_err)?;
            written += result.rows_affected();
        }
        tx.commit().await.map_err(map_err)?;
        Ok(written)
    }
}

/// The table name is interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<(), LoadError> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(LoadError::InvalidTable(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use sqlx::Row;

    const CREATE_TABLE: &str = "CREATE TABLE datos_meteorologicos (
        id_descarga TEXT, indicativo TEXT NOT NULL, nombre TEXT, provincia TEXT,
        codigo_provincia INTEGER, codigo_ca INTEGER, altitud REAL, fecha TEXT NOT NULL,
        tmin REAL, tmax REAL, tmed REAL NOT NULL, prec REAL NOT NULL, velmedia REAL,
        racha REAL, hrMedia REAL, timestamp_extraccion TEXT, id_limpieza INTEGER,
        PRIMARY KEY (fecha, indicativo))";

    async fn session() -> Result<StoreSession, Box<dyn std::error::Error>> {
        let session = StoreSession::connect("sqlite::memory:").await?;
        sqlx::query(CREATE_TABLE).execute(session.pool()).await?;
        Ok(session)
    }

    fn records(code: &str, n: usize) -> Vec<CleanedRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let mut r = CleanedRecord::empty(code, start + Duration::days(i as i64));
                r.cleaning_id = i as i64 + 1;
                r.tmed = Some(10.0 + i as f64);
                r.prec = Some(0.0);
                r.province_code = Some(28);
                r
            })
            .collect()
    }

    #[tokio::test]
    async fn test_append_in_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let session = session().await?;
        let loader = Loader::new(&session, "datos_meteorologicos", 4)?;

        let written = loader.append(&records("3195", 10)).await?;
        assert_eq!(written, 10);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datos_meteorologicos")
            .fetch_one(session.pool())
            .await?;
        assert_eq!(count, 10);

        let row = sqlx::query("SELECT indicativo, fecha, tmed FROM datos_meteorologicos WHERE id_limpieza = 3")
            .fetch_one(session.pool())
            .await?;
        assert_eq!(row.try_get::<String, _>("indicativo")?, "3195");
        assert_eq!(row.try_get::<String, _>("fecha")?, "2024-01-03");
        assert_eq!(row.try_get::<f64, _>("tmed")?, 12.0);

        session.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_frame_is_noop() -> Result<(), Box<dyn std::error::Error>> {
        let session = session().await?;
        let loader = Loader::new(&session, "datos_meteorologicos", 100)?;
        assert_eq!(loader.append(&[]).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_keeps_committed_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let session = session().await?;
        let loader = Loader::new(&session, "datos_meteorologicos", 3)?;

        // Rows 0..3 commit; the second chunk collides with row 0 on its key.
        let mut batch = records("3195", 3);
        batch.extend(records("3195", 1));
        let err = loader.append(&batch).await.unwrap_err();
        assert!(matches!(err, LoadError::Insert { .. }));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datos_meteorologicos")
            .fetch_one(session.pool())
            .await?;
        assert_eq!(count, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let session = StoreSession::connect("sqlite::memory:").await?;
        let loader = Loader::new(&session, "datos_meteorologicos", 10)?;
        assert!(loader.append(&records("3195", 1)).await.is_err());
        Ok(())
    }

    #[test]
    fn test_table_name_validation() {
        assert!(matches!(
            validate_table_name("weather; DROP TABLE x"),
            Err(LoadError::InvalidTable(_))
        ));
        assert!(validate_table_name("datos_meteorologicos").is_ok());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("").is_err());
    }
}
