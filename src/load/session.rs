use crate::load::error::LoadError;
use log::{debug, info};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;

/// The store connection of one run.
///
/// Opened once with [`StoreSession::connect`] and released with
/// [`StoreSession::close`]; dropping the session also releases the pool.
#[derive(Debug, Clone)]
pub struct StoreSession {
    pool: AnyPool,
}

impl StoreSession {
    /// Connects to `url` (`mysql://...` in production, `sqlite:...` for tests).
    pub async fn connect(url: &str) -> Result<Self, LoadError> {
        install_default_drivers();
        // One connection: there is a single sequential writer, and an
        // in-memory SQLite database lives only as long as its connection.
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await
            .map_err(LoadError::Connect)?;
        debug!("Store session opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Store session closed");
    }
}
