use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to connect to the store")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to insert into '{table}'")]
    Insert {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid table name '{0}'")]
    InvalidTable(String),
}
