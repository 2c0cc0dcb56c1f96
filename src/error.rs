use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlAccessorError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid pagination value: {0:?}")]
    InvalidPagination(String),

    #[error("Transaction already completed ({0})")]
    TransactionCompleted(String),
}

#[cfg(feature = "sqlite")]
impl From<bb8::RunError<rusqlite::Error>> for SqlAccessorError {
    fn from(err: bb8::RunError<rusqlite::Error>) -> Self {
        SqlAccessorError::ConnectionError(format!("SQLite pool error: {err}"))
    }
}
