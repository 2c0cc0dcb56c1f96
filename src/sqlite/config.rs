use std::sync::Arc;
use std::time::Duration;

use bb8::ManageConnection;
use tokio::sync::Mutex;
use tracing::debug;

use crate::database::{Database, DatabasePool};
use crate::error::SqlAccessorError;
use crate::types::DatabaseType;

use super::executor::run_blocking;

/// A rusqlite connection shared between the async side and the blocking pool.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// bb8 manager opening file-backed `SQLite` connections.
///
/// Every pooled connection opens the same path, so `:memory:` would give each
/// checkout its own empty database; use a file.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: String,
    busy_timeout: Duration,
}

impl SqliteManager {
    #[must_use]
    pub fn new(db_path: String, busy_timeout: Duration) -> Self {
        Self {
            db_path,
            busy_timeout,
        }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = rusqlite::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let db_path = self.db_path.clone();
        let busy_timeout = self.busy_timeout;
        async move {
            let conn = rusqlite::Connection::open(&db_path)?;
            conn.busy_timeout(busy_timeout)?;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move { handle.lock().await.execute_batch("SELECT 1") }
    }

    // A connection handed back mid-transaction (failed rollback, dropped without
    // a runtime) must not be reused.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.try_lock().map_or(true, |guard| !guard.is_autocommit())
    }
}

/// Options for configuring a `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.opts.max_connections = max_connections;
        self
    }

    /// How long a statement waits on a locked database before failing.
    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a [`Database`] backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqlAccessorError` if pool creation or the initial WAL setup fails.
    pub async fn build(self) -> Result<Database, SqlAccessorError> {
        Database::new_sqlite(self.finish()).await
    }
}

impl Database {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path.into())
    }

    /// Open a bb8 pool over `opts.db_path` and switch the file to WAL mode.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` for a zero-sized pool, or the
    /// underlying error if opening the file or setting WAL fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, SqlAccessorError> {
        if opts.max_connections == 0 {
            return Err(SqlAccessorError::ConfigError(
                "max_connections must be at least 1".into(),
            ));
        }
        let manager = SqliteManager::new(opts.db_path.clone(), opts.busy_timeout);
        let pool = bb8::Pool::builder()
            .max_size(opts.max_connections)
            .build(manager)
            .await?;

        {
            let conn = pool.get().await?;
            let mode = run_blocking(Arc::clone(&*conn), |guard| {
                guard
                    .query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
                    .map_err(SqlAccessorError::SqliteError)
            })
            .await?;
            debug!(db_path = %opts.db_path, journal_mode = %mode, "sqlite pool ready");
        }

        Ok(Database::from_parts(DatabasePool::Sqlite(pool), DatabaseType::Sqlite))
    }
}
