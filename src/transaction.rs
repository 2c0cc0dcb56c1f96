use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::database::{Database, DatabasePool};
use crate::error::SqlAccessorError;
use crate::executor::QueryExecutor;
use crate::query::TableQuery;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::tx_outcome::TxOutcome;
use crate::types::RowValues;

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqliteManager};

/// The connection a transaction holds until it completes.
enum TxConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::PooledConnection<'static, SqliteManager>),
    #[cfg(feature = "postgres")]
    Postgres(deadpool_postgres::Object),
}

impl TxConnection {
    async fn run_batch(&self, sql: &str) -> Result<(), SqlAccessorError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(conn) => {
                sqlite::executor::execute_batch(Arc::clone(&**conn), sql).await
            }
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(client) => postgres::executor::execute_batch(client, sql).await,
        }
    }

    async fn select(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlAccessorError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(conn) => {
                sqlite::executor::select(Arc::clone(&**conn), sql, params).await
            }
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(client) => postgres::executor::select(client, sql, params).await,
        }
    }

    async fn dml(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlAccessorError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(conn) => {
                sqlite::executor::dml(Arc::clone(&**conn), sql, params).await
            }
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(client) => postgres::executor::dml(client, sql, params).await,
        }
    }

    /// Keep a connection whose transaction state is unknown out of the pool.
    fn discard(self) {
        match self {
            // bb8 rejects it through `SqliteManager::has_broken` while a
            // transaction is still open on it.
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(conn) => drop(conn),
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(client) => drop(deadpool_postgres::Object::take(client)),
        }
    }

    /// Roll back and hand the connection back to its pool, discarding it on failure.
    async fn release_with_rollback(self) -> Result<(), SqlAccessorError> {
        match self.run_batch("ROLLBACK").await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.discard();
                Err(err)
            }
        }
    }
}

struct TxState {
    conn: Option<TxConnection>,
    outcome: TxOutcome,
}

struct TxInner {
    style: PlaceholderStyle,
    state: Mutex<TxState>,
    completed: AtomicBool,
    done: CancellationToken,
}

impl Drop for TxInner {
    fn drop(&mut self) {
        let Some(conn) = self.state.get_mut().conn.take() else {
            return;
        };
        self.done.cancel();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = conn.release_with_rollback().await {
                    warn!(error = %err, "rollback of dropped transaction failed");
                }
            });
        } else {
            conn.discard();
        }
    }
}

enum Finish {
    Commit,
    Rollback(Option<String>),
}

/// An open unit of work on one pooled connection.
///
/// Cloning shares the same transaction; every clone sees the same completion
/// state. Statements from clones are serialized on the held connection.
/// Dropping the last clone while still open rolls back in the background.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TxInner>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("style", &self.inner.style)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Check out a connection from `db` and issue `BEGIN` on it.
    ///
    /// `SQLite` transactions start with `BEGIN IMMEDIATE` so the write lock is
    /// taken up front instead of failing on the first write.
    ///
    /// # Errors
    /// Returns pool errors or the backend's error for `BEGIN`.
    pub async fn begin(db: &Database) -> Result<Self, SqlAccessorError> {
        let conn = match db.pool() {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => {
                let conn = TxConnection::Sqlite(pool.get_owned().await?);
                conn.run_batch("BEGIN IMMEDIATE").await?;
                conn
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => {
                let conn = TxConnection::Postgres(pool.get().await?);
                conn.run_batch("BEGIN").await?;
                conn
            }
        };
        debug!(db_type = ?db.db_type(), "transaction started");
        Ok(Self {
            inner: Arc::new(TxInner {
                style: db.placeholder_style(),
                state: Mutex::new(TxState {
                    conn: Some(conn),
                    outcome: TxOutcome::Open,
                }),
                completed: AtomicBool::new(false),
                done: CancellationToken::new(),
            }),
        })
    }

    /// True once committed or rolled back.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Current lifecycle state, including the rollback reason if any.
    pub async fn outcome(&self) -> TxOutcome {
        self.inner.state.lock().await.outcome.clone()
    }

    /// Commit. A no-op if the transaction already completed.
    ///
    /// If `COMMIT` fails the transaction is rolled back, the outcome records the
    /// failure as the rollback reason, and the error is returned.
    ///
    /// # Errors
    /// Returns the backend's error for `COMMIT`.
    pub async fn commit(&self) -> Result<(), SqlAccessorError> {
        self.finish(Finish::Commit).await
    }

    /// Roll back with an optional reason. A no-op if the transaction already
    /// completed.
    ///
    /// # Errors
    /// Returns the backend's error for `ROLLBACK`; the transaction still counts
    /// as rolled back and its connection is discarded.
    pub async fn rollback(&self, reason: Option<&str>) -> Result<(), SqlAccessorError> {
        self.finish(Finish::Rollback(reason.map(str::to_owned))).await
    }

    /// A fresh query session on `table` that runs inside this transaction.
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> TableQuery {
        TableQuery::new(Arc::new(self.clone()), table)
    }

    /// Cancelled when the transaction completes.
    pub(crate) fn completion_token(&self) -> CancellationToken {
        self.inner.done.clone()
    }

    async fn finish(&self, action: Finish) -> Result<(), SqlAccessorError> {
        let mut state = self.inner.state.lock().await;
        let Some(conn) = state.conn.take() else {
            debug!(outcome = %state.outcome, "transaction already completed; ignoring");
            return Ok(());
        };
        self.inner.completed.store(true, Ordering::Release);
        self.inner.done.cancel();

        match action {
            Finish::Commit => match conn.run_batch("COMMIT").await {
                Ok(()) => {
                    state.outcome = TxOutcome::Committed;
                    debug!("transaction committed");
                    Ok(())
                }
                Err(err) => {
                    if let Err(rollback_err) = conn.release_with_rollback().await {
                        warn!(error = %rollback_err, "rollback after failed commit failed");
                    }
                    state.outcome = TxOutcome::RolledBack {
                        reason: Some(err.to_string()),
                    };
                    Err(err)
                }
            },
            Finish::Rollback(reason) => {
                let result = conn.release_with_rollback().await;
                debug!(reason = reason.as_deref().unwrap_or(""), "transaction rolled back");
                state.outcome = TxOutcome::RolledBack { reason };
                result
            }
        }
    }

    fn completed_error(outcome: &TxOutcome) -> SqlAccessorError {
        SqlAccessorError::TransactionCompleted(outcome.to_string())
    }
}

#[async_trait]
impl QueryExecutor for Transaction {
    fn placeholder_style(&self) -> PlaceholderStyle {
        self.inner.style
    }

    async fn select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlAccessorError> {
        let state = self.inner.state.lock().await;
        let conn = state
            .conn
            .as_ref()
            .ok_or_else(|| Self::completed_error(&state.outcome))?;
        conn.select(sql, params).await
    }

    async fn dml(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlAccessorError> {
        let state = self.inner.state.lock().await;
        let conn = state
            .conn
            .as_ref()
            .ok_or_else(|| Self::completed_error(&state.outcome))?;
        conn.dml(sql, params).await
    }
}
