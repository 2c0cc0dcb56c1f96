use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SqlAccessorError;
use crate::executor::QueryExecutor;
use crate::query::TableQuery;
use crate::results::ResultSet;
use crate::transaction::Transaction;
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

/// Backend-specific connection pool.
#[derive(Clone)]
pub enum DatabasePool {
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
    #[cfg(feature = "postgres")]
    Postgres(deadpool_postgres::Pool),
}

impl fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => f
                .debug_struct("Sqlite")
                .field("state", &pool.state())
                .finish(),
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => f
                .debug_struct("Postgres")
                .field("status", &pool.status())
                .finish(),
        }
    }
}

/// A pooled database handle. Cloning is cheap and shares the pool.
///
/// Every statement run through a `Database` checks out its own connection;
/// use [`Database::transaction`] to pin several statements to one.
#[derive(Clone, Debug)]
pub struct Database {
    pool: DatabasePool,
    db_type: DatabaseType,
}

impl Database {
    pub(crate) fn from_parts(pool: DatabasePool, db_type: DatabaseType) -> Self {
        Self { pool, db_type }
    }

    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// A fresh query session on `table`, outside any transaction.
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> TableQuery {
        TableQuery::new(Arc::new(self.clone()), table)
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// # Errors
    /// Returns pool errors or the backend's error for `BEGIN`.
    pub async fn transaction(&self) -> Result<Transaction, SqlAccessorError> {
        Transaction::begin(self).await
    }

    /// Run one or more statements without parameters, e.g. schema setup.
    ///
    /// # Errors
    /// Returns pool errors or the first failing statement's error.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), SqlAccessorError> {
        match &self.pool {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => {
                let conn = pool.get().await?;
                sqlite::executor::execute_batch(Arc::clone(&*conn), sql).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => {
                let client = pool.get().await?;
                postgres::executor::execute_batch(&client, sql).await
            }
        }
    }
}

#[async_trait]
impl QueryExecutor for Database {
    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.db_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => PlaceholderStyle::Sqlite,
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => PlaceholderStyle::Postgres,
        }
    }

    async fn select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlAccessorError> {
        match &self.pool {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => {
                let conn = pool.get().await?;
                sqlite::executor::select(Arc::clone(&*conn), sql, params).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => {
                let client = pool.get().await?;
                postgres::executor::select(&client, sql, params).await
            }
        }
    }

    async fn dml(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlAccessorError> {
        let affected = match &self.pool {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => {
                let conn = pool.get().await?;
                sqlite::executor::dml(Arc::clone(&*conn), sql, params).await?
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => {
                let client = pool.get().await?;
                postgres::executor::dml(&client, sql, params).await?
            }
        };
        debug!(affected, "pooled dml complete");
        Ok(affected)
    }
}
