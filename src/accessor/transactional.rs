use std::time::Duration;

use tracing::{debug, warn};

use crate::database::Database;
use crate::error::SqlAccessorError;
use crate::filter::{Filter, FilterNormalizer};
use crate::query::TableQuery;
use crate::transaction::Transaction;
use crate::types::Record;

use super::{Accessor, InsertData, ListQuery, ListResult, QueryHook};

/// How long a transactional accessor leaves its transaction open before the
/// watchdog rolls it back.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Rollback reason recorded when the watchdog fires.
pub const TIMEOUT_ROLLBACK_REASON: &str = "Time out";

/// An [`Accessor`] whose sessions all run inside one transaction, with
/// lifecycle control and a timeout watchdog.
///
/// If neither [`commit`](Self::commit) nor [`rollback`](Self::rollback) has
/// completed the transaction when the timeout elapses, it is rolled back with
/// reason [`TIMEOUT_ROLLBACK_REASON`].
///
/// ```rust,no_run
/// # use sql_accessor::prelude::*;
/// # async fn demo(db: &Database) -> Result<(), SqlAccessorError> {
/// let orders = TransactionalAccessor::begin(db, "orders", DEFAULT_TRANSACTION_TIMEOUT).await?;
/// let items = TransactionalAccessor::new(orders.transaction(), "order_items", DEFAULT_TRANSACTION_TIMEOUT);
///
/// orders.insert(record! { "id" => 1, "status" => "new" }).await?;
/// items.insert(record! { "order_id" => 1, "sku" => "A-1" }).await?;
/// orders.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionalAccessor {
    base: Accessor,
    trx: Transaction,
}

impl TransactionalAccessor {
    /// Accessor over `table` inside `trx`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime (the watchdog is spawned here).
    pub fn new(trx: Transaction, table: impl Into<String>, timeout: Duration) -> Self {
        let table = table.into();
        let session_trx = trx.clone();
        Self::with_source(trx, move || session_trx.table(table.clone()), timeout)
    }

    /// Accessor over sessions from `provider`, which should build them from
    /// `trx` (e.g. `move || trx.table("users")`).
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime (the watchdog is spawned here).
    pub fn with_source(
        trx: Transaction,
        provider: impl Fn() -> TableQuery + Send + Sync + 'static,
        timeout: Duration,
    ) -> Self {
        arm_watchdog(&trx, timeout);
        Self {
            base: Accessor::new(provider),
            trx,
        }
    }

    /// Open a transaction on `db` and wrap `table` in it.
    ///
    /// # Errors
    /// Returns pool errors or the backend's error for `BEGIN`.
    pub async fn begin(
        db: &Database,
        table: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SqlAccessorError> {
        let trx = db.transaction().await?;
        Ok(Self::new(trx, table, timeout))
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: impl FilterNormalizer + 'static) -> Self {
        self.base = self.base.with_normalizer(normalizer);
        self
    }

    /// The shared transaction, for other accessors joining this unit of work.
    #[must_use]
    pub fn transaction(&self) -> Transaction {
        self.trx.clone()
    }

    #[must_use]
    pub fn accessor(&self) -> &Accessor {
        &self.base
    }

    /// Commit unless already completed.
    ///
    /// # Errors
    /// Returns the backend's error for `COMMIT`.
    pub async fn commit(&self) -> Result<(), SqlAccessorError> {
        self.trx.commit().await
    }

    /// Roll back unless already completed.
    ///
    /// # Errors
    /// Returns the backend's error for `ROLLBACK`.
    pub async fn rollback(&self, msg: Option<&str>) -> Result<(), SqlAccessorError> {
        self.trx.rollback(msg).await
    }

    #[must_use]
    pub fn table(&self) -> TableQuery {
        self.base.table()
    }

    /// See [`Accessor::insert`].
    ///
    /// # Errors
    /// Returns `TransactionCompleted` after commit or rollback, otherwise
    /// rendering or backend errors.
    pub async fn insert(&self, data: impl Into<InsertData>) -> Result<usize, SqlAccessorError> {
        self.base.insert(data).await
    }

    #[must_use]
    pub fn update(&self, data: Record, filter: &Filter) -> TableQuery {
        self.base.update(data, filter)
    }

    /// See [`Accessor::count`].
    ///
    /// # Errors
    /// Returns `TransactionCompleted` after commit or rollback, otherwise
    /// rendering or backend errors.
    pub async fn count(&self, hook: Option<&QueryHook>) -> Result<i64, SqlAccessorError> {
        self.base.count(hook).await
    }

    /// See [`Accessor::list`].
    ///
    /// # Errors
    /// Returns `TransactionCompleted` after commit or rollback, otherwise
    /// pagination, rendering or backend errors.
    pub async fn list(&self, args: &ListQuery<'_>) -> Result<ListResult, SqlAccessorError> {
        self.base.list(args).await
    }

    #[must_use]
    pub fn query(&self, filter: &Filter) -> TableQuery {
        self.base.query(filter)
    }

    #[must_use]
    pub fn first(&self, filter: &Filter) -> TableQuery {
        self.base.first(filter)
    }

    #[must_use]
    pub fn delete(&self, filter: &Filter) -> TableQuery {
        self.base.delete(filter)
    }
}

fn arm_watchdog(trx: &Transaction, timeout: Duration) {
    let trx = trx.clone();
    let done = trx.completion_token();
    tokio::spawn(async move {
        tokio::select! {
            () = done.cancelled() => {
                debug!("transaction completed before timeout; watchdog exiting");
            }
            () = tokio::time::sleep(timeout) => {
                if trx.is_completed() {
                    return;
                }
                warn!(?timeout, "transaction timed out; rolling back");
                if let Err(err) = trx.rollback(Some(TIMEOUT_ROLLBACK_REASON)).await {
                    warn!(error = %err, "timeout rollback failed");
                }
            }
        }
    });
}
