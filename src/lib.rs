//! Table accessors over pooled `SQLite` and `PostgreSQL` connections.
//!
//! An [`Accessor`] wraps one table with insert / update / count / paginated
//! list / query / first / delete. A [`TransactionalAccessor`] does the same
//! inside a [`Transaction`], adds commit and rollback, and rolls the
//! transaction back on its own if it is still open when its timeout elapses.
//!
//! ```rust,no_run
//! use sql_accessor::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlAccessorError> {
//! let db = Database::sqlite_builder("app.db").build().await?;
//! db.execute_batch("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT, status TEXT)")
//!     .await?;
//!
//! let users = Accessor::from_table(&db, "users");
//! users.insert(record! { "name" => "ann", "status" => "active" }).await?;
//! let page = users
//!     .list(&ListQuery::new(1, 20).search(["name"], "an"))
//!     .await?;
//! println!("{} of {}", page.data.len(), page.total);
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one backend feature: `sqlite` or `postgres`");

pub mod accessor;
pub mod database;
pub mod error;
pub mod executor;
pub mod filter;
pub mod prelude;
pub mod query;
pub mod results;
pub mod transaction;
pub mod translation;
pub mod tx_outcome;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use accessor::{
    Accessor, DEFAULT_TRANSACTION_TIMEOUT, InsertData, ListQuery, ListResult, PageValue,
    QueryHook, TIMEOUT_ROLLBACK_REASON, TableProvider, TransactionalAccessor,
};
pub use database::{Database, DatabasePool};
pub use error::SqlAccessorError;
pub use executor::QueryExecutor;
pub use filter::{EqualityNormalizer, Filter, FilterNormalizer};
pub use query::{CompiledQuery, Condition, Operator, Order, Predicate, TableQuery, WhereClause};
pub use results::{CustomDbRow, ResultSet};
pub use transaction::Transaction;
pub use translation::PlaceholderStyle;
pub use tx_outcome::TxOutcome;
pub use types::{DatabaseType, Record, RowValues};
