//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_accessor::prelude::*;
//! ```

pub use crate::accessor::{
    Accessor, DEFAULT_TRANSACTION_TIMEOUT, InsertData, ListQuery, ListResult, PageValue,
    QueryHook, TIMEOUT_ROLLBACK_REASON, TransactionalAccessor,
};
pub use crate::database::Database;
pub use crate::error::SqlAccessorError;
pub use crate::filter::{Filter, FilterNormalizer};
pub use crate::query::{Condition, Operator, Order, TableQuery};
pub use crate::record;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::transaction::Transaction;
pub use crate::tx_outcome::TxOutcome;
pub use crate::types::{DatabaseType, Record, RowValues};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
