//! Table-scoped query sessions.
//!
//! A [`TableQuery`] is created fresh for every logical operation (see
//! [`Database::table`](crate::Database::table) and
//! [`Transaction::table`](crate::Transaction::table)), narrowed with the
//! `where_*` / `limit` / `order_by` modifiers, and finally executed with one of
//! the terminal `fetch_*` / `execute` calls. Modifiers take `&mut self` so that
//! hooks receiving `&mut TableQuery` can extend the query in place.
//!
//! ```rust,no_run
//! # use sql_accessor::prelude::*;
//! # async fn demo(db: &Database) -> Result<(), SqlAccessorError> {
//! let rows = db
//!     .table("users")
//!     .where_eq("status", "active")
//!     .order_by("id", Order::Asc)
//!     .limit(20)
//!     .fetch_all()
//!     .await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::SqlAccessorError;
use crate::executor::QueryExecutor;
use crate::results::{CustomDbRow, ResultSet};
use crate::translation::PlaceholderStyle;
use crate::types::{Record, RowValues};

mod condition;
mod ident;
mod render;

pub use condition::{Clause, Condition, Conjunction, Operator, Predicate, WhereClause};
pub use ident::quote_ident;
pub use render::CompiledQuery;

/// Sort direction for [`TableQuery::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    /// Empty column list selects `*`.
    Select { columns: Vec<String> },
    Count { alias: String },
    Insert {
        columns: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    },
    Update { assignments: Vec<(String, RowValues)> },
    Delete,
}

/// A query under construction against one table, bound to the executor
/// (pool or transaction) it will run on.
#[derive(Clone)]
pub struct TableQuery {
    executor: Arc<dyn QueryExecutor>,
    style: PlaceholderStyle,
    table: String,
    statement: Statement,
    clauses: WhereClause,
    order: Vec<(String, Order)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl fmt::Debug for TableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableQuery")
            .field("table", &self.table)
            .field("style", &self.style)
            .field("statement", &self.statement)
            .field("clauses", &self.clauses)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl TableQuery {
    /// Start a `SELECT *` session on `table`.
    pub fn new(executor: Arc<dyn QueryExecutor>, table: impl Into<String>) -> Self {
        let style = executor.placeholder_style();
        Self {
            executor,
            style,
            table: table.into(),
            statement: Statement::Select {
                columns: Vec::new(),
            },
            clauses: WhereClause::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn where_clause(&self) -> &WhereClause {
        &self.clauses
    }

    #[must_use]
    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    #[must_use]
    pub fn get_offset(&self) -> Option<i64> {
        self.offset
    }

    // ----- predicates -----

    pub fn and_where(&mut self, condition: Condition) -> &mut Self {
        self.clauses.and_where(condition);
        self
    }

    pub fn or_where(&mut self, condition: Condition) -> &mut Self {
        self.clauses.or_where(condition);
        self
    }

    pub fn where_eq(&mut self, column: impl Into<String>, value: impl Into<RowValues>) -> &mut Self {
        self.and_where(Condition::eq(column, value))
    }

    pub fn or_where_eq(
        &mut self,
        column: impl Into<String>,
        value: impl Into<RowValues>,
    ) -> &mut Self {
        self.or_where(Condition::eq(column, value))
    }

    pub fn where_op(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<RowValues>,
    ) -> &mut Self {
        self.and_where(Condition::compare(column, op, value))
    }

    pub fn where_like(&mut self, column: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.and_where(Condition::like(column, pattern))
    }

    pub fn or_where_like(
        &mut self,
        column: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        self.or_where(Condition::like(column, pattern))
    }

    pub fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.and_where(Condition::is_null(column))
    }

    pub fn where_in<I, V>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.and_where(Condition::any_of(column, values))
    }

    /// AND a raw fragment. Placeholders may be written `$N`, `?N` or `?`; they
    /// are renumbered for this query's backend when rendered.
    pub fn where_raw(&mut self, sql: impl Into<String>, params: Vec<RowValues>) -> &mut Self {
        self.and_where(Condition::raw(sql, params))
    }

    pub fn and_where_group(&mut self, build: impl FnOnce(&mut WhereClause)) -> &mut Self {
        self.clauses.and_where_group(build);
        self
    }

    pub fn or_where_group(&mut self, build: impl FnOnce(&mut WhereClause)) -> &mut Self {
        self.clauses.or_where_group(build);
        self
    }

    /// AND a normalized filter predicate.
    pub fn where_predicate(&mut self, predicate: Predicate) -> &mut Self {
        self.clauses.and_predicate(predicate);
        self
    }

    // ----- shape -----

    /// Project specific columns; `*` and `table.*` are accepted.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement = Statement::Select {
            columns: columns.into_iter().map(Into::into).collect(),
        };
        self
    }

    pub fn select_all(&mut self) -> &mut Self {
        self.select(std::iter::empty::<String>())
    }

    /// Turn this session into `SELECT count(*) AS <alias>`.
    pub fn count_as(&mut self, alias: impl Into<String>) -> &mut Self {
        self.statement = Statement::Count {
            alias: alias.into(),
        };
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, order: Order) -> &mut Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Turn this session into an `INSERT` of rows that share `columns`.
    pub(crate) fn insert_rows(&mut self, columns: Vec<String>, rows: Vec<Vec<RowValues>>) -> &mut Self {
        self.statement = Statement::Insert { columns, rows };
        self
    }

    /// Turn this session into an `UPDATE … SET` of `data`, keeping its predicates.
    pub fn update(&mut self, data: Record) -> &mut Self {
        self.statement = Statement::Update {
            assignments: data.into_iter().collect(),
        };
        self
    }

    /// Turn this session into a `DELETE`, keeping its predicates.
    pub fn delete(&mut self) -> &mut Self {
        self.statement = Statement::Delete;
        self
    }

    // ----- terminal -----

    /// Render SQL and parameters without executing.
    ///
    /// # Errors
    /// Returns `SqlAccessorError` for invalid identifiers, raw fragments whose
    /// placeholder count does not match their parameters, or empty updates.
    pub fn to_sql(&self) -> Result<CompiledQuery, SqlAccessorError> {
        render::compile(self, None)
    }

    /// Execute and return every row.
    ///
    /// # Errors
    /// Returns rendering errors or whatever the backend reports.
    pub async fn fetch_all(&self) -> Result<ResultSet, SqlAccessorError> {
        let compiled = self.to_sql()?;
        self.executor.select(&compiled.sql, &compiled.params).await
    }

    /// Execute with `LIMIT 1` and return the row, if any.
    ///
    /// # Errors
    /// Returns rendering errors or whatever the backend reports.
    pub async fn fetch_first(&self) -> Result<Option<CustomDbRow>, SqlAccessorError> {
        let compiled = render::compile(self, Some(1))?;
        let rows = self.executor.select(&compiled.sql, &compiled.params).await?;
        Ok(rows.into_rows().into_iter().next())
    }

    /// Execute a count session and read its single value.
    ///
    /// Reads the `size` column, falling back to the first column; no rows count as 0.
    ///
    /// # Errors
    /// Returns backend errors, or `ExecutionError` if the value is not an integer.
    pub async fn fetch_count(&self) -> Result<i64, SqlAccessorError> {
        let rows = self.fetch_all().await?;
        let Some(row) = rows.first() else {
            return Ok(0);
        };
        let value = row.get("size").or_else(|| row.get_by_index(0));
        match value {
            Some(RowValues::Int(n)) => Ok(*n),
            Some(RowValues::Text(s)) => s.parse().map_err(|e| {
                SqlAccessorError::ExecutionError(format!("count value {s:?} is not an integer: {e}"))
            }),
            other => Err(SqlAccessorError::ExecutionError(format!(
                "count query returned {other:?}"
            ))),
        }
    }

    /// Execute a statement and return the affected row count. Selects return
    /// the number of rows fetched.
    ///
    /// # Errors
    /// Returns rendering errors or whatever the backend reports.
    pub async fn execute(&self) -> Result<usize, SqlAccessorError> {
        let compiled = self.to_sql()?;
        match self.statement {
            Statement::Select { .. } | Statement::Count { .. } => Ok(self
                .executor
                .select(&compiled.sql, &compiled.params)
                .await?
                .len()),
            _ => self.executor.dml(&compiled.sql, &compiled.params).await,
        }
    }
}
