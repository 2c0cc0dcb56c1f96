//! Table accessors: CRUD and paginated listing over one table.
//!
//! An [`Accessor`] hands out a fresh [`TableQuery`] for every operation, so no
//! predicate leaks from one call into the next. The transactional flavour in
//! [`transactional`] scopes the same operations to one [`Transaction`](crate::Transaction).

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::database::Database;
use crate::error::SqlAccessorError;
use crate::filter::{EqualityNormalizer, Filter, FilterNormalizer};
use crate::query::TableQuery;
use crate::types::{Record, RowValues};

mod list;
pub mod transactional;

pub use list::{ListQuery, ListResult, PageValue};
pub use transactional::{DEFAULT_TRANSACTION_TIMEOUT, TIMEOUT_ROLLBACK_REASON, TransactionalAccessor};

/// Caller hook over a query under construction.
///
/// Return `Some(query)` to replace the query, or `None` to keep it, including
/// any changes made through the `&mut` borrow.
pub type QueryHook = dyn Fn(&mut TableQuery) -> Option<TableQuery> + Send + Sync;

/// Zero-argument source of fresh table sessions.
pub type TableProvider = dyn Fn() -> TableQuery + Send + Sync;

pub(crate) fn apply_hook(mut query: TableQuery, hook: Option<&QueryHook>) -> TableQuery {
    match hook {
        Some(hook) => hook(&mut query).unwrap_or(query),
        None => query,
    }
}

#[derive(Clone)]
enum TableSource {
    Provider(Arc<TableProvider>),
    Named { db: Database, table: String },
}

impl TableSource {
    fn session(&self) -> TableQuery {
        match self {
            TableSource::Provider(provider) => provider(),
            TableSource::Named { db, table } => db.table(table.clone()),
        }
    }
}

/// One row or many rows for [`Accessor::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertData {
    One(Record),
    Many(Vec<Record>),
}

impl InsertData {
    fn into_rows(self) -> Vec<Record> {
        match self {
            InsertData::One(row) => vec![row],
            InsertData::Many(rows) => rows,
        }
    }
}

impl From<Record> for InsertData {
    fn from(row: Record) -> Self {
        InsertData::One(row)
    }
}

impl From<Vec<Record>> for InsertData {
    fn from(rows: Vec<Record>) -> Self {
        InsertData::Many(rows)
    }
}

/// CRUD operations on one table.
///
/// ```rust,no_run
/// # use sql_accessor::prelude::*;
/// # async fn demo(db: &Database) -> Result<(), SqlAccessorError> {
/// let users = Accessor::from_table(db, "users");
/// users.insert(record! { "name" => "ann", "status" => "active" }).await?;
///
/// let page = users
///     .list(&ListQuery::new(1, 10).search(["name"], "ann").filter(Filter::new().eq("status", "active")))
///     .await?;
/// assert_eq!(page.total, page.data.len() as i64);
///
/// users
///     .update(record! { "status" => "closed" }, &Filter::new().eq("id", 5))
///     .execute()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Accessor {
    source: TableSource,
    normalizer: Arc<dyn FilterNormalizer>,
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Accessor");
        match &self.source {
            TableSource::Provider(_) => dbg.field("source", &"provider"),
            TableSource::Named { table, .. } => dbg.field("table", table),
        };
        dbg.finish_non_exhaustive()
    }
}

impl Accessor {
    /// Accessor over sessions produced by `provider`, called once per operation.
    pub fn new(provider: impl Fn() -> TableQuery + Send + Sync + 'static) -> Self {
        Self {
            source: TableSource::Provider(Arc::new(provider)),
            normalizer: Arc::new(EqualityNormalizer),
        }
    }

    /// Accessor over `table` on a pooled database.
    pub fn from_table(db: &Database, table: impl Into<String>) -> Self {
        Self {
            source: TableSource::Named {
                db: db.clone(),
                table: table.into(),
            },
            normalizer: Arc::new(EqualityNormalizer),
        }
    }

    /// Replace the default equality normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: impl FilterNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// A fresh, unfiltered session.
    #[must_use]
    pub fn table(&self) -> TableQuery {
        self.source.session()
    }

    fn filtered(&self, filter: &Filter) -> TableQuery {
        let mut query = self.table();
        query.where_predicate(self.normalizer.normalize(filter));
        query
    }

    /// Insert one record or a batch.
    ///
    /// An empty batch writes nothing. Rows that all share one column set go out
    /// as multi-row `INSERT`s, split so no statement exceeds the backend's
    /// bound-parameter limit; otherwise each row is its own statement.
    ///
    /// # Errors
    /// Returns rendering or backend errors; rows already written by earlier
    /// statements of a heterogeneous batch stay written unless the caller's
    /// transaction rolls back.
    pub async fn insert(&self, data: impl Into<InsertData>) -> Result<usize, SqlAccessorError> {
        let rows = data.into().into_rows();
        let Some(first) = rows.first() else {
            debug!("insert called with no rows; skipping");
            return Ok(0);
        };

        let columns: Vec<String> = first.keys().cloned().collect();
        let uniform = rows.len() == 1
            || (!columns.is_empty()
                && rows
                    .iter()
                    .all(|row| row.len() == columns.len() && row.keys().eq(columns.iter())));

        if uniform {
            let mut values: Vec<Vec<RowValues>> =
                rows.into_iter().map(|row| row.into_values().collect()).collect();
            let mut query = self.table();
            let per_statement =
                (query.placeholder_style().max_params() / columns.len().max(1)).max(1);
            if values.len() <= per_statement {
                query.insert_rows(columns, values);
                return query.execute().await;
            }

            debug!(
                rows = values.len(),
                per_statement, "splitting insert to stay under the bind limit"
            );
            let mut affected = 0;
            while !values.is_empty() {
                let rest = values.split_off(per_statement.min(values.len()));
                query.insert_rows(columns.clone(), std::mem::replace(&mut values, rest));
                affected += query.execute().await?;
                query = self.table();
            }
            return Ok(affected);
        }

        let mut affected = 0;
        for row in rows {
            let columns: Vec<String> = row.keys().cloned().collect();
            let mut query = self.table();
            query.insert_rows(columns, vec![row.into_values().collect()]);
            affected += query.execute().await?;
        }
        Ok(affected)
    }

    /// `UPDATE … SET data` restricted to rows matching `filter`. Not executed.
    #[must_use]
    pub fn update(&self, data: Record, filter: &Filter) -> TableQuery {
        let mut query = self.filtered(filter);
        query.update(data);
        query
    }

    /// Count rows, after letting `hook` narrow the query.
    ///
    /// # Errors
    /// Returns rendering or backend errors.
    pub async fn count(&self, hook: Option<&QueryHook>) -> Result<i64, SqlAccessorError> {
        self.count_built(|query| apply_hook(query, hook)).await
    }

    async fn count_built(
        &self,
        build: impl FnOnce(TableQuery) -> TableQuery,
    ) -> Result<i64, SqlAccessorError> {
        let mut query = build(self.table());
        query.count_as("size");
        query.fetch_count().await
    }

    /// All rows matching `filter`, as a query the caller can keep narrowing.
    #[must_use]
    pub fn query(&self, filter: &Filter) -> TableQuery {
        self.filtered(filter)
    }

    /// `SELECT * … LIMIT 1` over rows matching `filter`. Run it with
    /// [`TableQuery::fetch_first`].
    #[must_use]
    pub fn first(&self, filter: &Filter) -> TableQuery {
        let mut query = self.filtered(filter);
        query.select_all().limit(1);
        query
    }

    /// `DELETE` of rows matching `filter`. Not executed.
    #[must_use]
    pub fn delete(&self, filter: &Filter) -> TableQuery {
        let mut query = self.filtered(filter);
        query.delete();
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::RecordingExecutor;
    use crate::record;
    use crate::translation::PlaceholderStyle;

    fn accessor(exec: &Arc<RecordingExecutor>) -> Accessor {
        let exec = Arc::clone(exec);
        Accessor::new(move || TableQuery::new(exec.clone(), "users"))
    }

    #[tokio::test]
    async fn empty_batch_insert_writes_nothing() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        let affected = accessor(&exec).insert(Vec::<Record>::new()).await.unwrap();
        assert_eq!(affected, 0);
        assert!(exec.sql_log().is_empty());
    }

    #[tokio::test]
    async fn uniform_batch_is_one_statement_and_mixed_batch_is_per_row() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        let users = accessor(&exec);
        users
            .insert(vec![record! { "name" => "a" }, record! { "name" => "b" }])
            .await
            .unwrap();
        users
            .insert(vec![record! { "name" => "c" }, record! { "name" => "d", "age" => 4 }])
            .await
            .unwrap();
        assert_eq!(
            exec.sql_log(),
            vec![
                r#"INSERT INTO "users" ("name") VALUES (?1), (?2)"#.to_owned(),
                r#"INSERT INTO "users" ("name") VALUES (?1)"#.to_owned(),
                r#"INSERT INTO "users" ("age", "name") VALUES (?1, ?2)"#.to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn large_uniform_batch_is_split_at_the_bind_limit() {
        let rows = || -> Vec<Record> {
            (0..20_000)
                .map(|i| record! { "name" => format!("u{i}"), "age" => i })
                .collect()
        };

        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        accessor(&exec).insert(rows()).await.unwrap();
        let sizes: Vec<usize> = exec.param_log().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![32_766, 7_234]);
        let sql = exec.sql_log();
        assert!(sql[1].starts_with(r#"INSERT INTO "users" ("age", "name") VALUES (?1, ?2), (?3"#));
        assert!(sql[1].ends_with("(?7233, ?7234)"));

        let exec = RecordingExecutor::shared(PlaceholderStyle::Postgres);
        accessor(&exec).insert(rows()).await.unwrap();
        assert_eq!(exec.param_log().len(), 1);
        assert_eq!(exec.param_log()[0].len(), 40_000);
    }

    #[test]
    fn filtered_builders_render_expected_sql() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Postgres);
        let users = accessor(&exec);
        let by_id = Filter::new().eq("id", 5);

        let update = users.update(record! { "status" => "closed" }, &by_id);
        let compiled = update.to_sql().unwrap();
        assert_eq!(compiled.sql, r#"UPDATE "users" SET "status" = $1 WHERE "id" = $2"#);
        assert_eq!(compiled.params, vec![RowValues::from("closed"), RowValues::Int(5)]);

        assert_eq!(
            users.first(&by_id).to_sql().unwrap().sql,
            r#"SELECT * FROM "users" WHERE "id" = $1 LIMIT 1"#
        );
        assert_eq!(
            users.delete(&Filter::all()).to_sql().unwrap().sql,
            r#"DELETE FROM "users""#
        );
        assert_eq!(users.query(&Filter::all()).to_sql().unwrap().sql, r#"SELECT * FROM "users""#);
    }

    #[tokio::test]
    async fn count_hook_can_mutate_in_place_or_replace() {
        let exec = Arc::new(RecordingExecutor::new(PlaceholderStyle::Sqlite, 3));
        let users = accessor(&exec);

        assert_eq!(users.count(None).await.unwrap(), 3);

        let in_place: &QueryHook = &|q: &mut TableQuery| {
            q.where_eq("status", "active");
            None
        };
        users.count(Some(in_place)).await.unwrap();

        let replace: &QueryHook = &|q: &mut TableQuery| {
            let mut other = q.clone();
            other.where_eq("org", 1);
            Some(other)
        };
        users.count(Some(replace)).await.unwrap();

        assert_eq!(
            exec.sql_log(),
            vec![
                r#"SELECT count(*) AS "size" FROM "users""#.to_owned(),
                r#"SELECT count(*) AS "size" FROM "users" WHERE "status" = ?1"#.to_owned(),
                r#"SELECT count(*) AS "size" FROM "users" WHERE "org" = ?1"#.to_owned(),
            ]
        );
    }
}
