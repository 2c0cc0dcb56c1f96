use serde::Serialize;

use crate::error::SqlAccessorError;
use crate::filter::Filter;
use crate::query::{Predicate, TableQuery};
use crate::results::CustomDbRow;

use super::{Accessor, QueryHook, apply_hook};

/// A page number or page size as it arrives from a caller: a number, or a
/// numeric string such as a query-string parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValue {
    Number(i64),
    Text(String),
}

impl PageValue {
    /// The integer value. Blank text reads as 0.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::InvalidPagination` for text that is not an integer.
    pub fn resolve(&self) -> Result<i64, SqlAccessorError> {
        match self {
            PageValue::Number(n) => Ok(*n),
            PageValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(0);
                }
                trimmed
                    .parse()
                    .map_err(|_| SqlAccessorError::InvalidPagination(text.clone()))
            }
        }
    }
}

impl From<i64> for PageValue {
    fn from(value: i64) -> Self {
        PageValue::Number(value)
    }
}

impl From<i32> for PageValue {
    fn from(value: i32) -> Self {
        PageValue::Number(i64::from(value))
    }
}

impl From<u32> for PageValue {
    fn from(value: u32) -> Self {
        PageValue::Number(i64::from(value))
    }
}

impl From<&str> for PageValue {
    fn from(value: &str) -> Self {
        PageValue::Text(value.to_owned())
    }
}

impl From<String> for PageValue {
    fn from(value: String) -> Self {
        PageValue::Text(value)
    }
}

/// Arguments for [`Accessor::list`].
///
/// `callback` shapes only the data query (projection, ordering); `where_callback`
/// narrows both the data query and the total count.
#[derive(Clone)]
pub struct ListQuery<'a> {
    search_fields: Vec<String>,
    keywords: String,
    page: PageValue,
    pagesize: PageValue,
    filter: Filter,
    callback: Option<&'a QueryHook>,
    where_callback: Option<&'a QueryHook>,
}

impl<'a> ListQuery<'a> {
    /// Page `page` (1-based) of `pagesize` rows. A `pagesize` of zero or less
    /// returns every matching row.
    pub fn new(page: impl Into<PageValue>, pagesize: impl Into<PageValue>) -> Self {
        Self {
            search_fields: Vec::new(),
            keywords: String::new(),
            page: page.into(),
            pagesize: pagesize.into(),
            filter: Filter::all(),
            callback: None,
            where_callback: None,
        }
    }

    /// Match rows where any of `fields` contains `keywords`. Empty keywords
    /// disable the search.
    #[must_use]
    pub fn search<I, S>(mut self, fields: I, keywords: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self.keywords = keywords.into();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn callback(mut self, hook: &'a QueryHook) -> Self {
        self.callback = Some(hook);
        self
    }

    #[must_use]
    pub fn where_callback(mut self, hook: &'a QueryHook) -> Self {
        self.where_callback = Some(hook);
        self
    }

    fn window(&self) -> Result<Option<(i64, i64)>, SqlAccessorError> {
        let size = self.pagesize.resolve()?;
        let page = self.page.resolve()?;
        if size <= 0 {
            return Ok(None);
        }
        let offset = page.saturating_sub(1).max(0).saturating_mul(size);
        Ok(Some((size, offset)))
    }
}

/// One page of rows plus the number of rows matching across all pages.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub data: Vec<CustomDbRow>,
    pub total: i64,
}

impl Accessor {
    /// The filter and keyword predicate shared by a list's data and count queries.
    fn list_scope(&self, args: &ListQuery<'_>) -> Predicate {
        let mut scope = self.normalizer.normalize(&args.filter);
        if !args.keywords.is_empty() && !args.search_fields.is_empty() {
            let pattern = format!("%{}%", args.keywords);
            scope.and_where_group(|group| {
                for field in &args.search_fields {
                    group.or_where_like(field.clone(), pattern.clone());
                }
            });
        }
        scope
    }

    /// One page of filtered, keyword-searched rows and the total match count.
    ///
    /// The count runs the same filter, keyword group and `where_callback` as the
    /// data query, without the pagination window or `callback`.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::InvalidPagination` for non-numeric page
    /// values, otherwise rendering or backend errors.
    pub async fn list(&self, args: &ListQuery<'_>) -> Result<ListResult, SqlAccessorError> {
        let window = args.window()?;
        let scope = self.list_scope(args);

        let mut query = self.table();
        query.where_predicate(scope.clone());
        if let Some((size, offset)) = window {
            query.limit(size).offset(offset);
        }
        let query = apply_hook(query, args.where_callback);
        let query = apply_hook(query, args.callback);
        let data = query.fetch_all().await?.into_rows();

        let total = self
            .count_built(|mut count: TableQuery| {
                count.where_predicate(scope);
                apply_hook(count, args.where_callback)
            })
            .await?;

        Ok(ListResult { data, total })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::testing::RecordingExecutor;
    use crate::query::Order;
    use crate::translation::PlaceholderStyle;
    use crate::types::RowValues;

    fn accessor(exec: &Arc<RecordingExecutor>) -> Accessor {
        let exec = Arc::clone(exec);
        Accessor::new(move || TableQuery::new(exec.clone(), "users"))
    }

    #[test]
    fn page_values_parse_numbers_and_reject_garbage() {
        assert_eq!(PageValue::from(" 3 ").resolve().unwrap(), 3);
        assert_eq!(PageValue::from("").resolve().unwrap(), 0);
        assert_eq!(PageValue::from(-2).resolve().unwrap(), -2);
        assert!(matches!(
            PageValue::from("ten").resolve(),
            Err(SqlAccessorError::InvalidPagination(ref s)) if s == "ten"
        ));
    }

    #[test]
    fn window_clamps_page_and_disables_for_non_positive_size() {
        assert_eq!(ListQuery::new(3, 10).window().unwrap(), Some((10, 20)));
        assert_eq!(ListQuery::new(0, 10).window().unwrap(), Some((10, 0)));
        assert_eq!(ListQuery::new(2, 0).window().unwrap(), None);
        assert_eq!(ListQuery::new("2", "-1").window().unwrap(), None);
    }

    #[tokio::test]
    async fn keyword_page_and_total_share_where_clause() {
        let exec = Arc::new(RecordingExecutor::new(PlaceholderStyle::Sqlite, 1));
        let result = accessor(&exec)
            .list(
                &ListQuery::new(1, 10)
                    .search(["name"], "ann")
                    .filter(Filter::new().eq("status", "active")),
            )
            .await
            .unwrap();
        assert_eq!(result.total, 1);

        let sql = exec.sql_log();
        assert_eq!(
            sql[0],
            r#"SELECT * FROM "users" WHERE "status" = ?1 AND ("name" LIKE ?2) LIMIT 10 OFFSET 0"#
        );
        assert_eq!(
            sql[1],
            r#"SELECT count(*) AS "size" FROM "users" WHERE "status" = ?1 AND ("name" LIKE ?2)"#
        );
        let params = exec.param_log();
        assert_eq!(params[0], params[1]);
        assert_eq!(params[0][1], RowValues::from("%ann%"));
    }

    #[tokio::test]
    async fn callback_shapes_data_only_and_where_callback_shapes_both() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Postgres);
        let narrow: &QueryHook = &|q: &mut TableQuery| {
            q.where_eq("org", 9);
            None
        };
        let shape: &QueryHook = &|q: &mut TableQuery| {
            q.select(["id", "name"]).order_by("id", Order::Asc);
            None
        };
        accessor(&exec)
            .list(
                &ListQuery::new("2", "5")
                    .search(["name", "email"], "x")
                    .where_callback(narrow)
                    .callback(shape),
            )
            .await
            .unwrap();

        let sql = exec.sql_log();
        assert_eq!(
            sql[0],
            r#"SELECT "id", "name" FROM "users" WHERE ("name" LIKE $1 OR "email" LIKE $2) AND "org" = $3 ORDER BY "id" ASC LIMIT 5 OFFSET 5"#
        );
        assert_eq!(
            sql[1],
            r#"SELECT count(*) AS "size" FROM "users" WHERE ("name" LIKE $1 OR "email" LIKE $2) AND "org" = $3"#
        );
    }

    #[tokio::test]
    async fn omitted_hooks_match_identity_hooks() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        let users = accessor(&exec);
        let identity: &QueryHook = &|_: &mut TableQuery| None;
        let base = || {
            ListQuery::new(2, 3)
                .search(["name"], "an")
                .filter(Filter::new().eq("status", "active"))
        };

        users.list(&base()).await.unwrap();
        users
            .list(&base().where_callback(identity).callback(identity))
            .await
            .unwrap();
        users.count(None).await.unwrap();
        users.count(Some(identity)).await.unwrap();

        let sql = exec.sql_log();
        let params = exec.param_log();
        assert_eq!(sql.len(), 6);
        assert_eq!(sql[0..2], sql[2..4]);
        assert_eq!(params[0..2], params[2..4]);
        assert_eq!(sql[4], sql[5]);
        assert_eq!(
            sql[0],
            r#"SELECT * FROM "users" WHERE "status" = ?1 AND ("name" LIKE ?2) LIMIT 3 OFFSET 3"#
        );
    }

    #[tokio::test]
    async fn unpaginated_without_keywords() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        let result = accessor(&exec)
            .list(&ListQuery::new(1, 0).search(["name"], ""))
            .await
            .unwrap();
        assert!(result.data.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(
            exec.sql_log(),
            vec![
                r#"SELECT * FROM "users""#.to_owned(),
                r#"SELECT count(*) AS "size" FROM "users""#.to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn bad_page_size_fails_before_querying() {
        let exec = RecordingExecutor::shared(PlaceholderStyle::Sqlite);
        let err = accessor(&exec)
            .list(&ListQuery::new(1, "abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlAccessorError::InvalidPagination(_)));
        assert!(exec.sql_log().is_empty());
    }
}
