use async_trait::async_trait;

use crate::error::SqlAccessorError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Something that can run rendered SQL: a pooled [`Database`](crate::Database)
/// (one checkout per statement) or an open [`Transaction`](crate::Transaction).
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Placeholder style statements must be rendered with.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Run a row-returning statement.
    async fn select(&self, sql: &str, params: &[RowValues])
    -> Result<ResultSet, SqlAccessorError>;

    /// Run a statement and return the number of affected rows.
    async fn dml(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlAccessorError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every statement and answers selects with a canned result.
    pub(crate) struct RecordingExecutor {
        style: PlaceholderStyle,
        pub(crate) statements: Mutex<Vec<(String, Vec<RowValues>)>>,
        count: i64,
    }

    impl RecordingExecutor {
        pub(crate) fn new(style: PlaceholderStyle, count: i64) -> Self {
            Self {
                style,
                statements: Mutex::new(Vec::new()),
                count,
            }
        }

        pub(crate) fn shared(style: PlaceholderStyle) -> Arc<Self> {
            Arc::new(Self::new(style, 0))
        }

        pub(crate) fn sql_log(&self) -> Vec<String> {
            self.statements
                .lock()
                .unwrap()
                .iter()
                .map(|(sql, _)| sql.clone())
                .collect()
        }

        pub(crate) fn param_log(&self) -> Vec<Vec<RowValues>> {
            self.statements
                .lock()
                .unwrap()
                .iter()
                .map(|(_, params)| params.clone())
                .collect()
        }
    }

    #[async_trait]
    impl QueryExecutor for RecordingExecutor {
        fn placeholder_style(&self) -> PlaceholderStyle {
            self.style
        }

        async fn select(
            &self,
            sql: &str,
            params: &[RowValues],
        ) -> Result<ResultSet, SqlAccessorError> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_owned(), params.to_vec()));
            let mut rs = ResultSet::with_capacity(1);
            if sql.contains("count(*)") {
                rs.set_column_names(Arc::new(vec!["size".to_owned()]));
                rs.add_row_values(vec![RowValues::Int(self.count)]);
            }
            Ok(rs)
        }

        async fn dml(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlAccessorError> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_owned(), params.to_vec()));
            Ok(0)
        }
    }
}
