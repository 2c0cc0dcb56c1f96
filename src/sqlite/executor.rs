use tracing::debug;

use crate::error::SqlAccessorError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::config::SharedSqliteConnection;
use super::params::Params;
use super::query::build_result_set;

/// Run `func` against the connection on tokio's blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlAccessorError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlAccessorError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlAccessorError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Execute a SELECT and materialize the rows.
///
/// # Errors
/// Returns `SqlAccessorError` if preparing or executing the query fails.
pub async fn select(
    conn: SharedSqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlAccessorError> {
    debug!(sql = query, params = params.len(), "sqlite select");
    let sql_owned = query.to_owned();
    let converted = Params::convert(params);
    run_blocking(conn, move |guard| {
        let mut stmt = guard.prepare_cached(&sql_owned)?;
        build_result_set(&mut stmt, &converted)
    })
    .await
}

/// Execute a DML statement and return rows affected.
///
/// # Errors
/// Returns `SqlAccessorError` if preparing or executing the statement fails.
pub async fn dml(
    conn: SharedSqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlAccessorError> {
    debug!(sql = query, params = params.len(), "sqlite dml");
    let sql_owned = query.to_owned();
    let converted = Params::convert(params);
    run_blocking(conn, move |guard| {
        let mut stmt = guard.prepare_cached(&sql_owned)?;
        Ok(stmt.execute(&converted.as_refs()[..])?)
    })
    .await
}

/// Execute one or more statements without parameters.
///
/// # Errors
/// Returns `SqlAccessorError` if any statement fails.
pub async fn execute_batch(conn: SharedSqliteConnection, sql: &str) -> Result<(), SqlAccessorError> {
    debug!(sql, "sqlite batch");
    let sql_owned = sql.to_owned();
    run_blocking(conn, move |guard| Ok(guard.execute_batch(&sql_owned)?)).await
}
