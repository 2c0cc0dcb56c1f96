use tokio_postgres::Client;
use tracing::debug;

use crate::error::SqlAccessorError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::Params;
use super::query::build_result_set;

/// Execute a SELECT on a client.
///
/// # Errors
/// Returns errors from preparation or query execution.
pub async fn select(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlAccessorError> {
    debug!(sql = query, params = params.len(), "postgres select");
    let stmt = client.prepare(query).await?;
    let converted = Params::convert(params);
    let rows = client.query(&stmt, converted.as_refs()).await?;
    build_result_set(&stmt, &rows)
}

/// Execute a DML statement on a client and return rows affected.
///
/// # Errors
/// Returns errors from query execution.
pub async fn dml(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlAccessorError> {
    debug!(sql = query, params = params.len(), "postgres dml");
    let converted = Params::convert(params);
    let rows = client.execute(query, converted.as_refs()).await?;
    usize::try_from(rows).map_err(|e| {
        SqlAccessorError::ExecutionError(format!("postgres affected rows conversion error: {e}"))
    })
}

/// Execute one or more statements without parameters.
///
/// # Errors
/// Returns errors from the batch.
pub async fn execute_batch(client: &Client, sql: &str) -> Result<(), SqlAccessorError> {
    debug!(sql, "postgres batch");
    Ok(client.batch_execute(sql).await?)
}
