#![cfg(feature = "sqlite")]

use std::time::Duration;

use sql_accessor::prelude::*;
use tempfile::tempdir;
use tokio::time::sleep;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn orders_db(prefix: &str) -> Result<Database, SqlAccessorError> {
    let db = Database::sqlite_builder(unique_db_path(prefix)).build().await?;
    db.execute_batch(
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL);
         CREATE TABLE order_items (order_id INTEGER NOT NULL, sku TEXT NOT NULL);",
    )
    .await?;
    Ok(db)
}

async fn committed_rows(db: &Database, table: &str) -> Result<i64, SqlAccessorError> {
    Accessor::from_table(db, table).count(None).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_persists_and_later_calls_are_noops() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("commit").await?;
    let orders = TransactionalAccessor::begin(&db, "orders", DEFAULT_TRANSACTION_TIMEOUT).await?;

    orders.insert(record! { "id" => 1, "status" => "new" }).await?;
    orders
        .update(record! { "status" => "paid" }, &Filter::new().eq("id", 1))
        .execute()
        .await?;
    assert_eq!(orders.count(None).await?, 1);
    assert_eq!(committed_rows(&db, "orders").await?, 0);

    orders.commit().await?;
    assert!(orders.transaction().is_completed());
    assert_eq!(orders.transaction().outcome().await, TxOutcome::Committed);

    orders.rollback(Some("too late")).await?;
    orders.commit().await?;
    assert_eq!(orders.transaction().outcome().await, TxOutcome::Committed);

    let row = Accessor::from_table(&db, "orders")
        .first(&Filter::new().eq("id", 1))
        .fetch_first()
        .await?
        .expect("committed row");
    assert_eq!(row.get("status").and_then(RowValues::as_text), Some("paid"));

    let err = orders.count(None).await.expect_err("completed transaction");
    assert!(matches!(err, SqlAccessorError::TransactionCompleted(_)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rollback_discards_and_records_reason() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("rollback").await?;
    let orders = TransactionalAccessor::begin(&db, "orders", DEFAULT_TRANSACTION_TIMEOUT).await?;
    orders.insert(record! { "id" => 1, "status" => "new" }).await?;

    orders.rollback(Some("changed my mind")).await?;
    orders.commit().await?;

    assert_eq!(
        orders.transaction().outcome().await,
        TxOutcome::RolledBack {
            reason: Some("changed my mind".into())
        }
    );
    assert_eq!(committed_rows(&db, "orders").await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watchdog_rolls_back_after_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("timeout").await?;
    let orders = TransactionalAccessor::begin(&db, "orders", Duration::from_millis(250)).await?;
    orders.insert(record! { "id" => 1, "status" => "new" }).await?;

    sleep(Duration::from_millis(1000)).await;

    let trx = orders.transaction();
    assert!(trx.is_completed());
    assert_eq!(trx.outcome().await.reason(), Some(TIMEOUT_ROLLBACK_REASON));
    assert_eq!(committed_rows(&db, "orders").await?, 0);

    // Losing the race to the watchdog is not an error.
    orders.commit().await?;
    let err = orders
        .insert(record! { "id" => 2, "status" => "new" })
        .await
        .expect_err("rolled back");
    assert!(matches!(err, SqlAccessorError::TransactionCompleted(_)));

    // The connection went back to the pool with its write lock released.
    Accessor::from_table(&db, "orders")
        .insert(record! { "id" => 3, "status" => "new" })
        .await?;
    assert_eq!(committed_rows(&db, "orders").await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_before_timeout_disarms_watchdog() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("disarm").await?;
    let orders = TransactionalAccessor::begin(&db, "orders", Duration::from_millis(1000)).await?;
    orders.insert(record! { "id" => 1, "status" => "new" }).await?;
    orders.commit().await?;

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(orders.transaction().outcome().await, TxOutcome::Committed);
    assert_eq!(committed_rows(&db, "orders").await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn accessors_share_one_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("shared").await?;

    let orders = TransactionalAccessor::begin(&db, "orders", DEFAULT_TRANSACTION_TIMEOUT).await?;
    let items = TransactionalAccessor::new(
        orders.transaction(),
        "order_items",
        DEFAULT_TRANSACTION_TIMEOUT,
    );
    orders.insert(record! { "id" => 1, "status" => "new" }).await?;
    items
        .insert(vec![
            record! { "order_id" => 1, "sku" => "A-1" },
            record! { "order_id" => 1, "sku" => "B-2" },
        ])
        .await?;
    items.rollback(None).await?;
    assert!(orders.transaction().is_completed());
    assert_eq!(committed_rows(&db, "orders").await?, 0);
    assert_eq!(committed_rows(&db, "order_items").await?, 0);

    let trx = db.transaction().await?;
    let orders = TransactionalAccessor::with_source(
        trx.clone(),
        {
            let trx = trx.clone();
            move || trx.table("orders")
        },
        DEFAULT_TRANSACTION_TIMEOUT,
    );
    let items = TransactionalAccessor::new(trx.clone(), "order_items", DEFAULT_TRANSACTION_TIMEOUT);
    orders.insert(record! { "id" => 2, "status" => "new" }).await?;
    items.insert(record! { "order_id" => 2, "sku" => "C-3" }).await?;
    trx.commit().await?;
    assert_eq!(committed_rows(&db, "orders").await?, 1);
    assert_eq!(committed_rows(&db, "order_items").await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let db = orders_db("drop").await?;
    {
        let trx = db.transaction().await?;
        let orders = Accessor::new({
            let trx = trx.clone();
            move || trx.table("orders")
        });
        orders.insert(record! { "id" => 1, "status" => "new" }).await?;
    }
    sleep(Duration::from_millis(200)).await;

    assert_eq!(committed_rows(&db, "orders").await?, 0);
    let next = db.transaction().await?;
    next.table("orders").where_eq("id", 1).delete().execute().await?;
    next.commit().await?;
    Ok(())
}
