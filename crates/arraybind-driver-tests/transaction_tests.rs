//! Bulk execution inside transactions

use anyhow::Result;
use arraybind_core::{Connection, Value};
use arraybind_marshal::{BulkError, BulkExecutor};
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;

use crate::fixtures::{StockItem, TestStore, test_database};

const UPDATE_QTY: &str = "UPDATE inventory SET qty = :qty WHERE sku = :sku";

#[rstest]
#[case::memory(TestStore::Memory)]
#[case::file(TestStore::File)]
#[tokio::test]
async fn test_bulk_update_then_commit(#[case] store: TestStore) -> Result<()> {
    let db = test_database(store).await?;
    let items = vec![
        StockItem::new("A-1", 1, 0, Decimal::ONE),
        StockItem::new("A-2", 1, 0, Decimal::ONE),
    ];

    let tx = db.conn().begin_transaction().await?;
    let affected = BulkExecutor::default()
        .execute(&*tx, UPDATE_QTY, &items)
        .await?;
    tx.commit().await?;

    assert_eq!(affected, 2);
    assert_eq!(
        db.scalar("SELECT SUM(qty) FROM inventory").await?,
        Value::Int64(30)
    );
    Ok(())
}

#[rstest]
#[case::memory(TestStore::Memory)]
#[case::file(TestStore::File)]
#[tokio::test]
async fn test_bulk_update_then_rollback(#[case] store: TestStore) -> Result<()> {
    let db = test_database(store).await?;
    let items = vec![StockItem::new("B-1", 2, 999, Decimal::ONE)];

    let tx = db.conn().begin_transaction().await?;
    BulkExecutor::default()
        .execute(&*tx, UPDATE_QTY, &items)
        .await?;
    tx.rollback().await?;

    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'B-1'").await?,
        Value::Int64(30)
    );
    Ok(())
}

#[tokio::test]
async fn test_failure_mid_batch_rolls_back_earlier_rows() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;
    // Row 1 violates the NOT NULL constraint on warehouse.
    let sql = "UPDATE inventory SET qty = :qty, warehouse = CASE WHEN :sku = 'A-2' THEN NULL ELSE warehouse END WHERE sku = :sku";
    let items = vec![
        StockItem::new("A-1", 1, 500, Decimal::ONE),
        StockItem::new("A-2", 1, 500, Decimal::ONE),
    ];

    let tx = db.conn().begin_transaction().await?;
    let err = BulkExecutor::default()
        .execute(&*tx, sql, &items)
        .await
        .unwrap_err();
    assert!(matches!(err, BulkError::Execution(_)));
    tx.rollback().await?;

    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'A-1'").await?,
        Value::Int64(10)
    );
    Ok(())
}
