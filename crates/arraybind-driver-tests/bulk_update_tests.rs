//! Bulk UPDATE tests

use anyhow::Result;
use arraybind_core::Value;
use arraybind_marshal::{BulkError, BulkExecutor, bulk_record};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;

use crate::fixtures::{StockItem, TestStore, test_database};

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

#[rstest]
#[case::memory(TestStore::Memory)]
#[case::file(TestStore::File)]
#[tokio::test]
async fn test_bulk_update_every_row(#[case] store: TestStore) -> Result<()> {
    let db = test_database(store).await?;
    let items = vec![
        StockItem {
            note: Some("x".into()),
            ..StockItem::new("A-1", 1, 11, Decimal::ONE)
        },
        StockItem::new("A-2", 1, 21, Decimal::ONE),
        StockItem {
            note: Some("z".into()),
            ..StockItem::new("B-1", 2, 31, Decimal::ONE)
        },
    ];

    let affected = BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET qty = :qty, note = :note WHERE sku = :sku",
            &items,
        )
        .await?;

    assert_eq!(affected, 3);
    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'A-2'").await?,
        Value::Int64(21)
    );
    assert_eq!(
        db.scalar("SELECT note FROM inventory WHERE sku = 'A-1'").await?,
        text("x")
    );
    assert_eq!(
        db.scalar("SELECT note FROM inventory WHERE sku = 'A-2'").await?,
        Value::Null
    );
    Ok(())
}

#[rstest]
#[case::memory(TestStore::Memory)]
#[case::file(TestStore::File)]
#[tokio::test]
async fn test_bulk_update_overwrites_with_null(#[case] store: TestStore) -> Result<()> {
    let db = test_database(store).await?;
    // B-1 has a note and a restock time; both become NULL.
    let items = vec![StockItem::new("B-1", 2, 30, Decimal::ONE)];

    BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET note = :note, restocked_at = :restocked_at WHERE sku = :sku",
            &items,
        )
        .await?;

    assert_eq!(
        db.scalar("SELECT note FROM inventory WHERE sku = 'B-1'").await?,
        Value::Null
    );
    assert_eq!(
        db.scalar("SELECT restocked_at FROM inventory WHERE sku = 'B-1'")
            .await?,
        Value::Null
    );
    Ok(())
}

#[rstest]
#[case::memory(TestStore::Memory)]
#[case::file(TestStore::File)]
#[tokio::test]
async fn test_bulk_update_repeated_placeholder(#[case] store: TestStore) -> Result<()> {
    let db = test_database(store).await?;
    let items = vec![
        StockItem::new("A-1", 1, 5, Decimal::ONE),
        StockItem::new("B-1", 2, 50, Decimal::ONE),
    ];

    // Only rows whose current qty exceeds the delta are bumped.
    let affected = BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET qty = qty + :qty WHERE sku = :sku AND qty > :qty",
            &items,
        )
        .await?;

    assert_eq!(affected, 1);
    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'A-1'").await?,
        Value::Int64(15)
    );
    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'B-1'").await?,
        Value::Int64(30)
    );
    Ok(())
}

#[tokio::test]
async fn test_bulk_update_value_encodings() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;
    let restocked = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(8, 30, 0))
        .expect("valid timestamp");
    let items = vec![StockItem {
        restocked_at: Some(restocked),
        ..StockItem::new("A-2", 200, 20, Decimal::new(1050, 2))
    }];

    BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET warehouse = :warehouse, price = :price, restocked_at = :restocked_at WHERE sku = :SKU",
            &items,
        )
        .await?;

    assert_eq!(
        db.scalar("SELECT warehouse FROM inventory WHERE sku = 'A-2'")
            .await?,
        Value::Int64(200)
    );
    assert_eq!(
        db.scalar("SELECT price FROM inventory WHERE sku = 'A-2'").await?,
        text("10.5")
    );
    assert_eq!(
        db.scalar("SELECT restocked_at FROM inventory WHERE sku = 'A-2'")
            .await?,
        text("2024-03-01 08:30:00")
    );
    Ok(())
}

#[tokio::test]
async fn test_bulk_update_with_no_records() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;

    let affected = BulkExecutor::default()
        .execute::<StockItem, _>(db.conn(), "UPDATE inventory SET qty = :qty", &[])
        .await?;

    assert_eq!(affected, 0);
    assert_eq!(
        db.scalar("SELECT SUM(qty) FROM inventory").await?,
        Value::Int64(60)
    );
    Ok(())
}

struct Attachment {
    sku: String,
    payload: Vec<u8>,
}

bulk_record!(Attachment {
    sku: String,
    payload: Vec<u8>,
});

#[tokio::test]
async fn test_unsupported_field_leaves_table_untouched() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;
    let items = vec![Attachment {
        sku: "A-1".into(),
        payload: vec![1, 2, 3],
    }];

    let err = BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET note = :payload WHERE sku = :sku",
            &items,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BulkError::UnsupportedType { type_name: "bytes", .. }));
    assert_eq!(
        db.scalar("SELECT note FROM inventory WHERE sku = 'A-1'").await?,
        text("first")
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_field_is_reported() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;
    let items = vec![StockItem::new("A-1", 1, 1, Decimal::ONE)];

    let err = BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET qty = :quantity WHERE sku = :sku",
            &items,
        )
        .await
        .unwrap_err();

    match err {
        BulkError::FieldNotFound { placeholder, .. } => assert_eq!(placeholder, "quantity"),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

struct Recount {
    sku: String,
    qty: u64,
}

bulk_record!(Recount { sku: String, qty: u64 });

#[tokio::test]
async fn test_out_of_range_value_fails_before_execution() -> Result<()> {
    let db = test_database(TestStore::Memory).await?;
    let items = vec![
        Recount {
            sku: "A-1".into(),
            qty: 1,
        },
        Recount {
            sku: "A-2".into(),
            qty: u64::MAX,
        },
    ];

    let err = BulkExecutor::default()
        .execute(
            db.conn(),
            "UPDATE inventory SET qty = :qty WHERE sku = :sku",
            &items,
        )
        .await
        .unwrap_err();

    assert!(err.is_pre_execution());
    assert!(matches!(err, BulkError::Conversion { row: 1, .. }));
    // Row 0 was valid but nothing was sent.
    assert_eq!(
        db.scalar("SELECT qty FROM inventory WHERE sku = 'A-1'").await?,
        Value::Int64(10)
    );
    Ok(())
}
