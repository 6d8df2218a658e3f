//! Core test fixtures for running the bulk marshaller against SQLite.
//!
//! Every test gets a fresh database seeded with a small `inventory` table. The
//! same test can run against an in-memory database and an on-disk file by
//! taking a [`TestStore`] case:
//!
//! ```rust,ignore
//! #[rstest]
//! #[case::memory(TestStore::Memory)]
//! #[case::file(TestStore::File)]
//! #[tokio::test]
//! async fn test_something(#[case] store: TestStore) -> anyhow::Result<()> {
//!     let db = test_database(store).await?;
//!     let qty = db.scalar("SELECT qty FROM inventory WHERE sku = 'A-1'").await?;
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use arraybind_core::{Connection, Value};
use arraybind_driver_sqlite::SqliteConnection;
use arraybind_marshal::bulk_record;
use chrono::NaiveDateTime;
use indoc::indoc;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Schema and seed rows shared by every test database
pub const INVENTORY_SCHEMA: &str = indoc! {"
    CREATE TABLE inventory (
        sku          TEXT PRIMARY KEY,
        warehouse    INTEGER NOT NULL,
        qty          INTEGER NOT NULL,
        price        TEXT NOT NULL,
        restocked_at TEXT,
        note         TEXT
    );
    INSERT INTO inventory VALUES ('A-1', 1, 10, '1.5', NULL, 'first');
    INSERT INTO inventory VALUES ('A-2', 1, 20, '2.25', NULL, NULL);
    INSERT INTO inventory VALUES ('B-1', 2, 30, '0.1', '2024-01-01 00:00:00', 'third');
"};

/// Where the test database lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStore {
    /// `:memory:` database
    Memory,
    /// File in a temporary directory, removed when the fixture drops
    File,
}

/// One row of the `inventory` table
#[derive(Debug, Clone, PartialEq)]
pub struct StockItem {
    /// Primary key
    pub sku: String,
    /// Warehouse number
    pub warehouse: u8,
    /// Units on hand
    pub qty: i32,
    /// Unit price
    pub price: Decimal,
    /// Last restock time, if any
    pub restocked_at: Option<NaiveDateTime>,
    /// Free-form note
    pub note: Option<String>,
}

bulk_record!(StockItem {
    sku: String,
    warehouse: u8,
    qty: i32,
    price: Decimal,
    restocked_at: Option<NaiveDateTime>,
    note: Option<String>,
});

impl StockItem {
    /// Item with no restock time and no note
    pub fn new(sku: &str, warehouse: u8, qty: i32, price: Decimal) -> Self {
        Self {
            sku: sku.to_string(),
            warehouse,
            qty,
            price,
            restocked_at: None,
            note: None,
        }
    }
}

/// A seeded SQLite database
pub struct TestDatabase {
    conn: SqliteConnection,
    _dir: Option<TempDir>,
}

impl TestDatabase {
    /// The underlying connection
    pub fn conn(&self) -> &SqliteConnection {
        &self.conn
    }

    /// First column of the first row of `sql`
    pub async fn scalar(&self, sql: &str) -> Result<Value> {
        let result = self
            .conn
            .query(sql, &[])
            .await
            .with_context(|| format!("query failed: {}", sql))?;
        result
            .rows
            .first()
            .and_then(|row| row.get(0))
            .cloned()
            .with_context(|| format!("query returned no rows: {}", sql))
    }

    /// `SELECT COUNT(*)` for a table
    pub async fn count(&self, table: &str) -> Result<i64> {
        self.scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .await?
            .as_i64()
            .context("count is not an integer")
    }
}

/// Open and seed a fresh test database
pub async fn test_database(store: TestStore) -> Result<TestDatabase> {
    initialize_logging();

    let (conn, dir) = match store {
        TestStore::Memory => (SqliteConnection::open(":memory:")?, None),
        TestStore::File => {
            let dir = tempfile::tempdir().context("failed to create temp dir")?;
            let path = dir.path().join("arraybind.db");
            let path = path.to_str().context("temp path is not UTF-8")?;
            (SqliteConnection::open(path)?, Some(dir))
        }
    };

    conn.execute_batch(INVENTORY_SCHEMA)
        .await
        .context("failed to seed inventory")?;
    tracing::debug!(store = ?store, "test database ready");

    Ok(TestDatabase { conn, _dir: dir })
}

/// Initialize logging for tests if not already initialized
fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("arraybind=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
