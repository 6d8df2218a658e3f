//! Reads and bulk-writes supplier price-list rows inside a transaction

use anyhow::{Context, Result};
use arraybind_core::Transaction;
use arraybind_marshal::{BulkExecutor, BulkOptions};

use crate::model::SupplierPriceEntry;
use crate::settings::JobSection;

pub struct SupplierPriceRepository {
    select_sql: String,
    update_sql: String,
    executor: BulkExecutor,
}

impl SupplierPriceRepository {
    pub fn new(select_sql: impl Into<String>, update_sql: impl Into<String>) -> Self {
        Self {
            select_sql: select_sql.into(),
            update_sql: update_sql.into(),
            executor: BulkExecutor::default(),
        }
    }

    pub fn from_settings(settings: &JobSection) -> Self {
        let mut options = BulkOptions::new();
        if let Some(timeout) = settings.command_timeout() {
            options = options.with_command_timeout(timeout);
        }
        Self {
            executor: BulkExecutor::new(options),
            ..Self::new(&settings.select_sql, &settings.update_sql)
        }
    }

    pub async fn fetch(&self, tx: &dyn Transaction) -> Result<Vec<SupplierPriceEntry>> {
        let result = tx
            .query(&self.select_sql, &[])
            .await
            .context("Failed to read supplier price list")?;

        result
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                SupplierPriceEntry::try_from(row)
                    .with_context(|| format!("Invalid supplier price row {}", index))
            })
            .collect()
    }

    /// Write every row back with one bulk round trip, returning the affected
    /// row count reported by the driver.
    pub async fn update(&self, tx: &dyn Transaction, rows: &[SupplierPriceEntry]) -> Result<u64> {
        let affected = self
            .executor
            .execute(tx, &self.update_sql, rows)
            .await
            .context("Bulk update of supplier price list failed")?;
        Ok(affected)
    }
}
