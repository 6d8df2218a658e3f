//! The plan-date restamp: read every row, overwrite the date, write back in bulk.

use anyhow::{Context, Result, anyhow};
use arraybind_core::{Connection, Transaction};
use arraybind_marshal::parse_datetime;
use chrono::NaiveDateTime;

use crate::repository::SupplierPriceRepository;

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    Success = 0,
    Failure = 12,
}

impl From<JobStatus> for std::process::ExitCode {
    fn from(status: JobStatus) -> Self {
        std::process::ExitCode::from(status as u8)
    }
}

/// Parse the command-line date. Date-only input is midnight.
pub fn parse_plan_date(input: &str) -> Result<NaiveDateTime> {
    parse_datetime(input).ok_or_else(|| {
        anyhow!(
            "'{}' is not a valid date (expected YYYY-MM-DD or DD/MM/YYYY, optionally followed by HH:MM:SS)",
            input.trim()
        )
    })
}

/// Restamp `plan_date` on every row in one transaction.
///
/// Any failure rolls the transaction back before the error is returned; a
/// failed rollback is logged and does not replace the original error.
pub async fn run(
    conn: &dyn Connection,
    repository: &SupplierPriceRepository,
    plan_date: NaiveDateTime,
) -> Result<u64> {
    tracing::info!("Starting transaction");
    let tx = conn
        .begin_transaction()
        .await
        .context("Failed to begin transaction")?;

    match restamp(&*tx, repository, plan_date).await {
        Ok(affected) => {
            tracing::info!("Committing transaction");
            tx.commit().await.context("Failed to commit transaction")?;
            Ok(affected)
        }
        Err(err) => {
            tracing::warn!("Rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn restamp(
    tx: &dyn Transaction,
    repository: &SupplierPriceRepository,
    plan_date: NaiveDateTime,
) -> Result<u64> {
    let mut rows = repository.fetch(tx).await?;
    tracing::info!(rows = rows.len(), "Fetched supplier price list");

    for row in &mut rows {
        row.plan_date = plan_date;
    }

    tracing::info!(plan_date = %plan_date, "Updating supplier price list");
    let affected = repository.update(tx, &rows).await?;
    tracing::info!(affected, "Supplier price list updated");
    Ok(affected)
}
