//! arraybind-job: restamps the plan date of every supplier price-list row.
//!
//! ```text
//! arraybind-job 2024-06-30
//! arraybind-job --config /etc/arraybind/job.toml "30/06/2024 08:00:00"
//! ```
//!
//! Exits with 0 on success and 12 on any failure.

mod logging;
mod model;
mod process;
mod repository;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use arraybind_core::Connection;
use arraybind_driver_sqlite::SqliteConnection;
use clap::Parser;

use crate::process::JobStatus;
use crate::repository::SupplierPriceRepository;
use crate::settings::JobSettings;

#[derive(Parser, Debug)]
#[command(name = "arraybind-job", version)]
#[command(about = "Overwrite the plan date of every supplier price-list row in one bulk update")]
struct Args {
    /// Plan date: YYYY-MM-DD or DD/MM/YYYY, optionally followed by HH:MM:SS
    date: String,

    /// Settings file (defaults to arraybind-job.toml next to the executable,
    /// then the user config directory)
    #[arg(short, long, value_name = "FILE", env = "ARRAYBIND_JOB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match JobSettings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("FATAL: {:#}", e);
            return JobStatus::Failure.into();
        }
    };

    let _guard = match logging::init(&settings.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("FATAL: Failed to initialize logging: {:#}", e);
            return JobStatus::Failure.into();
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        date = %args.date,
        "==================== arraybind-job started ===================="
    );

    let status = match execute(&args, &settings).await {
        Ok(affected) => {
            tracing::info!(affected, "Plan date restamp finished");
            JobStatus::Success
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Plan date restamp failed");
            JobStatus::Failure
        }
    };

    tracing::info!(
        exit_code = status as u8,
        "==================== arraybind-job finished ===================="
    );
    status.into()
}

async fn execute(args: &Args, settings: &JobSettings) -> Result<u64> {
    let plan_date = process::parse_plan_date(&args.date)?;

    let conn = SqliteConnection::open(&settings.database.path)
        .with_context(|| format!("Failed to open database {}", settings.database.path))?;
    tracing::info!(path = %settings.database.path, "Database opened");

    let repository = SupplierPriceRepository::from_settings(&settings.job);
    let result = process::run(&conn, &repository, plan_date).await;

    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close database");
    }
    result
}
