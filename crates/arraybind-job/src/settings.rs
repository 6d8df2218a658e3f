//! Job settings loaded from a TOML file

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name looked up next to the executable
pub const LOCAL_SETTINGS_FILE: &str = "arraybind-job.toml";

pub const DEFAULT_SELECT_SQL: &str = "SELECT plan_date, branch_code, item_code, list_seq, \
     approval_status, supplier_code, city_code, state_code, price, ipi_pct, icms_pct, \
     freight_type, approved_at, icms_invoice_rate, item_origin, icms_fund_pct \
     FROM supplier_price_list";

pub const DEFAULT_UPDATE_SQL: &str = "UPDATE supplier_price_list SET plan_date = :plan_date \
     WHERE branch_code = :branch_code AND item_code = :item_code \
     AND list_seq = :list_seq AND supplier_code = :supplier_code";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub job: JobSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "arraybind.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: PathBuf,
    /// Prefix of the daily rolling log file
    pub file_prefix: String,
    /// Fallback filter when `RUST_LOG` is unset
    pub filter: String,
    /// Write the log file as JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("arraybind")
                .join("logs"),
            file_prefix: "arraybind-job.log".to_string(),
            filter: "info,arraybind_marshal=debug".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSection {
    /// Budget for the bulk round trip; 0 disables it
    pub command_timeout_secs: u64,
    pub select_sql: String,
    pub update_sql: String,
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            command_timeout_secs: 0,
            select_sql: DEFAULT_SELECT_SQL.to_string(),
            update_sql: DEFAULT_UPDATE_SQL.to_string(),
        }
    }
}

impl JobSection {
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

impl JobSettings {
    /// Load settings from `explicit`, or from the first default location that
    /// exists. Falls back to defaults when no file is found.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse settings in {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default lookup order, without the `--config` override
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(dir.join(LOCAL_SETTINGS_FILE));
        }
        if let Ok(dir) = config_dir() {
            paths.push(dir.join("job.toml"));
        }
        paths
    }
}

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("arraybind"))
}
