//! Shared server state and configuration loading.

use std::fs;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::db::CrmDb;

/// Runtime configuration, read from `~/.salesdesk/config.json` when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Socket address to bind, e.g. "127.0.0.1:8080".
    pub bind: Option<String>,
    /// Explicit database path; defaults to `~/.salesdesk/salesdesk.db`.
    pub database_path: Option<String>,
}

/// State shared across request handlers. The connection is behind a mutex:
/// SQLite serialises writes anyway, and WAL keeps the lock hold times short.
pub struct AppState {
    pub db: Mutex<CrmDb>,
}

impl AppState {
    pub fn new(db: CrmDb) -> Self {
        Self { db: Mutex::new(db) }
    }
}

/// Load configuration. A missing file is fine (defaults apply); a malformed
/// file is an error so typos do not silently fall back to defaults.
pub fn load_config() -> Result<Config, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    let config_path = home.join(".salesdesk").join("config.json");

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(&config_path).map_err(|e| format!("Failed to read config: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}
