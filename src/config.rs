// ⚙️ Configuration - TOML file with defaults for every field
//
// Example:
//   database_path = "site-ledger.db"
//
//   [sync]
//   suppression_window_ms = 2000
//   page_size = 1000
//   suppression_policy = "drop_all"
//
//   [import]
//   default_daily_rate = 150000

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Daily wage assigned to workers whose rate cannot be inferred
pub const DEFAULT_DAILY_RATE: i64 = 150_000;

/// Page size for bulk selects from the row store
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// How long realtime echoes are ignored after a local sync
pub const DEFAULT_SUPPRESSION_WINDOW_MS: u64 = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file backing the row store
    pub database_path: PathBuf,

    /// Origin tag written on every change this client makes
    pub client_id: String,

    pub sync: SyncConfig,

    pub import: ImportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("site-ledger.db"),
            client_id: uuid::Uuid::new_v4().to_string(),
            sync: SyncConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from `path` when given and present, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }
}

/// What to do with realtime events while a suppression window is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionPolicy {
    /// Drop every event, whatever its origin
    DropAll,

    /// Let events tagged with another client's origin through
    ForeignOriginPasses,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub suppression_window_ms: u64,
    pub page_size: usize,
    pub suppression_policy: SuppressionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            suppression_window_ms: DEFAULT_SUPPRESSION_WINDOW_MS,
            page_size: DEFAULT_PAGE_SIZE,
            suppression_policy: SuppressionPolicy::DropAll,
        }
    }
}

impl SyncConfig {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub default_daily_rate: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            default_daily_rate: DEFAULT_DAILY_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();

        assert_eq!(config.sync.suppression_window_ms, 2000);
        assert_eq!(config.sync.page_size, 1000);
        assert_eq!(config.sync.suppression_policy, SuppressionPolicy::DropAll);
        assert_eq!(config.import.default_daily_rate, 150_000);
        assert!(!config.client_id.is_empty());
    }

    #[test]
    fn test_partial_sections_override() {
        let config = AppConfig::from_toml(
            r#"
            database_path = "/tmp/ledger.db"
            client_id = "office-pc"

            [sync]
            suppression_window_ms = 500
            suppression_policy = "foreign_origin_passes"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.client_id, "office-pc");
        assert_eq!(config.sync.suppression_window(), Duration::from_millis(500));
        assert_eq!(config.sync.page_size, 1000);
        assert_eq!(
            config.sync.suppression_policy,
            SuppressionPolicy::ForeignOriginPasses
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Some(Path::new("/nonexistent/site-ledger.toml")))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("site-ledger.db"));
    }
}
