//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [cache]                  # catalog cache toggle
//! [retention]              # background sweeper
//! [store]                  # backing store selection
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default retention threshold, in years.
pub const DEFAULT_RETENTION_YEARS: u32 = 10;

/// Default time between sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default SQLite busy timeout, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default SQLite database file name.
pub const DEFAULT_DB_FILE: &str = "folio.db";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// override that only touches `[retention]`) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Catalog cache settings.
    pub cache: Option<CacheConfig>,

    /// Retention sweeper settings.
    pub retention: Option<RetentionConfig>,

    /// Backing store settings.
    pub store: Option<StoreConfig>,
}

impl FolioConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section present at its default, for `config init`.
    pub fn with_defaults() -> Self {
        Self {
            cache: Some(CacheConfig::default()),
            retention: Some(RetentionConfig::default()),
            store: Some(StoreConfig::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: FolioConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.retention.is_some() {
            self.retention = other.retention;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
    }

    /// Effective cache settings.
    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    /// Effective retention settings.
    pub fn retention(&self) -> RetentionConfig {
        self.retention.clone().unwrap_or_default()
    }

    /// Effective store settings.
    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    /// Reject values the runtime cannot use.
    pub fn validate(&self) -> Result<()> {
        let retention = self.retention();
        if retention.years == 0 {
            return Err(ConfigError::Invalid {
                field: "retention.years".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if retention.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "retention.sweep_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.store().backend == StoreBackend::Sqlite && self.store().path.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "store.path".to_string(),
                reason: "sqlite backend needs a database path".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Catalog cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false, every read goes to the store.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retention
// ─────────────────────────────────────────────────────────────────────────────

/// Retention sweeper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Whether `serve` runs the background sweeper.
    pub enabled: bool,
    /// Books published more than this many years ago are purged.
    pub years: u32,
    /// Seconds between sweeps.
    pub sweep_interval_secs: u64,
    /// Log what would be purged without deleting.
    pub dry_run: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            years: DEFAULT_RETENTION_YEARS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            dry_run: false,
        }
    }
}

impl RetentionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Which backing store to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// On-disk SQLite database.
    #[default]
    Sqlite,
    /// Process-local map; contents are lost on exit.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Backing store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file. Relative paths resolve against the config directory.
    pub path: PathBuf,
    /// How long SQLite waits on a locked database before giving up.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Database path, with relative paths joined onto `base`.
    pub fn resolve_path(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }
}
