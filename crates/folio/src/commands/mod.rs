//! CLI command handlers.

pub mod books;
pub mod config;
pub mod serve;
pub mod sweep;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use folio_catalog::{CatalogService, SharedStore, SweeperConfig};
use folio_config::{FolioConfig, StoreBackend};
use folio_store::{MemoryStore, SqliteStore};
use tracing::info;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: FolioConfig,
    /// User config directory; relative store paths resolve against it.
    pub config_dir: Option<PathBuf>,
    /// Config files that were loaded, lowest precedence first.
    pub sources: Vec<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Open the configured backing store.
    pub fn open_store(&self) -> Result<SharedStore> {
        let store = self.config.store();
        match store.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Sqlite => {
                let base = self
                    .config_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                let path = store.resolve_path(&base);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create store directory {}", parent.display())
                    })?;
                }
                let sqlite = SqliteStore::open_with_timeout(&path, store.busy_timeout())
                    .with_context(|| format!("failed to open store at {}", path.display()))?;
                Ok(Arc::new(sqlite))
            }
        }
    }

    /// Build the catalog over the configured store, cached unless disabled.
    pub fn open_catalog(&self) -> Result<Arc<CatalogService>> {
        let store = self.open_store()?;
        let catalog = if self.config.cache().enabled {
            CatalogService::with_memory_cache(store)
        } else {
            info!("Catalog cache disabled");
            CatalogService::uncached(store)
        };
        Ok(Arc::new(catalog))
    }

    /// Sweeper settings from the `[retention]` section.
    pub fn sweeper_config(&self) -> SweeperConfig {
        let retention = self.config.retention();
        SweeperConfig::new()
            .with_retention_years(retention.years)
            .with_interval(retention.sweep_interval())
            .with_dry_run(retention.dry_run)
    }
}
