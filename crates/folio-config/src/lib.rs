//! Configuration system for the Folio catalog.
//!
//! Provides TOML-based configuration with:
//! - Cache toggle (`[cache]`)
//! - Retention sweeper threshold and schedule (`[retention]`)
//! - Backing store selection (`[store]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, config_path, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
