//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file and a
//! missing file behave the same.
//!
//! ```toml
//! as_of_year = 2024
//! catalog_dirs = ["/etc/coinslot/catalog"]
//! include_builtin = true
//! strict_validation = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Configuration of the registry and the collection service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Year used to resolve open-ended ranges, defaults to the current year
    pub as_of_year: Option<i32>,
    /// Extra catalog directories, loaded after the built-in catalog
    pub catalog_dirs: Vec<PathBuf>,
    /// Whether to register the built-in catalog
    pub include_builtin: bool,
    /// Whether to run template self-checks when building the registry
    pub strict_validation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            as_of_year: None,
            catalog_dirs: Vec::new(),
            include_builtin: true,
            strict_validation: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Io` if the file cannot be read and
    /// `ServiceError::Config` if it is not valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ServiceError::io(path, e))?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ServiceError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        // Relative catalog directories are relative to the config file
        if let Some(parent) = path.parent() {
            config.catalog_dirs = config
                .catalog_dirs
                .into_iter()
                .map(|dir| if dir.is_relative() { parent.join(dir) } else { dir })
                .collect();
        }
        Ok(config)
    }

    /// "As of" year to use for generation and migration
    pub fn as_of_year(&self) -> i32 {
        self.as_of_year.unwrap_or_else(current_year)
    }
}

/// Current calendar year in local time
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
