//! Service level errors

use std::path::PathBuf;

use coinslot_core::{CollectionError, RegistryError};
use thiserror::Error;

/// Result type alias using [`ServiceError`]
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors raised while loading catalogs, configuration or persisted files
#[derive(Debug, Error)]
pub enum ServiceError {
    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Catalog document could not be decoded
    #[error("catalog parse error in {origin} at {location}: {message}")]
    Catalog {
        /// File name or built-in catalog name
        origin: String,
        /// `line x, column y`, or `unknown location`
        location: String,
        /// Decoder message
        message: String,
    },

    /// Configuration file could not be decoded
    #[error("configuration error in {path}: {source}")]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Persisted collection file could not be decoded or encoded
    #[error("collection file error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog directory walk failed
    #[error("catalog directory error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Core operation failed
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl ServiceError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a catalog decode error from a YAML error
    pub fn yaml(origin: impl Into<String>, error: &serde_yaml::Error) -> Self {
        Self::Catalog {
            origin: origin.into(),
            location: error.location().map_or_else(
                || "unknown location".to_string(),
                |l| format!("line {}, column {}", l.line(), l.column()),
            ),
            message: error.to_string(),
        }
    }

    /// Create a catalog decode error from a JSON error
    pub fn json_catalog(origin: impl Into<String>, error: &serde_json::Error) -> Self {
        Self::Catalog {
            origin: origin.into(),
            location: format!("line {}, column {}", error.line(), error.column()),
            message: error.to_string(),
        }
    }
}

impl From<RegistryError> for ServiceError {
    fn from(error: RegistryError) -> Self {
        Self::Collection(error.into())
    }
}

impl From<coinslot_core::MigrationError> for ServiceError {
    fn from(error: coinslot_core::MigrationError) -> Self {
        Self::Collection(error.into())
    }
}
