//! # coinslot-service
//!
//! Catalog loading, the collection registry and the collection service
//! facade over [`coinslot_core`].
//!
//! ```no_run
//! use coinslot_service::{CollectionService, EngineConfig};
//! use indexmap::IndexMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = CollectionService::from_config(&EngineConfig::default())?;
//! let pennies = service.create_instance("pennies", "My pennies", &IndexMap::new())?;
//! let (pennies, added) = service.open_and_migrate(pennies)?;
//! assert_eq!(added, 0);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod parser;
pub mod registry;

pub use api::CollectionService;
pub use config::EngineConfig;
pub use error::{Result, ServiceError};
pub use parser::{CatalogLoader, TemplateParser};
pub use registry::CollectionRegistry;
