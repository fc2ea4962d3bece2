//! # coinslot-core
//!
//! Slot generation and migration for coin collections.
//!
//! A collection type is described by a [`CollectionTemplate`]: an option
//! schema, a declarative [`RuleTable`] and a history of version-tagged
//! [`Delta`]s. [`generate`] turns a rule table and an [`OptionSet`] into the
//! canonical ordered slot list. [`CollectionInstance::create`] builds a fresh
//! collection from it, and [`MigrationEngine`] brings a persisted collection
//! up to date by inserting only the slots each newer delta introduces.
//!
//! ## Example
//!
//! ```
//! use coinslot_core::{CollectionInstance, CollectionTemplate, MigrationEngine};
//! use indexmap::IndexMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template: CollectionTemplate = serde_json::from_str(
//!     r#"{
//!         "type_id": "dimes",
//!         "metadata": { "display_name": "Dimes" },
//!         "rules": {
//!             "range": { "start": 2018, "stop": "open" },
//!             "series": [{ "name": "business" }]
//!         },
//!         "deltas": [{ "version": 2, "adds": [{ "year": 2021 }] }]
//!     }"#,
//! )?;
//!
//! let mut instance = CollectionInstance::create(&template, "Dimes", &IndexMap::new(), 2021)?;
//! assert_eq!(instance.store.len(), 4);
//! assert_eq!(instance.schema_version, 2);
//!
//! let report = MigrationEngine::new(&template).migrate(&mut instance, 2021)?;
//! assert_eq!(report.added_count(), 0);
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod error;
pub mod generator;
pub mod instance;
pub mod migration;
pub mod options;
pub mod parser;
pub mod predicate;
pub mod record;
pub mod rules;
pub mod store;
pub mod template;
pub mod types;

pub use error::{
    CollectionError, ConfigError, GeneratorError, MigrationError, RegistryError, Result,
    StoreError,
};
pub use generator::{generate, resolve_range, ResolvedRange};
pub use instance::CollectionInstance;
pub use migration::{
    DeltaOutcome, MigrationCheckpoint, MigrationEngine, MigrationReport, NoCheckpoint,
};
pub use options::{OptionDecl, OptionKind, OptionSchema, OptionSet, OptionValue};
pub use predicate::{EvalContext, Predicate};
pub use record::{PersistedCollection, SlotRecord};
pub use rules::{RuleGroup, RuleTable, YearBound, YearOverride, YearRange};
pub use store::SlotStore;
pub use template::{CollectionTemplate, Delta, DeltaAddition, TemplateMetadata, TextFixup};
pub use types::{Slot, SlotKey, SlotSpec, UserState};
