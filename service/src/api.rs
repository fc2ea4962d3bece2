//! Collection service facade
//!
//! The operations a host application (UI, storage layer) calls: create a
//! collection, open and upgrade a persisted one, and the read-only queries
//! needed to render it.

use std::sync::Arc;

use coinslot_core::{
    CollectionInstance, MigrationCheckpoint, MigrationEngine, MigrationReport, NoCheckpoint,
    OptionSchema, OptionValue, PersistedCollection, Slot, SlotSpec,
};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::CollectionRegistry;

/// Entry point for collection operations
#[derive(Debug, Clone)]
pub struct CollectionService {
    registry: Arc<CollectionRegistry>,
    as_of_year: i32,
}

impl CollectionService {
    /// Service over `registry`, resolving open-ended ranges at `as_of_year`
    pub fn new(registry: Arc<CollectionRegistry>, as_of_year: i32) -> Self {
        Self {
            registry,
            as_of_year,
        }
    }

    /// Build the registry described by `config` and wrap it
    ///
    /// # Errors
    ///
    /// Returns registry build errors.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let registry = CollectionRegistry::build(config)?;
        Ok(Self::new(Arc::new(registry), config.as_of_year()))
    }

    /// Underlying registry
    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// "As of" year used by this service
    pub fn as_of_year(&self) -> i32 {
        self.as_of_year
    }

    /// Create a collection of `type_id` at the template's latest version
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownType` for unregistered types and
    /// `ConfigError` for invalid options. Nothing is created on error.
    pub fn create_instance(
        &self,
        type_id: &str,
        name: &str,
        raw_options: &IndexMap<String, OptionValue>,
    ) -> Result<CollectionInstance> {
        let template = self.registry.lookup(type_id)?;
        Ok(CollectionInstance::create(&template, name, raw_options, self.as_of_year)?)
    }

    /// Canonical slot list for `type_id` under `raw_options`
    ///
    /// # Errors
    ///
    /// As [`CollectionService::create_instance`].
    pub fn generate(
        &self,
        type_id: &str,
        raw_options: &IndexMap<String, OptionValue>,
    ) -> Result<Vec<SlotSpec>> {
        let template = self.registry.lookup(type_id)?;
        let options = template
            .options
            .resolve(raw_options)
            .map_err(coinslot_core::CollectionError::from)?;
        Ok(template
            .generate(&options, self.as_of_year)
            .map_err(coinslot_core::CollectionError::from)?)
    }

    /// Upgrade `instance` to its template's latest version
    ///
    /// Returns the upgraded instance and the number of slots added.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownType` if the type is gone and
    /// `MigrationError` if an upgrade step fails.
    pub fn open_and_migrate(&self, instance: CollectionInstance) -> Result<(CollectionInstance, usize)> {
        let (instance, report) = self.open_and_migrate_with(instance, &mut NoCheckpoint)?;
        Ok((instance, report.added_count()))
    }

    /// Upgrade `instance`, calling `checkpoint` after every applied delta
    ///
    /// # Errors
    ///
    /// As [`CollectionService::open_and_migrate`]. After a checkpoint
    /// failure the host's last checkpointed state is the one to keep.
    pub fn open_and_migrate_with(
        &self,
        mut instance: CollectionInstance,
        checkpoint: &mut dyn MigrationCheckpoint,
    ) -> Result<(CollectionInstance, MigrationReport)> {
        let template = self.registry.lookup(&instance.template_id)?;
        let engine = MigrationEngine::new(&template);
        if !engine.needs_migration(&instance) {
            debug!(type_id = %template.type_id, name = %instance.name, "collection is current");
        }
        let report = engine.migrate_with(&mut instance, self.as_of_year, checkpoint)?;
        Ok((instance, report))
    }

    /// Rebuild a persisted collection and upgrade it
    ///
    /// # Errors
    ///
    /// Returns decode errors from the persisted form and upgrade errors as
    /// [`CollectionService::open_and_migrate_with`].
    pub fn open_persisted(
        &self,
        record: PersistedCollection,
        checkpoint: &mut dyn MigrationCheckpoint,
    ) -> Result<(CollectionInstance, MigrationReport)> {
        let template = self.registry.lookup(&record.type_id)?;
        let instance = CollectionInstance::from_persisted(&template, record)?;
        let (instance, report) = self.open_and_migrate_with(instance, checkpoint)?;
        if report.added_count() > 0 || report.renamed_count() > 0 {
            info!(
                type_id = %report.type_id,
                name = %instance.name,
                added = report.added_count(),
                renamed = report.renamed_count(),
                "persisted collection upgraded"
            );
        }
        Ok((instance, report))
    }

    /// Slots of `instance` in display order
    pub fn list_slots<'a>(&self, instance: &'a CollectionInstance) -> Vec<&'a Slot> {
        instance.slots().collect()
    }

    /// Option schema of `type_id`, for rendering option toggles
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownType` for unregistered types.
    pub fn option_schema(&self, type_id: &str) -> Result<OptionSchema> {
        Ok(self.registry.lookup(type_id)?.options.clone())
    }

    /// Image to display for `slot` of a collection of `type_id`
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownType` for unregistered types.
    pub fn slot_image(&self, type_id: &str, slot: &Slot) -> Result<Option<String>> {
        let template = self.registry.lookup(type_id)?;
        Ok(template.slot_image(slot).map(str::to_string))
    }
}
