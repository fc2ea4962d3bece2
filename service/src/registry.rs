//! Collection registry
//!
//! An immutable table from type id to [`CollectionTemplate`], built once and
//! then only read. Templates are held in `Arc`s so lookups hand out cheap
//! shared references that outlive the registry borrow.

use std::sync::Arc;

use coinslot_core::{CollectionTemplate, RegistryError};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::parser::CatalogLoader;

static GLOBAL: OnceCell<CollectionRegistry> = OnceCell::new();

/// Registered collection types, in display order
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    templates: IndexMap<String, Arc<CollectionTemplate>>,
}

impl CollectionRegistry {
    /// Build a registry from explicit templates
    ///
    /// With `self_check_year` set, every template is validated against that
    /// "as of" year before it is registered.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateType` if two templates share a type
    /// id and `RegistryError::InvalidTemplate` if a self-check fails.
    pub fn from_templates(
        templates: impl IntoIterator<Item = CollectionTemplate>,
        self_check_year: Option<i32>,
    ) -> std::result::Result<Self, RegistryError> {
        let mut map = IndexMap::new();
        for template in templates {
            if map.contains_key(&template.type_id) {
                return Err(RegistryError::DuplicateType(template.type_id));
            }
            if let Some(year) = self_check_year {
                template.self_check(year)?;
            }
            map.insert(template.type_id.clone(), Arc::new(template));
        }
        Ok(Self { templates: map })
    }

    /// Build the registry described by `config`
    ///
    /// The built-in catalog comes first when enabled, then each catalog
    /// directory in order.
    ///
    /// # Errors
    ///
    /// Returns catalog load errors, and registry errors as
    /// [`CollectionRegistry::from_templates`].
    pub fn build(config: &EngineConfig) -> Result<Self> {
        let loader = CatalogLoader::new();
        let mut templates = Vec::new();
        if config.include_builtin {
            templates.extend(loader.load_builtin()?);
        }
        for dir in &config.catalog_dirs {
            templates.extend(loader.load_dir(dir)?);
        }

        let check_year = config.strict_validation.then(|| config.as_of_year());
        let registry = Self::from_templates(templates, check_year)?;
        info!(
            types = registry.len(),
            validated = config.strict_validation,
            "collection registry built"
        );
        Ok(registry)
    }

    /// Process-wide registry, built from the default configuration on first
    /// use
    ///
    /// # Errors
    ///
    /// Returns the build error if the first initialization fails; a later
    /// call retries.
    pub fn global() -> Result<&'static Self> {
        GLOBAL.get_or_try_init(|| Self::build(&EngineConfig::default()))
    }

    /// Look up a template by type id
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownType` for unregistered ids.
    pub fn lookup(&self, type_id: &str) -> std::result::Result<Arc<CollectionTemplate>, RegistryError> {
        self.templates
            .get(type_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))
    }

    /// Look up a template by display index
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownIndex` when out of range.
    pub fn lookup_index(&self, index: usize) -> std::result::Result<Arc<CollectionTemplate>, RegistryError> {
        self.templates
            .get_index(index)
            .map(|(_, template)| Arc::clone(template))
            .ok_or(RegistryError::UnknownIndex(index))
    }

    /// Templates in display order
    pub fn types(&self) -> impl Iterator<Item = &CollectionTemplate> {
        self.templates.values().map(AsRef::as_ref)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template(type_id: &str) -> CollectionTemplate {
        serde_yaml::from_str(&format!(
            "type_id: {type_id}\nmetadata: {{ display_name: {type_id} }}\nrules: {{ pre: [{{ entries: [x] }}] }}\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_lookup_by_id_and_index() {
        let registry =
            CollectionRegistry::from_templates([template("a"), template("b")], Some(2024)).unwrap();
        assert_eq!(registry.lookup("b").unwrap().type_id, "b");
        assert_eq!(registry.lookup_index(0).unwrap().type_id, "a");
        assert_eq!(
            registry.lookup("c").unwrap_err(),
            RegistryError::UnknownType("c".to_string())
        );
        assert_eq!(
            registry.lookup_index(2).unwrap_err(),
            RegistryError::UnknownIndex(2)
        );
    }

    #[test]
    fn test_duplicate_type_is_rejected() {
        let err = CollectionRegistry::from_templates([template("a"), template("a")], None).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType("a".to_string()));
    }

    #[test]
    fn test_global_registry_has_builtin_catalog() {
        let registry = CollectionRegistry::global().unwrap();
        assert_eq!(registry.len(), CatalogLoader::new().builtin_count());
        assert!(registry.lookup("pennies").is_ok());
        assert!(registry.lookup("washington_quarters").is_ok());
    }
}
