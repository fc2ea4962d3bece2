//! Collection instances

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::options::{OptionSet, OptionValue};
use crate::store::SlotStore;
use crate::template::CollectionTemplate;
use crate::types::Slot;

/// One collector's copy of a collection type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInstance {
    /// Collector chosen name
    pub name: String,
    /// Type id of the template it was created from
    pub template_id: String,
    /// Options resolved at creation time
    pub options: OptionSet,
    /// Last delta version applied
    pub schema_version: u32,
    /// Ordered slots
    pub store: SlotStore,
}

impl CollectionInstance {
    /// Create an instance at the template's latest version
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::Config` for invalid options and
    /// `CollectionError::Generator` if generation fails.
    pub fn create(
        template: &CollectionTemplate,
        name: impl Into<String>,
        raw_options: &IndexMap<String, OptionValue>,
        as_of_year: i32,
    ) -> Result<Self> {
        let options = template.options.resolve(raw_options)?;
        let specs = template.generate(&options, as_of_year)?;
        let store = SlotStore::from_specs(&specs)?;
        let instance = Self {
            name: name.into(),
            template_id: template.type_id.clone(),
            options,
            schema_version: template.latest_version(),
            store,
        };
        info!(
            type_id = %instance.template_id,
            name = %instance.name,
            slots = instance.store.len(),
            schema_version = instance.schema_version,
            "collection created"
        );
        Ok(instance)
    }

    /// Slots in order
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.store.all()
    }
}
