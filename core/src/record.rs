//! Flat persisted form of a collection instance
//!
//! Hosts store a collection as one header plus one row per slot. The option
//! set travels as a JSON snapshot so the header stays a fixed set of scalar
//! columns regardless of the collection type.

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};
use crate::instance::CollectionInstance;
use crate::options::OptionValue;
use crate::store::SlotStore;
use crate::template::CollectionTemplate;
use crate::types::{Slot, SlotKey, UserState};

/// One persisted slot row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Display position, dense from zero
    pub order: usize,
    /// Slot identifier, usually the year
    pub identifier: String,
    /// Mint qualifier, empty for the plain issue
    pub mint: String,
    /// Catalog image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether the collector owns the coin
    pub in_collection: bool,
    /// Free-form collector notes
    #[serde(default)]
    pub notes: String,
    /// Number of coins held
    #[serde(default)]
    pub quantity: u32,
    /// Grade as entered by the collector
    #[serde(default)]
    pub grade: String,
    /// Collector-supplied image overriding the catalog image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,
}

impl From<&Slot> for SlotRecord {
    fn from(slot: &Slot) -> Self {
        Self {
            order: slot.order,
            identifier: slot.key.identifier.clone(),
            mint: slot.key.mint.clone(),
            image: slot.image.clone(),
            in_collection: slot.state.in_collection,
            notes: slot.state.notes.clone(),
            quantity: slot.state.quantity,
            grade: slot.state.grade.clone(),
            custom_image: slot.state.custom_image.clone(),
        }
    }
}

impl From<SlotRecord> for Slot {
    fn from(record: SlotRecord) -> Self {
        Self {
            key: SlotKey::new(record.identifier, record.mint),
            order: record.order,
            image: record.image,
            state: UserState {
                in_collection: record.in_collection,
                notes: record.notes,
                quantity: record.quantity,
                grade: record.grade,
                custom_image: record.custom_image,
            },
        }
    }
}

/// Persisted collection header and rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCollection {
    /// Collector-chosen collection name
    pub name: String,
    /// Type id of the template the collection was created from
    pub type_id: String,
    /// Newest catalog delta applied to the rows
    pub schema_version: u32,
    /// Resolved options as a JSON object
    pub option_snapshot: String,
    /// Slot rows in display order
    pub rows: Vec<SlotRecord>,
}

impl CollectionInstance {
    /// Flatten into the persisted form
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::Snapshot` if the option set cannot be
    /// encoded.
    pub fn to_persisted(&self) -> Result<PersistedCollection> {
        Ok(PersistedCollection {
            name: self.name.clone(),
            type_id: self.template_id.clone(),
            schema_version: self.schema_version,
            option_snapshot: serde_json::to_string(&self.options)?,
            rows: self.slots().map(SlotRecord::from).collect(),
        })
    }

    /// Rebuild an instance from its persisted form
    ///
    /// The option snapshot is re-resolved against the template's schema, so
    /// options added to the template since the snapshot pick up defaults.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::Migration` if `record` belongs to another
    /// type, `CollectionError::Snapshot` or `CollectionError::Config` for an
    /// unreadable snapshot, and `CollectionError::Store` if the rows break
    /// dense ordering or key uniqueness.
    pub fn from_persisted(template: &CollectionTemplate, record: PersistedCollection) -> Result<Self> {
        if record.type_id != template.type_id {
            return Err(MigrationError::TemplateMismatch {
                expected: template.type_id.clone(),
                found: record.type_id,
            }
            .into());
        }
        let raw: indexmap::IndexMap<String, OptionValue> =
            serde_json::from_str(&record.option_snapshot)?;
        let options = template.options.resolve(&raw)?;
        let store = SlotStore::from_slots(record.rows.into_iter().map(Slot::from).collect())?;
        Ok(Self {
            name: record.name,
            template_id: record.type_id,
            options,
            schema_version: record.schema_version,
            store,
        })
    }
}
