//! Collection templates and their delta history
//!
//! A [`CollectionTemplate`] bundles everything the engine knows about one
//! collection type: display metadata, the option schema, the rule table and
//! the version-tagged [`Delta`]s describing what each catalog revision added.
//! Templates are immutable once built and shared read-only.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeneratorError, RegistryError};
use crate::generator;
use crate::options::{OptionKind, OptionSchema, OptionSet, OptionValue};
use crate::rules::{RuleTable, YearBound};
use crate::types::{Slot, SlotKey, SlotSpec};

/// Display metadata of a collection type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Name shown to collectors
    pub display_name: String,
    /// Attribution string reference for catalog images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    /// Image representing the whole collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_image: Option<String>,
    /// Image used for slots without one of their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obverse_image: Option<String>,
}

/// Slots a delta is responsible for introducing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaAddition {
    /// One exact key
    Key(SlotKey),
    /// Every canonical key with this identifier, whatever its mint
    Identifier(String),
    /// Every canonical key emitted for this year
    Year(i32),
}

impl fmt::Display for DeltaAddition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key {key}"),
            Self::Identifier(identifier) => write!(f, "identifier \"{identifier}\""),
            Self::Year(year) => write!(f, "year {year}"),
        }
    }
}

/// Identity-preserving text correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFixup {
    /// Rename an identifier across all mints
    Identifier {
        /// Old text
        from: String,
        /// New text
        to: String,
    },
    /// Rename a mint label across all identifiers
    Mint {
        /// Old text
        from: String,
        /// New text
        to: String,
    },
    /// Rename one exact key
    Key {
        /// Old key
        from: SlotKey,
        /// New key
        to: SlotKey,
    },
}

/// One catalog revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Version stamped on instances once this delta is applied
    pub version: u32,
    /// What changed, for logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Slots introduced
    #[serde(default)]
    pub adds: Vec<DeltaAddition>,
    /// Text corrections applied after the additions
    #[serde(default)]
    pub fixups: Vec<TextFixup>,
}

fn default_base_version() -> u32 {
    1
}

/// Everything the engine knows about one collection type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionTemplate {
    /// Stable type id
    pub type_id: String,
    /// Display metadata
    pub metadata: TemplateMetadata,
    /// Recognized options
    #[serde(default)]
    pub options: OptionSchema,
    /// Enumeration policy
    pub rules: RuleTable,
    /// Version of instances created before any delta existed
    #[serde(default = "default_base_version")]
    pub base_version: u32,
    /// Catalog revisions, ordered by version
    #[serde(default)]
    pub deltas: Vec<Delta>,
}

impl CollectionTemplate {
    /// Version stamped on newly created instances
    pub fn latest_version(&self) -> u32 {
        self.deltas
            .last()
            .map_or(self.base_version, |d| d.version)
    }

    /// Most recent year named by a whole-year delta
    pub fn newest_delta_year(&self) -> Option<i32> {
        self.deltas
            .iter()
            .flat_map(|d| d.adds.iter())
            .filter_map(|a| match a {
                DeltaAddition::Year(year) => Some(*year),
                _ => None,
            })
            .max()
    }

    /// "As of" year actually used for generation
    ///
    /// Never earlier than the newest whole-year delta, so an instance stamped
    /// with the latest version always contains that delta's year.
    pub fn effective_as_of(&self, as_of_year: i32) -> i32 {
        self.newest_delta_year()
            .map_or(as_of_year, |year| year.max(as_of_year))
    }

    /// Generate the canonical slot list for `options`
    ///
    /// # Errors
    ///
    /// Propagates any `GeneratorError` from the interpreter.
    pub fn generate(&self, options: &OptionSet, as_of_year: i32) -> Result<Vec<SlotSpec>, GeneratorError> {
        generator::generate(&self.rules, options, self.effective_as_of(as_of_year))
    }

    /// Image to show for a slot
    ///
    /// A collector's custom image wins, then the catalog image of the slot,
    /// then the template's obverse image.
    pub fn slot_image<'a>(&'a self, slot: &'a Slot) -> Option<&'a str> {
        slot.state
            .custom_image
            .as_deref()
            .or(slot.image.as_deref())
            .or(self.metadata.obverse_image.as_deref())
    }

    /// Earliest year the sweep can start at
    pub fn earliest_year(&self) -> Option<i64> {
        self.rules
            .range
            .as_ref()
            .and_then(|r| r.start.lowest(&self.options))
    }

    /// Latest year the sweep can reach
    ///
    /// A literal stop year closes the range. Open and option-driven stops run
    /// to the effective "as of" year.
    pub fn latest_year(&self, as_of_year: i32) -> i64 {
        match self.rules.range.as_ref().map(|r| &r.stop) {
            Some(YearBound::Year(stop)) => i64::from(*stop),
            _ => i64::from(self.effective_as_of(as_of_year)),
        }
    }

    /// Whether a whole-year delta for `year` lies inside the sweep
    pub fn covers_year(&self, year: i32, as_of_year: i32) -> bool {
        let year = i64::from(year);
        self.earliest_year()
            .is_some_and(|earliest| earliest <= year && year <= self.latest_year(as_of_year))
    }

    /// Option set with every boolean option switched on
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidTemplate` if the schema rejects it.
    pub fn all_enabled_options(&self) -> Result<OptionSet, RegistryError> {
        let raw: IndexMap<String, OptionValue> = self
            .options
            .iter()
            .filter(|(_, decl)| decl.kind == OptionKind::Bool)
            .map(|(name, _)| (name.to_string(), OptionValue::Bool(true)))
            .collect();
        self.options
            .resolve(&raw)
            .map_err(|e| RegistryError::invalid(&self.type_id, e.to_string()))
    }

    /// Build-time validation of the whole template
    ///
    /// Checks predicates and labels against the option schema, delta
    /// ordering, that every delta selector and fix-up target names something
    /// the rule table can produce, and that generation succeeds with default
    /// options and with every boolean option enabled.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidTemplate` for the first failed check.
    pub fn self_check(&self, as_of_year: i32) -> Result<(), RegistryError> {
        let invalid = |message: String| RegistryError::invalid(&self.type_id, message);

        self.rules.check(&self.options).map_err(|e| invalid(e.to_string()))?;

        let mut previous = self.base_version;
        for delta in &self.deltas {
            if delta.version <= previous {
                return Err(invalid(format!(
                    "delta v{} does not follow v{previous}",
                    delta.version
                )));
            }
            previous = delta.version;
            self.check_delta(delta, as_of_year).map_err(invalid)?;
        }

        let defaults = self.options.defaults();
        let default_count = self
            .generate(&defaults, as_of_year)
            .map_err(|e| invalid(format!("default options: {e}")))?
            .len();
        let all = self.all_enabled_options()?;
        let full_count = self
            .generate(&all, as_of_year)
            .map_err(|e| invalid(format!("all options enabled: {e}")))?
            .len();

        debug!(
            type_id = %self.type_id,
            default_count,
            full_count,
            latest_version = self.latest_version(),
            "template validated"
        );
        Ok(())
    }

    fn check_delta(&self, delta: &Delta, as_of_year: i32) -> Result<(), String> {
        for add in &delta.adds {
            let producible = match add {
                DeltaAddition::Key(key) => self.rules.can_emit(&key.identifier, &key.mint),
                DeltaAddition::Identifier(identifier) => {
                    self.rules.declares_identifier(identifier)
                }
                DeltaAddition::Year(year) => self.covers_year(*year, as_of_year),
            };
            if !producible {
                return Err(format!(
                    "delta v{} adds {add}, which the rule table cannot produce",
                    delta.version
                ));
            }
        }
        for fixup in &delta.fixups {
            let producible = match fixup {
                TextFixup::Identifier { to, .. } => self.rules.declares_identifier(to),
                TextFixup::Mint { to, .. } => self.rules.groups().any(|(g, _)| {
                    g.variants.iter().any(|v| v.mint.matches(to))
                }),
                TextFixup::Key { to, .. } => self.rules.can_emit(&to.identifier, &to.mint),
            };
            if !producible {
                return Err(format!(
                    "delta v{} renames to text the rule table cannot produce",
                    delta.version
                ));
            }
        }
        Ok(())
    }
}
