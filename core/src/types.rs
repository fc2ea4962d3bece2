//! Slot identity and per-slot state
//!
//! A [`SlotKey`] is the natural identity of one collectible variant. The
//! generator produces [`SlotSpec`]s; a collection instance holds [`Slot`]s,
//! which add the mutable state a collector edits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a slot within one collection instance
///
/// Keys order lexically by identifier then mint, which is only used for
/// deterministic sets; canonical order comes from the generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    /// Year, design or series name (e.g. "1943", "Yellowstone")
    pub identifier: String,
    /// Mint mark or sub-variant label, empty for none
    #[serde(default)]
    pub mint: String,
}

impl SlotKey {
    /// Create a new key
    pub fn new(identifier: impl Into<String>, mint: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            mint: mint.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mint.is_empty() {
            write!(f, "\"{}\"", self.identifier)
        } else {
            write!(f, "\"{} {}\"", self.identifier, self.mint)
        }
    }
}

/// One generated slot in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Slot identity
    pub key: SlotKey,
    /// Zero-based canonical rank
    pub order: usize,
    /// Image reference chosen by the rule table
    pub image: Option<String>,
    /// Year that produced the slot, `None` for static entries
    pub year: Option<i32>,
}

/// State a collector edits on a slot
///
/// Migration never writes to any of these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    /// Whether the collector owns this variant
    pub in_collection: bool,
    /// Free-form notes
    pub notes: String,
    /// Number of pieces owned
    pub quantity: u32,
    /// Grade label
    pub grade: String,
    /// Collector supplied image replacing the catalog image
    pub custom_image: Option<String>,
}

/// A slot held by a collection instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot identity
    pub key: SlotKey,
    /// Position in the instance, dense from zero
    pub order: usize,
    /// Catalog image reference
    pub image: Option<String>,
    /// Collector state
    pub state: UserState,
}

impl Slot {
    /// Create a slot with default user state from a generated spec
    pub fn from_spec(spec: &SlotSpec) -> Self {
        Self {
            key: spec.key.clone(),
            order: spec.order,
            image: spec.image.clone(),
            state: UserState::default(),
        }
    }
}
