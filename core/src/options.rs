//! Typed collection options
//!
//! Every collection type declares the options its rule table reads (mint
//! toggles, year bounds, optional sub-series) together with their kind and
//! default. [`OptionSchema::resolve`] turns caller supplied values into a
//! complete [`OptionSet`], rejecting anything undeclared or mistyped.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name reserved for the per-year variable in predicates
pub const YEAR_VARIABLE: &str = "year";

/// Declared kind of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Checkbox style toggle
    Bool,
    /// Integer, optionally bounded and optionally open-ended
    Int,
    /// Free text
    Text,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("a boolean"),
            Self::Int => f.write_str("an integer"),
            Self::Text => f.write_str("a string"),
        }
    }
}

/// Option value
///
/// `Open` stands for an open-ended year ("still in production") and is
/// resolved to the caller's "as of" year at generation time. It serializes as
/// `null`; the text `"open"` is accepted on input for open-ended integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Text value
    Text(String),
    /// Open-ended year
    Open,
}

impl OptionValue {
    /// Short description of the value's kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
            Self::Text(_) => "a string",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "\"{s}\""),
            Self::Open => f.write_str("open"),
        }
    }
}

/// Declaration of one option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDecl {
    /// Value kind
    pub kind: OptionKind,
    /// Value used when the caller omits the option
    pub default: OptionValue,
    /// Inclusive lower bound for integers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Inclusive upper bound for integers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Whether an integer may be `open`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub open_ended: bool,
    /// User-facing label reference for the options UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OptionDecl {
    /// Boolean option with a default
    pub fn boolean(default: bool) -> Self {
        Self {
            kind: OptionKind::Bool,
            default: OptionValue::Bool(default),
            min: None,
            max: None,
            open_ended: false,
            label: None,
        }
    }

    /// Integer option with a default
    pub fn integer(default: OptionValue) -> Self {
        Self {
            kind: OptionKind::Int,
            default,
            min: None,
            max: None,
            open_ended: false,
            label: None,
        }
    }

    /// Text option with a default
    pub fn text(default: impl Into<String>) -> Self {
        Self {
            kind: OptionKind::Text,
            default: OptionValue::Text(default.into()),
            min: None,
            max: None,
            open_ended: false,
            label: None,
        }
    }

    /// Builder: set integer bounds
    #[must_use]
    pub fn with_bounds(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Builder: allow `open`
    #[must_use]
    pub fn open_ended(mut self) -> Self {
        self.open_ended = true;
        self
    }

    /// Builder: set the UI label reference
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Check a value against this declaration, normalizing `"open"`
    fn check(&self, name: &str, value: OptionValue) -> Result<OptionValue, ConfigError> {
        match (self.kind, value) {
            (OptionKind::Bool, v @ OptionValue::Bool(_)) => Ok(v),
            (OptionKind::Text, v @ OptionValue::Text(_)) => Ok(v),
            (OptionKind::Int, OptionValue::Int(v)) => {
                let min = self.min.unwrap_or(i64::MIN);
                let max = self.max.unwrap_or(i64::MAX);
                if v < min || v > max {
                    return Err(ConfigError::OutOfRange {
                        name: name.to_string(),
                        value: v,
                        min,
                        max,
                    });
                }
                Ok(OptionValue::Int(v))
            }
            (OptionKind::Int, OptionValue::Open) if self.open_ended => Ok(OptionValue::Open),
            (OptionKind::Int, OptionValue::Text(t))
                if self.open_ended && t.eq_ignore_ascii_case("open") =>
            {
                Ok(OptionValue::Open)
            }
            (kind, found) => Err(ConfigError::mismatch(
                name,
                if kind == OptionKind::Int && self.open_ended {
                    "an integer or open".to_string()
                } else {
                    kind.to_string()
                },
                found.kind_name(),
            )),
        }
    }
}

/// Recognized options of one collection type, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, OptionDecl>",
    into = "IndexMap<String, OptionDecl>"
)]
pub struct OptionSchema {
    options: IndexMap<String, OptionDecl>,
}

impl OptionSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an option
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDeclaration` if the name is reserved or
    /// already declared, or if the default does not satisfy the declaration.
    pub fn declare(&mut self, name: impl Into<String>, decl: OptionDecl) -> Result<(), ConfigError> {
        let name = name.into();
        if name == YEAR_VARIABLE {
            return Err(ConfigError::InvalidDeclaration {
                name,
                message: "name is reserved for the per-year variable".to_string(),
            });
        }
        if self.options.contains_key(&name) {
            return Err(ConfigError::InvalidDeclaration {
                name,
                message: "declared twice".to_string(),
            });
        }
        let default = decl.check(&name, decl.default.clone()).map_err(|e| {
            ConfigError::InvalidDeclaration {
                name: name.clone(),
                message: format!("default rejected: {e}"),
            }
        })?;
        self.options.insert(name, OptionDecl { default, ..decl });
        Ok(())
    }

    /// Look up a declaration
    pub fn get(&self, name: &str) -> Option<&OptionDecl> {
        self.options.get(name)
    }

    /// Whether `name` is declared
    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Iterate declarations in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionDecl)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether no options are declared
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Option set holding every default
    pub fn defaults(&self) -> OptionSet {
        OptionSet {
            values: self
                .options
                .iter()
                .map(|(name, decl)| (name.clone(), decl.default.clone()))
                .collect(),
        }
    }

    /// Resolve caller supplied values into a complete option set
    ///
    /// Missing options take their declared default. The result lists options
    /// in declaration order regardless of input order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKey` for undeclared names,
    /// `ConfigError::TypeMismatch` for values of the wrong kind and
    /// `ConfigError::OutOfRange` for integers outside their bounds.
    pub fn resolve(&self, raw: &IndexMap<String, OptionValue>) -> Result<OptionSet, ConfigError> {
        if let Some(unknown) = raw.keys().find(|name| !self.options.contains_key(*name)) {
            return Err(ConfigError::UnknownKey {
                name: unknown.clone(),
            });
        }

        let mut values = IndexMap::with_capacity(self.options.len());
        for (name, decl) in &self.options {
            let value = match raw.get(name) {
                Some(value) => decl.check(name, value.clone())?,
                None => decl.default.clone(),
            };
            values.insert(name.clone(), value);
        }
        Ok(OptionSet { values })
    }
}

impl TryFrom<IndexMap<String, OptionDecl>> for OptionSchema {
    type Error = ConfigError;

    fn try_from(options: IndexMap<String, OptionDecl>) -> Result<Self, Self::Error> {
        let mut schema = Self::new();
        for (name, decl) in options {
            schema.declare(name, decl)?;
        }
        Ok(schema)
    }
}

impl From<OptionSchema> for IndexMap<String, OptionDecl> {
    fn from(schema: OptionSchema) -> Self {
        schema.options
    }
}

/// Resolved option values of one collection instance
///
/// Immutable once the instance exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet {
    values: IndexMap<String, OptionValue>,
}

impl OptionSet {
    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Look up a boolean value
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Iterate values in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Raw values, suitable for re-resolving against a schema
    pub fn as_raw(&self) -> &IndexMap<String, OptionValue> {
        &self.values
    }
}
