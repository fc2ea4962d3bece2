//! Declarative rule tables
//!
//! A rule table describes, as data, how one collection type enumerates its
//! slots: static groups emitted before and after the year sweep, the year
//! range itself, the sub-series evaluated for every year, and per-year
//! overrides for type splits and commemorative substitutions. The
//! [`generator`](crate::generator) module interprets it.
//!
//! ```yaml
//! range: { start: start_year, stop: stop_year, skip: "year in [1905..=1920]" }
//! series:
//!   - name: business
//!     when: include_p
//!     variants: [""]
//!   - name: denver
//!     when: include_d
//!     years: "year not in [1965..=1967]"
//!     variants: ["D"]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::options::{OptionKind, OptionSchema, OptionSet, OptionValue};
use crate::predicate::Predicate;

/// Placeholder replaced by the current year in identifiers and mints
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Identifier or mint text, optionally containing `{year}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Create a label
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The `{year}` label
    pub fn year() -> Self {
        Self(YEAR_PLACEHOLDER.to_string())
    }

    /// Raw text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the label depends on the current year
    pub fn is_templated(&self) -> bool {
        self.0.contains(YEAR_PLACEHOLDER)
    }

    /// Substitute the current year
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` if the label needs a year and
    /// none is bound.
    pub fn render(&self, year: Option<i32>) -> Result<String, GeneratorError> {
        if !self.is_templated() {
            return Ok(self.0.clone());
        }
        match year {
            Some(year) => Ok(self.0.replace(YEAR_PLACEHOLDER, &year.to_string())),
            None => Err(GeneratorError::invalid_rule(
                &self.0,
                "label uses {year} outside the year sweep",
            )),
        }
    }

    /// Whether `text` is something this label can render to
    pub fn matches(&self, text: &str) -> bool {
        let Some((prefix, suffix)) = self.0.split_once(YEAR_PLACEHOLDER) else {
            return self.0 == text;
        };
        text.len() > prefix.len() + suffix.len()
            && text.starts_with(prefix)
            && text.ends_with(suffix)
            && text[prefix.len()..text.len() - suffix.len()]
                .parse::<i32>()
                .is_ok()
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntrySource {
    Name(String),
    Full {
        identifier: Label,
        #[serde(default)]
        image: Option<String>,
    },
}

/// One identifier emitted by a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntrySource")]
pub struct Entry {
    /// Identifier label
    pub identifier: Label,
    /// Image for every slot of this identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Entry {
    /// Entry without an image
    pub fn named(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Label::new(identifier),
            image: None,
        }
    }
}

impl From<EntrySource> for Entry {
    fn from(source: EntrySource) -> Self {
        match source {
            EntrySource::Name(name) => Self::named(name),
            EntrySource::Full { identifier, image } => Self { identifier, image },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariantSource {
    Mint(String),
    Full {
        #[serde(default)]
        when: Predicate,
        #[serde(default)]
        mint: Label,
        #[serde(default)]
        image: Option<String>,
    },
}

/// Conditional mint or sub-variant emitted for each entry of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariantSource")]
pub struct VariantRule {
    /// Condition on options and, inside the sweep, the year
    #[serde(default)]
    pub when: Predicate,
    /// Mint label
    #[serde(default)]
    pub mint: Label,
    /// Image override for this variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl VariantRule {
    /// Unconditional variant
    pub fn plain(mint: impl Into<String>) -> Self {
        Self {
            when: Predicate::always(),
            mint: Label::new(mint),
            image: None,
        }
    }
}

impl From<VariantSource> for VariantRule {
    fn from(source: VariantSource) -> Self {
        match source {
            VariantSource::Mint(mint) => Self::plain(mint),
            VariantSource::Full { when, mint, image } => Self { when, mint, image },
        }
    }
}

fn year_entries() -> Vec<Entry> {
    vec![Entry {
        identifier: Label::year(),
        image: None,
    }]
}

fn plain_variants() -> Vec<VariantRule> {
    vec![VariantRule::plain("")]
}

/// Emission unit shared by static groups, sub-series and override bodies
///
/// Emits `entries x variants`, entry-major, for every variant whose
/// predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// Name used in logs and errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Enabling condition
    #[serde(default)]
    pub when: Predicate,
    /// Year condition, only meaningful inside the sweep
    #[serde(default)]
    pub years: Predicate,
    /// Identifiers, `{year}` by default
    #[serde(default = "year_entries")]
    pub entries: Vec<Entry>,
    /// Images keyed by rendered identifier, consulted before `image`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub images: IndexMap<String, String>,
    /// Fallback image for the whole group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Mints, a single empty mint by default
    #[serde(default = "plain_variants")]
    pub variants: Vec<VariantRule>,
}

impl RuleGroup {
    /// Display name for diagnostics
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Whether this group can ever emit `(identifier, mint)`
    pub fn can_emit(&self, identifier: &str, mint: &str) -> bool {
        self.entries.iter().any(|e| e.identifier.matches(identifier))
            && self.variants.iter().any(|v| v.mint.matches(mint))
    }

    fn check(&self, schema: &OptionSchema, in_sweep: bool) -> Result<(), GeneratorError> {
        self.when.check(schema, in_sweep)?;
        self.years.check(schema, in_sweep)?;
        if !in_sweep && !self.years.is_always() {
            return Err(GeneratorError::invalid_rule(
                self.label(),
                "static groups cannot carry a year condition",
            ));
        }
        for variant in &self.variants {
            variant.when.check(schema, in_sweep)?;
        }
        if !in_sweep {
            let templated = self
                .entries
                .iter()
                .map(|e| &e.identifier)
                .chain(self.variants.iter().map(|v| &v.mint))
                .find(|label| label.is_templated());
            if let Some(label) = templated {
                return Err(GeneratorError::invalid_rule(
                    self.label(),
                    format!("label '{}' uses {{year}} outside the year sweep", label.as_str()),
                ));
            }
        }
        Ok(())
    }
}

/// Bound of the year sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearBound {
    /// Literal year
    Year(i32),
    /// `open`, or the name of an integer option
    Named(String),
}

impl YearBound {
    /// Resolve the bound for one instance
    ///
    /// `open`, whether literal or as an option value, resolves to `as_of_year`.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` if the named option is missing or
    /// not an integer.
    pub fn resolve(&self, options: &OptionSet, as_of_year: i32) -> Result<i32, GeneratorError> {
        match self {
            Self::Year(year) => Ok(*year),
            Self::Named(name) if name == "open" => Ok(as_of_year),
            Self::Named(name) => match options.get(name) {
                Some(OptionValue::Int(value)) => i32::try_from(*value).map_err(|_| {
                    GeneratorError::invalid_rule(name, format!("year {value} out of range"))
                }),
                Some(OptionValue::Open) => Ok(as_of_year),
                Some(other) => Err(GeneratorError::invalid_rule(
                    name,
                    format!("year bound must be an integer, got {}", other.kind_name()),
                )),
                None => Err(GeneratorError::invalid_rule(
                    name,
                    "year bound names an unknown option",
                )),
            },
        }
    }

    /// Earliest year this bound can take under `schema`
    pub fn lowest(&self, schema: &OptionSchema) -> Option<i64> {
        match self {
            Self::Year(year) => Some(i64::from(*year)),
            Self::Named(name) => {
                let decl = schema.get(name)?;
                match (decl.min, &decl.default) {
                    (Some(min), _) => Some(min),
                    (None, OptionValue::Int(default)) => Some(*default),
                    _ => None,
                }
            }
        }
    }

    fn check(&self, schema: &OptionSchema) -> Result<(), GeneratorError> {
        match self {
            Self::Year(_) => Ok(()),
            Self::Named(name) if name == "open" => Ok(()),
            Self::Named(name) => match schema.get(name) {
                Some(decl) if decl.kind == OptionKind::Int => Ok(()),
                Some(_) => Err(GeneratorError::invalid_rule(
                    name,
                    "year bound must name an integer option",
                )),
                None => Err(GeneratorError::invalid_rule(
                    name,
                    "year bound names an unknown option",
                )),
            },
        }
    }
}

/// Inclusive year sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRange {
    /// First year
    pub start: YearBound,
    /// Last year, possibly open-ended
    pub stop: YearBound,
    /// Years skipped entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<Predicate>,
}

/// How an override combines with the generic sub-series of its year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    /// Emit instead of every sub-series
    #[default]
    Replace,
    /// Emit ahead of the sub-series
    Before,
    /// Emit after the sub-series
    After,
}

/// Special case for one exact year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOverride {
    /// Year the override applies to
    pub year: i32,
    /// Whether the override is active for this instance
    #[serde(default)]
    pub when: Predicate,
    /// Combination mode
    #[serde(default)]
    pub mode: OverrideMode,
    /// Groups emitted for the year, in order
    pub groups: Vec<RuleGroup>,
}

/// Complete enumeration policy of one collection type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Static groups ahead of the sweep
    #[serde(default)]
    pub pre: Vec<RuleGroup>,
    /// Year sweep, absent for purely static catalogs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<YearRange>,
    /// Sub-series evaluated for each year, in emission order
    #[serde(default)]
    pub series: Vec<RuleGroup>,
    /// Per-year overrides, in declaration order
    #[serde(default)]
    pub overrides: Vec<YearOverride>,
    /// Static groups after the sweep
    #[serde(default)]
    pub post: Vec<RuleGroup>,
}

impl RuleTable {
    /// Every group in the table, with whether it runs inside the sweep
    pub fn groups(&self) -> impl Iterator<Item = (&RuleGroup, bool)> {
        self.pre
            .iter()
            .map(|g| (g, false))
            .chain(self.series.iter().map(|g| (g, true)))
            .chain(
                self.overrides
                    .iter()
                    .flat_map(|o| o.groups.iter().map(|g| (g, true))),
            )
            .chain(self.post.iter().map(|g| (g, false)))
    }

    /// Whether any group declares `identifier`
    pub fn declares_identifier(&self, identifier: &str) -> bool {
        self.groups()
            .any(|(g, _)| g.entries.iter().any(|e| e.identifier.matches(identifier)))
    }

    /// Whether some group can emit `(identifier, mint)` under some options
    pub fn can_emit(&self, identifier: &str, mint: &str) -> bool {
        self.groups().any(|(g, _)| g.can_emit(identifier, mint))
    }

    /// Validate predicates, labels and year bounds against `schema`
    ///
    /// # Errors
    ///
    /// Returns the first `GeneratorError::InvalidRule` found.
    pub fn check(&self, schema: &OptionSchema) -> Result<(), GeneratorError> {
        let in_sweep_without_range = self.range.is_none()
            && (!self.series.is_empty() || !self.overrides.is_empty());
        if in_sweep_without_range {
            return Err(GeneratorError::invalid_rule(
                "range",
                "sub-series and overrides need a year range",
            ));
        }
        if let Some(range) = &self.range {
            range.start.check(schema)?;
            range.stop.check(schema)?;
            if let Some(skip) = &range.skip {
                skip.check(schema, true)?;
            }
        }
        for over in &self.overrides {
            over.when.check(schema, true)?;
        }
        for (group, in_sweep) in self.groups() {
            group.check(schema, in_sweep)?;
        }
        Ok(())
    }
}
