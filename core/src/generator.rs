//! Rule table interpreter
//!
//! [`generate`] is a pure function of `(rule table, options, as-of year)`.
//! Emission order is fixed:
//!
//! 1. static `pre` groups
//! 2. for each year of the sweep, in increasing order: `before` overrides,
//!    then either the active `replace` overrides or every sub-series in
//!    declared order, then `after` overrides
//! 3. static `post` groups
//!
//! Each slot's `order` is its emission index.

use std::collections::HashSet;

use tracing::trace;

use crate::error::GeneratorError;
use crate::options::OptionSet;
use crate::predicate::EvalContext;
use crate::rules::{OverrideMode, RuleGroup, RuleTable, YearOverride};
use crate::types::{SlotKey, SlotSpec};

/// Resolved year sweep of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First year
    pub start: i32,
    /// Last year
    pub stop: i32,
}

/// Resolve the year sweep of `table` for `options`
///
/// # Errors
///
/// Returns `GeneratorError::InvalidRange` when the stop year precedes the
/// start year, or `GeneratorError::InvalidRule` for unresolvable bounds.
pub fn resolve_range(
    table: &RuleTable,
    options: &OptionSet,
    as_of_year: i32,
) -> Result<Option<ResolvedRange>, GeneratorError> {
    let Some(range) = &table.range else {
        return Ok(None);
    };
    let start = range.start.resolve(options, as_of_year)?;
    let stop = range.stop.resolve(options, as_of_year)?;
    if stop < start {
        return Err(GeneratorError::InvalidRange { start, stop });
    }
    Ok(Some(ResolvedRange { start, stop }))
}

/// Generate the canonical ordered slot list
///
/// # Errors
///
/// Returns `GeneratorError::InvalidRange` for an inverted year range,
/// `GeneratorError::InvalidRule` for predicates or labels that cannot be
/// evaluated, and `GeneratorError::DuplicateKey` if the table emits one key
/// twice.
pub fn generate(
    table: &RuleTable,
    options: &OptionSet,
    as_of_year: i32,
) -> Result<Vec<SlotSpec>, GeneratorError> {
    let range = resolve_range(table, options, as_of_year)?;
    let ctx = EvalContext::new(options);
    let mut emitter = Emitter::default();

    for group in &table.pre {
        emitter.emit_group(group, &ctx)?;
    }

    if let (Some(range), Some(sweep)) = (range, &table.range) {
        for year in range.start..=range.stop {
            let year_ctx = ctx.at_year(year);
            if let Some(skip) = &sweep.skip {
                if skip.eval(&year_ctx)? {
                    continue;
                }
            }
            emitter.emit_year(table, &year_ctx, year)?;
        }
    }

    for group in &table.post {
        emitter.emit_group(group, &ctx)?;
    }

    Ok(emitter.specs)
}

#[derive(Default)]
struct Emitter {
    specs: Vec<SlotSpec>,
    seen: HashSet<SlotKey>,
}

impl Emitter {
    fn emit_year(&mut self, table: &RuleTable, ctx: &EvalContext<'_>, year: i32) -> Result<(), GeneratorError> {
        let mut active: Vec<&YearOverride> = Vec::new();
        for over in table.overrides.iter().filter(|o| o.year == year) {
            if over.when.eval(ctx)? {
                active.push(over);
            }
        }

        self.emit_overrides(&active, OverrideMode::Before, ctx)?;
        if active.iter().any(|o| o.mode == OverrideMode::Replace) {
            trace!(year, "generic sub-series replaced by override");
            self.emit_overrides(&active, OverrideMode::Replace, ctx)?;
        } else {
            for group in &table.series {
                self.emit_group(group, ctx)?;
            }
        }
        self.emit_overrides(&active, OverrideMode::After, ctx)
    }

    fn emit_overrides(
        &mut self,
        active: &[&YearOverride],
        mode: OverrideMode,
        ctx: &EvalContext<'_>,
    ) -> Result<(), GeneratorError> {
        for over in active.iter().filter(|o| o.mode == mode) {
            for group in &over.groups {
                self.emit_group(group, ctx)?;
            }
        }
        Ok(())
    }

    fn emit_group(&mut self, group: &RuleGroup, ctx: &EvalContext<'_>) -> Result<(), GeneratorError> {
        if !group.when.eval(ctx)? || !group.years.eval(ctx)? {
            return Ok(());
        }
        for entry in &group.entries {
            let identifier = entry.identifier.render(ctx.year)?;
            for variant in &group.variants {
                if !variant.when.eval(ctx)? {
                    continue;
                }
                let key = SlotKey::new(identifier.clone(), variant.mint.render(ctx.year)?);
                if !self.seen.insert(key.clone()) {
                    return Err(GeneratorError::DuplicateKey { key });
                }
                let image = variant
                    .image
                    .as_ref()
                    .or(entry.image.as_ref())
                    .or_else(|| group.images.get(&identifier))
                    .or(group.image.as_ref())
                    .cloned();
                self.specs.push(SlotSpec {
                    key,
                    order: self.specs.len(),
                    image,
                    year: ctx.year,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionDecl, OptionSchema, OptionValue};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn keys(specs: &[SlotSpec]) -> Vec<(String, String)> {
        specs
            .iter()
            .map(|s| (s.key.identifier.clone(), s.key.mint.clone()))
            .collect()
    }

    fn pair(identifier: &str, mint: &str) -> (String, String) {
        (identifier.to_string(), mint.to_string())
    }

    fn schema() -> OptionSchema {
        let mut schema = OptionSchema::new();
        schema.declare("include_d", OptionDecl::boolean(true)).unwrap();
        schema
            .declare(
                "stop_year",
                OptionDecl::integer(OptionValue::Open).open_ended(),
            )
            .unwrap();
        schema
    }

    #[test]
    fn test_sweep_with_skip_and_year_predicate() {
        let table: RuleTable = serde_yaml::from_str(
            r#"
range: { start: 1964, stop: 1968, skip: "year == 1966" }
series:
  - name: business
  - name: denver
    when: include_d
    years: "year != 1965"
    variants: ["D"]
"#,
        )
        .unwrap();
        let options = schema().defaults();
        let specs = generate(&table, &options, 2000).unwrap();
        assert_eq!(
            keys(&specs),
            vec![
                pair("1964", ""),
                pair("1964", "D"),
                pair("1965", ""),
                pair("1967", ""),
                pair("1967", "D"),
                pair("1968", ""),
                pair("1968", "D"),
            ]
        );
        assert!(specs.iter().enumerate().all(|(i, s)| s.order == i));
    }

    #[test]
    fn test_overrides_replace_and_surround() {
        let table: RuleTable = serde_yaml::from_str(
            r#"
pre:
  - entries: ["Indian Head"]
range: { start: 1942, stop: 1944 }
series:
  - name: business
overrides:
  - year: 1943
    groups:
      - variants: ["Steel Cent", { when: include_d, mint: "D Steel Cent" }]
  - year: 1944
    mode: after
    groups:
      - entries: ["1944 Shell Case"]
post:
  - entries: ["Proof Set"]
"#,
        )
        .unwrap();
        let options = schema().defaults();
        let specs = generate(&table, &options, 2000).unwrap();
        assert_eq!(
            keys(&specs),
            vec![
                pair("Indian Head", ""),
                pair("1942", ""),
                pair("1943", "Steel Cent"),
                pair("1943", "D Steel Cent"),
                pair("1944", ""),
                pair("1944 Shell Case", ""),
                pair("Proof Set", ""),
            ]
        );
        assert_eq!(specs[0].year, None);
        assert_eq!(specs[2].year, Some(1943));
    }

    #[test]
    fn test_open_stop_uses_as_of_year() {
        let table: RuleTable = serde_yaml::from_str(
            "range: { start: 2018, stop: stop_year }\nseries: [{ name: business }]",
        )
        .unwrap();
        let options = schema().defaults();
        let specs = generate(&table, &options, 2020).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[2].key, SlotKey::new("2020", ""));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let table: RuleTable = serde_yaml::from_str(
            "range: { start: 2018, stop: stop_year }\nseries: [{ name: business }]",
        )
        .unwrap();
        let mut raw = IndexMap::new();
        raw.insert("stop_year".to_string(), OptionValue::Int(2000));
        let options = schema().resolve(&raw).unwrap();
        assert_eq!(
            generate(&table, &options, 2020),
            Err(GeneratorError::InvalidRange {
                start: 2018,
                stop: 2000
            })
        );
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let table: RuleTable = serde_yaml::from_str(
            r#"
pre:
  - entries: ["Keelboat"]
post:
  - entries: ["Keelboat"]
"#,
        )
        .unwrap();
        let options = schema().defaults();
        assert!(matches!(
            generate(&table, &options, 2020),
            Err(GeneratorError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_image_precedence() {
        let table: RuleTable = serde_yaml::from_str(
            r#"
pre:
  - image: group
    entries:
      - { identifier: A, image: entry }
      - B
    variants:
      - ""
      - { mint: P, image: variant }
"#,
        )
        .unwrap();
        let options = schema().defaults();
        let specs = generate(&table, &options, 2020).unwrap();
        let images: Vec<Option<&str>> = specs.iter().map(|s| s.image.as_deref()).collect();
        assert_eq!(
            images,
            vec![Some("entry"), Some("variant"), Some("group"), Some("variant")]
        );
    }

    #[test]
    fn test_images_by_identifier() {
        let table: RuleTable = serde_yaml::from_str(
            r#"
range: { start: 2008, stop: 2010 }
series:
  - image: plain
    images: { "2009": native_2009, "2010": native_2010 }
    variants:
      - ""
      - { mint: P, image: variant }
"#,
        )
        .unwrap();
        let options = schema().defaults();
        let specs = generate(&table, &options, 2020).unwrap();
        let images: Vec<Option<&str>> = specs.iter().map(|s| s.image.as_deref()).collect();
        assert_eq!(
            images,
            vec![
                Some("plain"),
                Some("variant"),
                Some("native_2009"),
                Some("variant"),
                Some("native_2010"),
                Some("variant"),
            ]
        );
    }
}
