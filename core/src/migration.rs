//! Version-tagged migration of persisted collections
//!
//! Collections are never regenerated on upgrade. Instead the engine
//! regenerates the canonical list under the instance's own options, uses it
//! as an ordering oracle, and threads in only the slots each pending delta
//! introduces. Existing slots keep their identity, relative order and user
//! state.
//!
//! Each delta is applied to a staged copy of the instance. The copy replaces
//! the instance only after the host's [`MigrationCheckpoint`] accepts it, so
//! a failure leaves the instance at its last recorded version and a re-run
//! resumes from there.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::error::MigrationError;
use crate::instance::CollectionInstance;
use crate::store::SlotStore;
use crate::template::{CollectionTemplate, Delta, DeltaAddition, TextFixup};
use crate::types::{SlotKey, SlotSpec};

/// Result of applying one delta
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaOutcome {
    /// Delta version
    pub version: u32,
    /// Keys inserted, in canonical order
    pub added: Vec<SlotKey>,
    /// Keys rewritten by fix-ups, as `(old, new)`
    pub renamed: Vec<(SlotKey, SlotKey)>,
}

/// Summary of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Template type id
    pub type_id: String,
    /// Version before the run
    pub from_version: u32,
    /// Version after the run
    pub to_version: u32,
    /// Per-delta outcomes, in application order
    pub deltas: Vec<DeltaOutcome>,
}

impl MigrationReport {
    /// Total slots inserted
    pub fn added_count(&self) -> usize {
        self.deltas.iter().map(|d| d.added.len()).sum()
    }

    /// Total keys renamed
    pub fn renamed_count(&self) -> usize {
        self.deltas.iter().map(|d| d.renamed.len()).sum()
    }
}

/// Durable progress hook, called after every applied delta
///
/// The instance passed in already carries the delta's version. Returning an
/// error aborts the run before the instance is updated.
pub trait MigrationCheckpoint {
    /// Persist the instance as of `outcome.version`
    ///
    /// # Errors
    ///
    /// Any error aborts the migration with `MigrationError::CheckpointFailed`.
    fn record(&mut self, instance: &CollectionInstance, outcome: &DeltaOutcome) -> anyhow::Result<()>;
}

/// Checkpoint that persists nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoint;

impl MigrationCheckpoint for NoCheckpoint {
    fn record(&mut self, _instance: &CollectionInstance, _outcome: &DeltaOutcome) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<F> MigrationCheckpoint for F
where
    F: FnMut(&CollectionInstance, &DeltaOutcome) -> anyhow::Result<()>,
{
    fn record(&mut self, instance: &CollectionInstance, outcome: &DeltaOutcome) -> anyhow::Result<()> {
        self(instance, outcome)
    }
}

/// Applies a template's delta history to instances of that template
#[derive(Debug, Clone, Copy)]
pub struct MigrationEngine<'t> {
    template: &'t CollectionTemplate,
}

impl<'t> MigrationEngine<'t> {
    /// Create an engine for `template`
    pub fn new(template: &'t CollectionTemplate) -> Self {
        Self { template }
    }

    /// Whether `instance` is behind the template
    pub fn needs_migration(&self, instance: &CollectionInstance) -> bool {
        instance.schema_version < self.template.latest_version()
    }

    /// Migrate without persisting intermediate progress
    ///
    /// # Errors
    ///
    /// See [`MigrationEngine::migrate_with`].
    pub fn migrate(
        &self,
        instance: &mut CollectionInstance,
        as_of_year: i32,
    ) -> Result<MigrationReport, MigrationError> {
        self.migrate_with(instance, as_of_year, &mut NoCheckpoint)
    }

    /// Report what a migration would do, leaving `instance` untouched
    ///
    /// # Errors
    ///
    /// See [`MigrationEngine::migrate_with`].
    pub fn preview(
        &self,
        instance: &CollectionInstance,
        as_of_year: i32,
    ) -> Result<MigrationReport, MigrationError> {
        let mut scratch = instance.clone();
        self.migrate(&mut scratch, as_of_year)
    }

    /// Bring `instance` up to the template's latest version
    ///
    /// Applies every delta newer than the instance's version, in order, and
    /// calls `checkpoint` after each. A no-op when the instance is current.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DeltaKeyNotInCanonical` when a delta names a
    /// slot the rule table cannot produce, `MigrationError::CheckpointFailed`
    /// when the host rejects progress, and wraps generator or store failures.
    /// On error the instance is left at the last version accepted by the
    /// checkpoint.
    pub fn migrate_with(
        &self,
        instance: &mut CollectionInstance,
        as_of_year: i32,
        checkpoint: &mut dyn MigrationCheckpoint,
    ) -> Result<MigrationReport, MigrationError> {
        let template = self.template;
        let from_version = instance.schema_version;
        let span = info_span!("migrate", type_id = %template.type_id, from_version);
        let _guard = span.enter();

        let mut report = MigrationReport {
            type_id: template.type_id.clone(),
            from_version,
            to_version: from_version,
            deltas: Vec::new(),
        };

        if instance.template_id != template.type_id {
            warn!(instance_type = %instance.template_id, "instance belongs to another template");
            return Err(MigrationError::TemplateMismatch {
                expected: template.type_id.clone(),
                found: instance.template_id.clone(),
            });
        }

        if !self.needs_migration(instance) {
            debug!("instance is current");
            return Ok(report);
        }

        let canonical = template.generate(&instance.options, as_of_year)?;
        let oracle: HashMap<&SlotKey, usize> =
            canonical.iter().map(|spec| (&spec.key, spec.order)).collect();

        for delta in template.deltas.iter().filter(|d| d.version > from_version) {
            let mut staged = instance.clone();
            let mut outcome = DeltaOutcome {
                version: delta.version,
                ..DeltaOutcome::default()
            };

            for spec in self.resolve_additions(delta, &canonical, &oracle, as_of_year)? {
                if staged.store.contains(&spec.key) {
                    continue;
                }
                let position = insertion_point(&staged.store, &oracle, spec.order);
                staged.store.insert_at(position, spec)?;
                debug!(version = delta.version, key = %spec.key, position, "slot inserted");
                outcome.added.push(spec.key.clone());
            }

            for fixup in &delta.fixups {
                apply_fixup(&mut staged.store, fixup, &mut outcome.renamed)?;
            }

            staged.schema_version = delta.version;
            checkpoint
                .record(&staged, &outcome)
                .map_err(|e| MigrationError::CheckpointFailed {
                    version: delta.version,
                    message: format!("{e:#}"),
                })?;

            debug!(
                version = delta.version,
                added = outcome.added.len(),
                renamed = outcome.renamed.len(),
                note = delta.note.as_deref().unwrap_or(""),
                "delta applied"
            );
            *instance = staged;
            report.to_version = delta.version;
            report.deltas.push(outcome);
        }

        info!(
            to_version = report.to_version,
            added = report.added_count(),
            renamed = report.renamed_count(),
            "migration complete"
        );
        Ok(report)
    }

    /// Canonical specs a delta introduces, in canonical order
    fn resolve_additions<'c>(
        &self,
        delta: &Delta,
        canonical: &'c [SlotSpec],
        oracle: &HashMap<&SlotKey, usize>,
        as_of_year: i32,
    ) -> Result<Vec<&'c SlotSpec>, MigrationError> {
        let rules = &self.template.rules;
        let not_in_canonical = |add: &DeltaAddition| MigrationError::DeltaKeyNotInCanonical {
            version: delta.version,
            selector: add.to_string(),
        };

        let mut selected: Vec<&SlotSpec> = Vec::new();
        for add in &delta.adds {
            match add {
                DeltaAddition::Key(key) => match oracle.get(key) {
                    Some(&order) => selected.push(&canonical[order]),
                    None if rules.can_emit(&key.identifier, &key.mint) => {
                        debug!(version = delta.version, key = %key, "excluded by instance options");
                    }
                    None => return Err(not_in_canonical(add)),
                },
                DeltaAddition::Identifier(identifier) => {
                    if !rules.declares_identifier(identifier) {
                        return Err(not_in_canonical(add));
                    }
                    selected.extend(canonical.iter().filter(|s| &s.key.identifier == identifier));
                }
                DeltaAddition::Year(year) => {
                    if !self.template.covers_year(*year, as_of_year) {
                        return Err(not_in_canonical(add));
                    }
                    selected.extend(canonical.iter().filter(|s| s.year == Some(*year)));
                }
            }
        }

        selected.sort_by_key(|s| s.order);
        selected.dedup_by_key(|s| s.order);
        Ok(selected)
    }
}

/// Position before the first existing slot that sorts after `order`
///
/// Slots the current rule table no longer produces carry no canonical rank
/// and are passed over.
fn insertion_point(store: &SlotStore, oracle: &HashMap<&SlotKey, usize>, order: usize) -> usize {
    store
        .all()
        .find(|slot| oracle.get(&slot.key).is_some_and(|&rank| rank > order))
        .map_or(store.len(), |slot| slot.order)
}

fn apply_fixup(
    store: &mut SlotStore,
    fixup: &TextFixup,
    renamed: &mut Vec<(SlotKey, SlotKey)>,
) -> Result<(), MigrationError> {
    let targets: Vec<(SlotKey, SlotKey)> = match fixup {
        TextFixup::Identifier { from, to } => store
            .keys()
            .filter(|k| &k.identifier == from)
            .map(|k| (k.clone(), SlotKey::new(to.clone(), k.mint.clone())))
            .collect(),
        TextFixup::Mint { from, to } => store
            .keys()
            .filter(|k| &k.mint == from)
            .map(|k| (k.clone(), SlotKey::new(k.identifier.clone(), to.clone())))
            .collect(),
        TextFixup::Key { from, to } => vec![(from.clone(), to.clone())],
    };

    for (old, new) in targets {
        if store.rename_key(&old, new.clone())? {
            debug!(from = %old, to = %new, "key renamed");
            renamed.push((old, new));
        }
    }
    Ok(())
}
