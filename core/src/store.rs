//! Ordered slot store of one collection instance
//!
//! Slots are kept in an `IndexMap` keyed by [`SlotKey`], so position and
//! identity are both O(1) to look up. A slot's `order` always equals its
//! position: inserting in the middle moves later slots down by one without
//! changing their relative order, which keeps ordering dense.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{Slot, SlotKey, SlotSpec, UserState};

/// Ordered, uniquely keyed slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Slot>", into = "Vec<Slot>")]
pub struct SlotStore {
    slots: IndexMap<SlotKey, Slot>,
}

impl SlotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from freshly generated specs, all with default state
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvariantViolation` if the specs are not densely
    /// ordered from zero or repeat a key.
    pub fn from_specs(specs: &[SlotSpec]) -> Result<Self, StoreError> {
        Self::from_slots(specs.iter().map(Slot::from_spec).collect())
    }

    /// Rebuild a store from persisted slots
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvariantViolation` if the slots are not densely
    /// ordered from zero or repeat a key.
    pub fn from_slots(mut slots: Vec<Slot>) -> Result<Self, StoreError> {
        slots.sort_by_key(|s| s.order);
        let mut map = IndexMap::with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            if slot.order != position {
                return Err(StoreError::violation(format!(
                    "slot {} has order {} but position {position}",
                    slot.key, slot.order
                )));
            }
            if map.contains_key(&slot.key) {
                return Err(StoreError::violation(format!("duplicate slot {}", slot.key)));
            }
            map.insert(slot.key.clone(), slot);
        }
        Ok(Self { slots: map })
    }

    /// Look up a slot
    pub fn get(&self, key: &SlotKey) -> Option<&Slot> {
        self.slots.get(key)
    }

    /// Whether a slot with `key` exists
    pub fn contains(&self, key: &SlotKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Slot at a position
    pub fn get_index(&self, order: usize) -> Option<&Slot> {
        self.slots.get_index(order).map(|(_, slot)| slot)
    }

    /// Insert a new slot with default user state at `order`
    ///
    /// Slots at `order` and later move one position down.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvariantViolation` if `order` is past the end or
    /// the key already exists.
    pub fn insert_at(&mut self, order: usize, spec: &SlotSpec) -> Result<&Slot, StoreError> {
        if order > self.slots.len() {
            return Err(StoreError::violation(format!(
                "insert position {order} is past the end ({})",
                self.slots.len()
            )));
        }
        if self.slots.contains_key(&spec.key) {
            return Err(StoreError::violation(format!(
                "slot {} already exists",
                spec.key
            )));
        }
        let slot = Slot {
            order,
            ..Slot::from_spec(spec)
        };
        self.slots.shift_insert(order, spec.key.clone(), slot);
        self.renumber_from(order + 1);
        self.slots
            .get_index(order)
            .map(|(_, slot)| slot)
            .ok_or_else(|| StoreError::violation("inserted slot vanished"))
    }

    /// Rewrite a key in place, keeping position and user state
    ///
    /// Returns `false` without changing anything when `old` is absent, which
    /// makes text fix-ups safe to re-apply.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvariantViolation` if `new` already belongs to
    /// another slot.
    pub fn rename_key(&mut self, old: &SlotKey, new: SlotKey) -> Result<bool, StoreError> {
        if old == &new {
            return Ok(self.slots.contains_key(old));
        }
        let Some(position) = self.slots.get_index_of(old) else {
            return Ok(false);
        };
        if self.slots.contains_key(&new) {
            return Err(StoreError::violation(format!(
                "cannot rename {old} to {new}: target exists"
            )));
        }
        let Some((_, mut slot)) = self.slots.shift_remove_index(position) else {
            return Ok(false);
        };
        slot.key = new.clone();
        self.slots.shift_insert(position, new, slot);
        Ok(true)
    }

    /// Edit the collector state of one slot
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownKey` if no slot has `key`.
    pub fn update_user_state(
        &mut self,
        key: &SlotKey,
        edit: impl FnOnce(&mut UserState),
    ) -> Result<(), StoreError> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| StoreError::UnknownKey(key.clone()))?;
        edit(&mut slot.state);
        Ok(())
    }

    /// Slots in order
    pub fn all(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &SlotKey> {
        self.slots.keys()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots marked as collected
    pub fn collected_count(&self) -> usize {
        self.slots.values().filter(|s| s.state.in_collection).count()
    }

    /// Verify dense ordering and key consistency
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvariantViolation` describing the first problem.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        for (position, (key, slot)) in self.slots.iter().enumerate() {
            if slot.order != position {
                return Err(StoreError::violation(format!(
                    "slot {key} has order {} at position {position}",
                    slot.order
                )));
            }
            if &slot.key != key {
                return Err(StoreError::violation(format!(
                    "slot stored under {key} carries key {}",
                    slot.key
                )));
            }
        }
        Ok(())
    }

    fn renumber_from(&mut self, start: usize) {
        for (position, (_, slot)) in self.slots.iter_mut().enumerate().skip(start) {
            slot.order = position;
        }
    }
}

impl TryFrom<Vec<Slot>> for SlotStore {
    type Error = StoreError;

    fn try_from(slots: Vec<Slot>) -> Result<Self, Self::Error> {
        Self::from_slots(slots)
    }
}

impl From<SlotStore> for Vec<Slot> {
    fn from(store: SlotStore) -> Self {
        store.slots.into_values().collect()
    }
}
