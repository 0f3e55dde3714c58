//! Integrity checks over a hero's inventory and equipment.
//!
//! A correct sequence of operations never produces the states detected
//! here. [`validate`] reports them; [`repair`] is a best-effort cleanup for
//! data loaded from elsewhere, not a guaranteed recovery.

use crate::equipment::Equipment;
use crate::error::IntegrityError;
use crate::ids::InstanceId;
use crate::inventory::InventoryStore;
use std::collections::{HashMap, HashSet};

/// Every invariant violation found, in a stable order.
pub fn validate(inventory: &InventoryStore, equipment: &Equipment) -> Vec<IntegrityError> {
    let mut errors = Vec::new();

    let mut counts: HashMap<InstanceId, usize> = HashMap::new();
    let located = equipment
        .all_equipped()
        .map(|(_, item)| item)
        .chain(inventory.iter().map(|(_, item)| item));
    for item in located {
        if let Some(id) = item.instance_id {
            *counts.entry(id).or_insert(0) += 1;
        }
        if item.instance_id.is_some() && item.quantity != 1 {
            errors.push(IntegrityError::IdentityMismatch(item.definition_id.clone()));
        }
    }
    let mut duplicates: Vec<_> = counts.into_iter().filter(|(_, count)| *count > 1).collect();
    duplicates.sort();
    errors.extend(
        duplicates
            .into_iter()
            .map(|(instance, count)| IntegrityError::DuplicateInstance { instance, count }),
    );

    for (slot, item) in inventory.iter() {
        if item.slot_index != Some(slot) {
            errors.push(IntegrityError::SlotIndexMismatch {
                slot,
                recorded: item.slot_index,
            });
        }
    }
    for (_, item) in equipment.all_equipped() {
        if item.instance_id.is_none() {
            errors.push(IntegrityError::IdentityMismatch(item.definition_id.clone()));
        }
    }
    errors
}

/// What [`repair`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Duplicate inventory copies that were dropped.
    pub dropped_duplicates: usize,
    /// Inventory records whose slot index was rewritten.
    pub reindexed: usize,
    /// Equipment records whose quantity was forced back to 1.
    pub quantities_fixed: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Drop duplicate instances and resynchronise slot indices.
///
/// An equipped copy always wins over inventory copies; among inventory
/// copies, the lowest slot wins.
pub fn repair(inventory: &mut InventoryStore, equipment: &mut Equipment) -> RepairReport {
    let mut report = RepairReport::default();
    let mut seen: HashSet<InstanceId> = HashSet::new();

    for item in equipment.slots_mut().values_mut() {
        if let Some(id) = item.instance_id {
            seen.insert(id);
            if item.quantity != 1 {
                item.quantity = 1;
                report.quantities_fixed += 1;
            }
        }
    }

    for (index, slot) in inventory.slots_mut().iter_mut().enumerate() {
        let Some(item) = slot.as_mut() else { continue };
        if let Some(id) = item.instance_id {
            if !seen.insert(id) {
                tracing::warn!(instance = %id, slot = index, "dropping duplicate instance");
                *slot = None;
                report.dropped_duplicates += 1;
                continue;
            }
            if item.quantity != 1 {
                item.quantity = 1;
                report.quantities_fixed += 1;
            }
        }
        if item.slot_index != Some(index) {
            tracing::warn!(slot = index, recorded = ?item.slot_index, "reassigning slot index");
            item.slot_index = Some(index);
            report.reindexed += 1;
        }
    }
    report
}
