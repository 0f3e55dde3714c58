//! Slot-indexed inventory store.
//!
//! A fixed-capacity grid of optional item records. Each occupied slot's
//! record carries its own `slot_index`, which always equals the position
//! it is stored at. Every mutator keeps that invariant; a mismatch is a
//! programmer error and trips a debug assertion.

use crate::error::GearError;
use crate::factory::ItemFactory;
use crate::ids::{DefinitionId, InstanceId};
use crate::item::ItemInstance;
use serde::{Deserialize, Serialize};

/// Placement operations the equipment manager needs from an item store.
///
/// [`InventoryStore`] is the standard implementation. Hosts that layer
/// policies on top of a store (reserved slots, loot filters) can
/// implement this trait and still get atomic equip/unequip.
pub trait ItemStore {
    /// Slot currently holding the instance, if any.
    fn slot_of(&self, id: InstanceId) -> Option<usize>;

    fn has_free_slot(&self) -> bool;

    fn remove_exact(&mut self, item: &ItemInstance) -> Result<ItemInstance, GearError>;

    fn add_at_slot(&mut self, item: ItemInstance, index: usize) -> Result<(), GearError>;

    fn add_at_next_free(&mut self, item: ItemInstance) -> Result<usize, GearError>;
}

/// Capacity-bounded grid of item slots.
///
/// # Examples
///
/// ```rust
/// use zzgear::inventory::InventoryStore;
/// use zzgear::item::ItemInstance;
/// use zzgear::DefinitionId;
///
/// let mut inventory = InventoryStore::new(4);
/// let slot = inventory.add_at_next_free(ItemInstance::stack(DefinitionId::new("arrow"), 20)).unwrap();
/// assert_eq!(slot, 0);
///
/// // Stackables merge into the existing stack instead of taking a new slot.
/// inventory.add_at_next_free(ItemInstance::stack(DefinitionId::new("arrow"), 5)).unwrap();
/// assert_eq!(inventory.used_slots(), 1);
/// assert_eq!(inventory.count(&DefinitionId::new("arrow")), 25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStore {
    slots: Vec<Option<ItemInstance>>,
}

impl InventoryStore {
    /// Create an empty inventory with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_slots(&self) -> usize {
        self.capacity() - self.used_slots()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|s| s.is_none())
    }

    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    /// Lowest free slot index, if any.
    pub fn first_free_index(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    /// Contents of a slot. Out-of-range indices read as empty.
    pub fn get(&self, index: usize) -> Option<&ItemInstance> {
        self.slots.get(index)?.as_ref()
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ItemInstance)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|item| (i, item)))
    }

    pub fn find_by_instance_id(&self, id: InstanceId) -> Option<&ItemInstance> {
        self.iter()
            .map(|(_, item)| item)
            .find(|item| item.instance_id == Some(id))
    }

    pub fn contains_instance(&self, id: InstanceId) -> bool {
        self.find_by_instance_id(id).is_some()
    }

    /// Lowest-index stack of `definition_id` without an instance id.
    pub fn find_first_stackable(&self, definition_id: &DefinitionId) -> Option<&ItemInstance> {
        self.iter()
            .map(|(_, item)| item)
            .find(|item| item.is_stackable() && &item.definition_id == definition_id)
    }

    /// Total units of a stackable definition across all stacks.
    pub fn count(&self, definition_id: &DefinitionId) -> u32 {
        self.iter()
            .filter(|(_, item)| &item.definition_id == definition_id)
            .map(|(_, item)| item.quantity)
            .sum()
    }

    /// Place `item` into the lowest free slot.
    ///
    /// Stackables first merge into an existing stack of the same
    /// definition. Returns the slot index that now holds the units.
    pub fn add_at_next_free(&mut self, mut item: ItemInstance) -> Result<usize, GearError> {
        self.check_not_placed(&item)?;
        if item.is_stackable() {
            if let Some(index) = self.stack_index(&item.definition_id) {
                if let Some(existing) = self.slots[index].as_mut() {
                    ItemFactory::stack(existing, &item)?;
                    tracing::debug!(slot = index, definition = %item.definition_id, "merged into stack");
                    return Ok(index);
                }
            }
        }

        let index = self.first_free_index().ok_or(GearError::NoSpace)?;
        item.slot_index = Some(index);
        self.slots[index] = Some(item);
        self.check_slot_indices();
        Ok(index)
    }

    /// Place `item` into a specific slot.
    pub fn add_at_slot(&mut self, mut item: ItemInstance, index: usize) -> Result<(), GearError> {
        self.check_index(index)?;
        if self.slots[index].is_some() {
            return Err(GearError::SlotOccupied(index));
        }
        self.check_not_placed(&item)?;
        item.slot_index = Some(index);
        self.slots[index] = Some(item);
        self.check_slot_indices();
        Ok(())
    }

    /// Remove the record that is the same item as `item`.
    ///
    /// Equipment matches by instance id. A stack matches by definition at
    /// the slot it records, falling back to the first stack of that
    /// definition when it records none.
    pub fn remove_exact(&mut self, item: &ItemInstance) -> Result<ItemInstance, GearError> {
        let index = match item.instance_id {
            Some(id) => self.index_of_instance(id),
            None => item
                .slot_index
                .filter(|&i| {
                    self.get(i)
                        .is_some_and(|s| s.is_stackable() && s.definition_id == item.definition_id)
                })
                .or_else(|| self.stack_index(&item.definition_id)),
        }
        .ok_or(GearError::NotFound)?;
        self.take_at(index)
    }

    /// Remove an equipment record by its instance id.
    pub fn remove_by_instance_id(&mut self, id: InstanceId) -> Result<ItemInstance, GearError> {
        let index = self.index_of_instance(id).ok_or(GearError::NotFound)?;
        self.take_at(index)
    }

    /// Empty a slot and return what it held.
    pub fn remove_at(&mut self, index: usize) -> Result<ItemInstance, GearError> {
        self.check_index(index)?;
        if self.slots[index].is_none() {
            return Err(GearError::NotFound);
        }
        self.take_at(index)
    }

    /// Decrement stacks of `definition_id` by `amount`, lowest index first.
    ///
    /// Stacks that reach zero are removed. Fails without mutation when the
    /// total stock is smaller than `amount`.
    pub fn remove_quantity(
        &mut self,
        definition_id: &DefinitionId,
        amount: u32,
    ) -> Result<(), GearError> {
        if amount == 0 {
            return Err(GearError::InvalidQuantity {
                amount,
                reason: "removal amount must be positive",
            });
        }
        let available: u32 = self
            .iter()
            .filter(|(_, item)| item.is_stackable() && &item.definition_id == definition_id)
            .map(|(_, item)| item.quantity)
            .sum();
        if amount > available {
            return Err(GearError::InsufficientQuantity {
                definition: definition_id.clone(),
                requested: amount,
                available,
            });
        }

        let mut remaining = amount;
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            let drained = match slot {
                Some(stack) if stack.is_stackable() && &stack.definition_id == definition_id => {
                    let taken = remaining.min(stack.quantity);
                    stack.quantity -= taken;
                    remaining -= taken;
                    stack.quantity == 0
                }
                _ => false,
            };
            if drained {
                *slot = None;
            }
        }
        tracing::debug!(definition = %definition_id, amount, "removed quantity");
        Ok(())
    }

    /// Move the item at `from` to `to`, swapping if `to` is occupied.
    ///
    /// Succeeds as a no-op when both slots are empty.
    pub fn move_or_swap(&mut self, from: usize, to: usize) -> Result<(), GearError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        self.slots.swap(from, to);
        for index in [from, to] {
            if let Some(item) = self.slots[index].as_mut() {
                item.slot_index = Some(index);
            }
        }
        self.check_slot_indices();
        Ok(())
    }

    /// Split `amount` units off the stack at `index` into the lowest free slot.
    ///
    /// Returns the index of the new stack. `amount` must be in
    /// `1..quantity`.
    pub fn split(&mut self, index: usize, amount: u32) -> Result<usize, GearError> {
        self.check_index(index)?;
        let source = self.slots[index].as_ref().ok_or(GearError::NotFound)?;
        if !source.is_stackable() {
            return Err(GearError::InvalidQuantity {
                amount,
                reason: "equipment cannot be split",
            });
        }
        if amount == 0 || amount >= source.quantity {
            return Err(GearError::InvalidQuantity {
                amount,
                reason: "split amount must be between 1 and the stack size minus one",
            });
        }
        let target = self.first_free_index().ok_or(GearError::NoSpace)?;

        let mut split_off = source.clone();
        split_off.quantity = amount;
        split_off.slot_index = Some(target);
        if let Some(source) = self.slots[index].as_mut() {
            source.quantity -= amount;
        }
        self.slots[target] = Some(split_off);
        self.check_slot_indices();
        tracing::debug!(from = index, to = target, amount, "split stack");
        Ok(target)
    }

    /// Merge the stack at `source` into the stack at `target`, freeing `source`.
    pub fn merge(&mut self, source: usize, target: usize) -> Result<(), GearError> {
        self.check_index(source)?;
        self.check_index(target)?;
        if source == target {
            return Err(GearError::InvalidQuantity {
                amount: 0,
                reason: "cannot merge a stack into itself",
            });
        }
        let from = self.slots[source].as_ref().ok_or(GearError::NotFound)?;
        let into = self.slots[target].as_ref().ok_or(GearError::NotFound)?;
        if !ItemFactory::can_stack(into, from) {
            return Err(GearError::CannotStack(
                into.definition_id.clone(),
                from.definition_id.clone(),
            ));
        }

        let from = self.take_at(source)?;
        if let Some(into) = self.slots[target].as_mut() {
            ItemFactory::stack(into, &from)?;
        }
        self.check_slot_indices();
        Ok(())
    }

    /// Slot currently holding the instance, if any.
    pub fn slot_of(&self, id: InstanceId) -> Option<usize> {
        self.index_of_instance(id)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut Vec<Option<ItemInstance>> {
        &mut self.slots
    }

    fn take_at(&mut self, index: usize) -> Result<ItemInstance, GearError> {
        let mut item = self.slots[index].take().ok_or(GearError::NotFound)?;
        item.slot_index = None;
        Ok(item)
    }

    fn index_of_instance(&self, id: InstanceId) -> Option<usize> {
        self.iter()
            .find(|(_, item)| item.instance_id == Some(id))
            .map(|(i, _)| i)
    }

    fn stack_index(&self, definition_id: &DefinitionId) -> Option<usize> {
        self.iter()
            .find(|(_, item)| item.is_stackable() && &item.definition_id == definition_id)
            .map(|(i, _)| i)
    }

    fn check_index(&self, index: usize) -> Result<(), GearError> {
        if index >= self.capacity() {
            return Err(GearError::InvalidIndex {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// An equipment instance may occupy at most one slot.
    fn check_not_placed(&self, item: &ItemInstance) -> Result<(), GearError> {
        match item.instance_id {
            Some(id) if self.index_of_instance(id).is_some() => Err(GearError::AlreadyPlaced(id)),
            _ => Ok(()),
        }
    }

    fn check_slot_indices(&self) {
        debug_assert!(
            self.iter().all(|(i, item)| item.slot_index == Some(i)),
            "inventory slot index out of sync with storage position"
        );
    }
}

impl ItemStore for InventoryStore {
    fn slot_of(&self, id: InstanceId) -> Option<usize> {
        InventoryStore::slot_of(self, id)
    }

    fn has_free_slot(&self) -> bool {
        InventoryStore::has_free_slot(self)
    }

    fn remove_exact(&mut self, item: &ItemInstance) -> Result<ItemInstance, GearError> {
        InventoryStore::remove_exact(self, item)
    }

    fn add_at_slot(&mut self, item: ItemInstance, index: usize) -> Result<(), GearError> {
        InventoryStore::add_at_slot(self, item, index)
    }

    fn add_at_next_free(&mut self, item: ItemInstance) -> Result<usize, GearError> {
        InventoryStore::add_at_next_free(self, item)
    }
}
