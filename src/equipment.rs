//! Equipment slot manager.
//!
//! Holds at most one item per slot and moves items between the slots and
//! an [`ItemStore`]. Equip, unequip and swap are atomic: on any failure
//! after the first mutation, every change is undone before the error is
//! returned, so an instance is never lost or duplicated.

use crate::attribute::{AttributeKind, AttributeMap};
use crate::catalog::ItemCatalog;
use crate::error::GearError;
use crate::ids::InstanceId;
use crate::inventory::ItemStore;
use crate::item::{ItemCategory, ItemDefinition, ItemInstance, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter};

/// Named equipment slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Helmet,
    Torso,
    Gloves,
    Pants,
    Boots,
}

impl EquipmentSlot {
    /// Slots that contribute to leadership.
    pub const ARMOR: [EquipmentSlot; 5] = [
        EquipmentSlot::Helmet,
        EquipmentSlot::Torso,
        EquipmentSlot::Gloves,
        EquipmentSlot::Pants,
        EquipmentSlot::Boots,
    ];

    pub fn is_armor(self) -> bool {
        !matches!(self, EquipmentSlot::Weapon)
    }

    /// The key this slot is addressed by.
    pub fn key(self) -> SlotKey {
        let item_type = match self {
            EquipmentSlot::Weapon => ItemType::Weapon,
            EquipmentSlot::Helmet => ItemType::Helmet,
            EquipmentSlot::Torso => ItemType::Torso,
            EquipmentSlot::Gloves => ItemType::Gloves,
            EquipmentSlot::Pants => ItemType::Pants,
            EquipmentSlot::Boots => ItemType::Boots,
        };
        SlotKey {
            item_type,
            category: ItemCategory::Equipment,
        }
    }

    /// Resolve the concrete slot for an item's (type, category) pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzgear::equipment::{EquipmentSlot, SlotKey};
    /// use zzgear::item::{ItemCategory, ItemType};
    ///
    /// let key = SlotKey { item_type: ItemType::Boots, category: ItemCategory::Equipment };
    /// assert_eq!(EquipmentSlot::for_key(key), Some(EquipmentSlot::Boots));
    ///
    /// let cosmetic = SlotKey { item_type: ItemType::Boots, category: ItemCategory::Cosmetic };
    /// assert_eq!(EquipmentSlot::for_key(cosmetic), None);
    /// ```
    pub fn for_key(key: SlotKey) -> Option<EquipmentSlot> {
        if key.category != ItemCategory::Equipment {
            return None;
        }
        match key.item_type {
            ItemType::Weapon => Some(EquipmentSlot::Weapon),
            ItemType::Helmet => Some(EquipmentSlot::Helmet),
            ItemType::Torso => Some(EquipmentSlot::Torso),
            ItemType::Gloves => Some(EquipmentSlot::Gloves),
            ItemType::Pants => Some(EquipmentSlot::Pants),
            ItemType::Boots => Some(EquipmentSlot::Boots),
            ItemType::Consumable | ItemType::Visual => None,
        }
    }

    /// Slot for a definition, or `None` if it cannot be equipped at all.
    pub fn for_definition(definition: &ItemDefinition) -> Option<EquipmentSlot> {
        if !definition.is_equipment() {
            return None;
        }
        Self::for_key(SlotKey::of(definition))
    }

    pub fn accepts(self, definition: &ItemDefinition) -> bool {
        Self::for_definition(definition) == Some(self)
    }
}

/// (slot-type, slot-category) pair identifying an equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub item_type: ItemType,
    pub category: ItemCategory,
}

impl SlotKey {
    pub fn of(definition: &ItemDefinition) -> Self {
        Self {
            item_type: definition.item_type,
            category: definition.category,
        }
    }
}

/// What an equipment operation changed.
#[derive(Debug, Clone, PartialEq)]
pub enum EquipmentChange {
    Equipped {
        slot: EquipmentSlot,
        item: ItemInstance,
        previous: Option<ItemInstance>,
    },
    Unequipped {
        slot: EquipmentSlot,
        item: ItemInstance,
        /// Inventory slot the item landed in.
        inventory_slot: usize,
    },
    Swapped {
        first: EquipmentSlot,
        second: EquipmentSlot,
        /// False when both slots were empty or `first == second`.
        moved: bool,
    },
}

impl EquipmentChange {
    /// True when the change left equipment and inventory untouched.
    pub fn is_noop(&self) -> bool {
        matches!(self, EquipmentChange::Swapped { moved: false, .. })
    }
}

/// The items a hero is wearing.
///
/// # Examples
///
/// ```rust
/// use zzgear::catalog::MemoryCatalog;
/// use zzgear::equipment::{Equipment, EquipmentSlot};
/// use zzgear::inventory::InventoryStore;
/// use zzgear::item::{ItemDefinition, ItemInstance, ItemType};
/// use zzgear::{AttributeMap, DefinitionId};
///
/// let mut catalog = MemoryCatalog::new();
/// catalog.insert(ItemDefinition::new("cap", "Cap", ItemType::Helmet));
///
/// let mut inventory = InventoryStore::new(4);
/// let cap = ItemInstance::equipment(DefinitionId::new("cap"), AttributeMap::new());
/// inventory.add_at_next_free(cap.clone()).unwrap();
///
/// let mut equipment = Equipment::new();
/// equipment.equip(&cap, &mut inventory, &catalog).unwrap();
/// assert!(equipment.is_equipped(cap.instance_id.unwrap()));
/// assert!(inventory.is_empty());
///
/// equipment.unequip(EquipmentSlot::Helmet, &mut inventory).unwrap();
/// assert!(equipment.get(EquipmentSlot::Helmet).is_none());
/// assert_eq!(inventory.used_slots(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    slots: BTreeMap<EquipmentSlot, ItemInstance>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: EquipmentSlot) -> Option<&ItemInstance> {
        self.slots.get(&slot)
    }

    /// Every occupied slot, in slot order.
    pub fn all_equipped(&self) -> impl Iterator<Item = (EquipmentSlot, &ItemInstance)> {
        self.slots.iter().map(|(slot, item)| (*slot, item))
    }

    pub fn equipped_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_equipped(&self, id: InstanceId) -> bool {
        self.slot_of(id).is_some()
    }

    pub fn slot_of(&self, id: InstanceId) -> Option<EquipmentSlot> {
        self.slots
            .iter()
            .find(|(_, item)| item.instance_id == Some(id))
            .map(|(slot, _)| *slot)
    }

    /// Sum of rolled stats across equipped items.
    ///
    /// Every slot contributes to every attribute except leadership, which
    /// only armor slots contribute to.
    pub fn aggregate_bonuses(&self) -> AttributeMap {
        let mut bonuses = AttributeMap::new();
        for (slot, item) in self.all_equipped() {
            for (kind, value) in item.generated_stats.iter() {
                if kind == AttributeKind::Leadership && !slot.is_armor() {
                    continue;
                }
                bonuses.add(kind, value);
            }
        }
        bonuses
    }

    /// Equip `item`, which must currently sit in `store`.
    ///
    /// Any previous occupant returns to the slot `item` came from, or to
    /// the lowest free slot if that one was taken in the meantime. If it
    /// cannot be stored at all, the whole operation is rolled back and
    /// [`GearError::NoSpaceForSwappedItem`] is returned.
    pub fn equip<S: ItemStore + ?Sized>(
        &mut self,
        item: &ItemInstance,
        store: &mut S,
        catalog: &dyn ItemCatalog,
    ) -> Result<EquipmentChange, GearError> {
        let definition = catalog.resolve(&item.definition_id)?;
        let slot = EquipmentSlot::for_definition(definition)
            .ok_or_else(|| GearError::NotEquippable(item.definition_id.clone()))?;
        let id = item
            .instance_id
            .ok_or_else(|| GearError::NotEquippable(item.definition_id.clone()))?;

        let original_index = store.slot_of(id).ok_or(GearError::NotInInventory(id))?;
        let taken = store
            .remove_exact(item)
            .map_err(|_| GearError::RemovalFailed(id))?;

        let previous = self.slots.insert(slot, taken);

        if let Some(displaced) = previous.clone() {
            if let Err(err) = Self::return_to_store(store, displaced, original_index) {
                let displaced_id = previous
                    .as_ref()
                    .and_then(|p| p.instance_id)
                    .unwrap_or(id);
                tracing::warn!(%slot, instance = %id, error = %err, "equip rolled back");
                self.rollback_equip(slot, previous, store, original_index);
                return Err(GearError::NoSpaceForSwappedItem {
                    slot,
                    displaced: displaced_id,
                });
            }
        }

        let equipped = self.slots.get(&slot).cloned().ok_or(GearError::NotFound)?;
        tracing::debug!(%slot, instance = %id, replaced = previous.is_some(), "equipped");
        Ok(EquipmentChange::Equipped {
            slot,
            item: equipped,
            previous: previous.map(|mut p| {
                p.slot_index = None;
                p
            }),
        })
    }

    /// Move the occupant of `slot` into the lowest free slot of `store`.
    pub fn unequip<S: ItemStore + ?Sized>(
        &mut self,
        slot: EquipmentSlot,
        store: &mut S,
    ) -> Result<EquipmentChange, GearError> {
        if !self.slots.contains_key(&slot) {
            return Err(GearError::SlotEmpty(slot));
        }
        if !store.has_free_slot() {
            return Err(GearError::NoSpace);
        }

        let item = self.slots.remove(&slot).ok_or(GearError::SlotEmpty(slot))?;
        match store.add_at_next_free(item.clone()) {
            Ok(inventory_slot) => {
                tracing::debug!(%slot, inventory_slot, "unequipped");
                Ok(EquipmentChange::Unequipped {
                    slot,
                    item,
                    inventory_slot,
                })
            }
            Err(err) => {
                self.slots.insert(slot, item);
                Err(err)
            }
        }
    }

    /// Exchange the occupants of two slots.
    ///
    /// Each occupant must fit the other slot; otherwise nothing changes.
    pub fn swap(
        &mut self,
        first: EquipmentSlot,
        second: EquipmentSlot,
        catalog: &dyn ItemCatalog,
    ) -> Result<EquipmentChange, GearError> {
        let fits = |item: Option<&ItemInstance>, target: EquipmentSlot| -> Result<bool, GearError> {
            match item {
                None => Ok(true),
                Some(item) => Ok(target.accepts(catalog.resolve(&item.definition_id)?)),
            }
        };
        if !fits(self.slots.get(&first), second)? || !fits(self.slots.get(&second), first)? {
            return Err(GearError::SwapIncompatible {
                from: first,
                to: second,
            });
        }

        let moved = first != second
            && (self.slots.contains_key(&first) || self.slots.contains_key(&second));
        if moved {
            let a = self.slots.remove(&first);
            let b = self.slots.remove(&second);
            if let Some(a) = a {
                self.slots.insert(second, a);
            }
            if let Some(b) = b {
                self.slots.insert(first, b);
            }
            tracing::debug!(%first, %second, "swapped equipment slots");
        }
        Ok(EquipmentChange::Swapped {
            first,
            second,
            moved,
        })
    }

    pub(crate) fn slots_mut(&mut self) -> &mut BTreeMap<EquipmentSlot, ItemInstance> {
        &mut self.slots
    }

    fn return_to_store<S: ItemStore + ?Sized>(
        store: &mut S,
        item: ItemInstance,
        preferred: usize,
    ) -> Result<(), GearError> {
        match store.add_at_slot(item.clone(), preferred) {
            Ok(()) => Ok(()),
            Err(GearError::SlotOccupied(_)) => store.add_at_next_free(item).map(|_| ()),
            Err(err) => Err(err),
        }
    }

    fn rollback_equip<S: ItemStore + ?Sized>(
        &mut self,
        slot: EquipmentSlot,
        previous: Option<ItemInstance>,
        store: &mut S,
        original_index: usize,
    ) {
        let restored = match previous {
            Some(previous) => self.slots.insert(slot, previous),
            None => self.slots.remove(&slot),
        };
        if let Some(item) = restored {
            if let Err(err) = Self::return_to_store(store, item, original_index) {
                tracing::error!(%slot, error = %err, "could not restore item during rollback");
            }
        }
    }
}
