//! Item definitions and item instances.
//!
//! An [`ItemDefinition`] is static catalog data. An [`ItemInstance`] is a
//! concrete, owned record: equipment instances carry their own identity and
//! rolled stats, stackable instances are just a definition id and a count.

use crate::attribute::{AttributeKind, AttributeMap, StatValue};
use crate::ids::{DefinitionId, InstanceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

/// What kind of thing an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemType {
    Weapon,
    Helmet,
    Torso,
    Gloves,
    Pants,
    Boots,
    Consumable,
    /// Cosmetic appearance items.
    Visual,
}

/// Broad grouping used together with [`ItemType`] to pick an equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemCategory {
    /// Combat gear that occupies a real equipment slot.
    #[default]
    Equipment,
    /// Appearance-only items.
    Cosmetic,
    Consumable,
    Material,
}

/// Item rarity tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Inclusive numeric range a stat is rolled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: StatValue,
    pub max: StatValue,
}

impl StatRange {
    pub fn new(min: StatValue, max: StatValue) -> Self {
        Self { min, max }
    }
}

/// Declares which stats an equipment instance rolls on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatGenerator {
    pub stats: BTreeMap<AttributeKind, StatRange>,
    /// Keep rolls at or below zero instead of lifting them to the floor.
    #[serde(default)]
    pub allow_zero: bool,
}

impl StatGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stat(mut self, kind: AttributeKind, min: StatValue, max: StatValue) -> Self {
        self.stats.insert(kind, StatRange::new(min, max));
        self
    }

    pub fn allowing_zero(mut self) -> Self {
        self.allow_zero = true;
        self
    }
}

/// Static item template owned by the catalog.
///
/// # Examples
///
/// ```rust
/// use zzgear::item::{ItemDefinition, ItemType, Rarity, StatGenerator};
/// use zzgear::AttributeKind;
///
/// let helm = ItemDefinition::new("iron_helm", "Iron Helm", ItemType::Helmet)
///     .with_rarity(Rarity::Rare)
///     .with_generator(StatGenerator::new().with_stat(AttributeKind::Armor, 3.0, 6.0));
/// assert!(!helm.stackable);
///
/// let potion = ItemDefinition::new("potion", "Potion", ItemType::Consumable).stackable();
/// assert!(potion.stackable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub category: ItemCategory,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub stat_generator: Option<StatGenerator>,
}

impl ItemDefinition {
    /// Create a non-stackable definition. Consumables default to the
    /// consumable category, visuals to cosmetic.
    pub fn new(id: impl Into<DefinitionId>, name: impl Into<String>, item_type: ItemType) -> Self {
        let category = match item_type {
            ItemType::Consumable => ItemCategory::Consumable,
            ItemType::Visual => ItemCategory::Cosmetic,
            _ => ItemCategory::Equipment,
        };
        Self {
            id: id.into(),
            name: name.into(),
            item_type,
            category,
            rarity: Rarity::default(),
            stackable: false,
            stat_generator: None,
        }
    }

    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_generator(mut self, generator: StatGenerator) -> Self {
        self.stat_generator = Some(generator);
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    /// Non-stackable items have an identity and may be equipped.
    pub fn is_equipment(&self) -> bool {
        !self.stackable
    }
}

/// A concrete item record.
///
/// `instance_id` is present iff the item is equipment, in which case
/// `quantity` is always 1. `slot_index` is set while the item sits in an
/// inventory and cleared while it is equipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub definition_id: DefinitionId,
    pub instance_id: Option<InstanceId>,
    pub quantity: u32,
    pub slot_index: Option<usize>,
    #[serde(default)]
    pub generated_stats: AttributeMap,
}

impl ItemInstance {
    /// Build an equipment instance with a fresh identity.
    pub fn equipment(definition_id: DefinitionId, generated_stats: AttributeMap) -> Self {
        Self {
            definition_id,
            instance_id: Some(InstanceId::new()),
            quantity: 1,
            slot_index: None,
            generated_stats,
        }
    }

    /// Build a stackable record.
    pub fn stack(definition_id: DefinitionId, quantity: u32) -> Self {
        Self {
            definition_id,
            instance_id: None,
            quantity,
            slot_index: None,
            generated_stats: AttributeMap::new(),
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.instance_id.is_none()
    }

    /// Identity match: same instance id for equipment, same definition for stacks.
    pub fn same_item(&self, other: &ItemInstance) -> bool {
        match (self.instance_id, other.instance_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.definition_id == other.definition_id,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories() {
        let boots = ItemDefinition::new("boots", "Boots", ItemType::Boots);
        assert_eq!(boots.category, ItemCategory::Equipment);
        let dye = ItemDefinition::new("dye", "Red Dye", ItemType::Visual);
        assert_eq!(dye.category, ItemCategory::Cosmetic);
    }

    #[test]
    fn test_equipment_instance_has_identity() {
        let item = ItemInstance::equipment(DefinitionId::new("sword"), AttributeMap::new());
        assert!(item.instance_id.is_some());
        assert_eq!(item.quantity, 1);
        assert!(!item.is_stackable());
    }

    #[test]
    fn test_same_item() {
        let a = ItemInstance::equipment(DefinitionId::new("sword"), AttributeMap::new());
        let b = ItemInstance::equipment(DefinitionId::new("sword"), AttributeMap::new());
        assert!(a.same_item(&a.clone()));
        assert!(!a.same_item(&b));

        let p1 = ItemInstance::stack(DefinitionId::new("potion"), 2);
        let p2 = ItemInstance::stack(DefinitionId::new("potion"), 7);
        assert!(p1.same_item(&p2));
    }

    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "id": "oak_bow",
            "name": "Oak Bow",
            "item_type": "weapon",
            "rarity": "uncommon",
            "stat_generator": { "stats": { "dexterity": { "min": 2.0, "max": 5.0 } } }
        }"#;
        let def: ItemDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.item_type, ItemType::Weapon);
        assert_eq!(def.category, ItemCategory::Equipment);
        assert!(!def.stackable);
        let generator = def.stat_generator.unwrap();
        assert_eq!(generator.stats[&AttributeKind::Dexterity].max, 5.0);
    }
}
