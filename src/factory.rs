//! Item instance factory.
//!
//! Creates item instances from definition ids. Equipment gets a fresh
//! identity and an independently rolled stat block; stackables are plain
//! counted records. The random source is injected so rolls are
//! reproducible under a seeded RNG.

use crate::attribute::{AttributeMap, StatValue};
use crate::catalog::ItemCatalog;
use crate::config::GearConfig;
use crate::error::GearError;
use crate::ids::{DefinitionId, InstanceId};
use crate::item::{ItemInstance, StatGenerator};
use rand::Rng;

/// Builds [`ItemInstance`]s.
///
/// # Examples
///
/// ```rust
/// use zzgear::catalog::MemoryCatalog;
/// use zzgear::factory::ItemFactory;
/// use zzgear::item::{ItemDefinition, ItemType};
/// use zzgear::{DefinitionId, GearConfig};
///
/// let mut catalog = MemoryCatalog::new();
/// catalog.insert(ItemDefinition::new("potion", "Potion", ItemType::Consumable).stackable());
///
/// let factory = ItemFactory::new(&GearConfig::default());
/// let mut rng = rand::thread_rng();
/// let stack = factory.create(&catalog, &DefinitionId::new("potion"), 5, &mut rng).unwrap();
/// assert_eq!(stack.quantity, 5);
/// assert!(stack.instance_id.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ItemFactory {
    min_roll_floor: StatValue,
    allow_zero_rolls: bool,
}

impl ItemFactory {
    pub fn new(config: &GearConfig) -> Self {
        Self {
            min_roll_floor: config.min_roll_floor,
            allow_zero_rolls: config.allow_zero_rolls,
        }
    }

    /// Create an instance of `definition_id`.
    ///
    /// Equipment ignores `quantity` and is always created with quantity 1.
    pub fn create<R: Rng + ?Sized>(
        &self,
        catalog: &dyn ItemCatalog,
        definition_id: &DefinitionId,
        quantity: u32,
        rng: &mut R,
    ) -> Result<ItemInstance, GearError> {
        let definition = catalog.resolve(definition_id)?;

        if definition.is_equipment() {
            let stats = match &definition.stat_generator {
                Some(generator) => self.roll_stats(generator, rng),
                None => AttributeMap::new(),
            };
            tracing::trace!(definition = %definition_id, "created equipment instance");
            Ok(ItemInstance::equipment(definition_id.clone(), stats))
        } else {
            if quantity == 0 {
                return Err(GearError::InvalidQuantity {
                    amount: 0,
                    reason: "stacks must hold at least one unit",
                });
            }
            Ok(ItemInstance::stack(definition_id.clone(), quantity))
        }
    }

    /// Roll every declared stat independently, rounded to the nearest integer.
    pub fn roll_stats<R: Rng + ?Sized>(&self, generator: &StatGenerator, rng: &mut R) -> AttributeMap {
        let keep_zero = self.allow_zero_rolls || generator.allow_zero;
        generator
            .stats
            .iter()
            .map(|(kind, range)| {
                let (low, high) = if range.min <= range.max {
                    (range.min, range.max)
                } else {
                    (range.max, range.min)
                };
                let raw = if low == high {
                    low
                } else {
                    rng.gen_range(low..=high)
                };
                let mut value = raw.round();
                if !keep_zero && value <= 0.0 {
                    value = self.min_roll_floor;
                }
                (*kind, value)
            })
            .collect()
    }

    /// Two records can share a stack iff they have the same definition and
    /// neither carries an instance id.
    pub fn can_stack(a: &ItemInstance, b: &ItemInstance) -> bool {
        a.definition_id == b.definition_id && a.instance_id.is_none() && b.instance_id.is_none()
    }

    /// Move `source`'s units into `target`.
    ///
    /// The caller removes `source` from wherever it was stored.
    pub fn stack(target: &mut ItemInstance, source: &ItemInstance) -> Result<(), GearError> {
        if !Self::can_stack(target, source) {
            return Err(GearError::CannotStack(
                target.definition_id.clone(),
                source.definition_id.clone(),
            ));
        }
        target.quantity = target.quantity.saturating_add(source.quantity);
        Ok(())
    }

    /// Duplicate an equipment instance under a new identity.
    ///
    /// Used for rewards and drops. Stackables have no identity to clone.
    pub fn clone_instance(original: &ItemInstance) -> Result<ItemInstance, GearError> {
        if original.instance_id.is_none() {
            return Err(GearError::NotEquippable(original.definition_id.clone()));
        }
        Ok(ItemInstance {
            definition_id: original.definition_id.clone(),
            instance_id: Some(InstanceId::new()),
            quantity: 1,
            slot_index: None,
            generated_stats: original.generated_stats.clone(),
        })
    }
}

impl Default for ItemFactory {
    fn default() -> Self {
        Self::new(&GearConfig::default())
    }
}
