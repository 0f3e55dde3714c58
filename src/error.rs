//! Error types.
//!
//! Every recoverable failure of an inventory, equipment, overlay or cache
//! operation is a [`GearError`]. Integrity violations found by the
//! validation pass are reported separately as [`IntegrityError`], because
//! they mean the data model was already inconsistent before the call.

use crate::attribute::AttributeKind;
use crate::equipment::EquipmentSlot;
use crate::ids::{DefinitionId, HeroKey, InstanceId};
use thiserror::Error;

/// Recoverable failures. None of these are fatal; callers decide whether
/// to surface a message.
///
/// # Examples
///
/// ```rust
/// use zzgear::GearError;
///
/// let err = GearError::NoSpace;
/// assert_eq!(err.to_string(), "Inventory is full: no free slot available");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GearError {
    /// The item cannot go into any equipment slot.
    #[error("Item {0} cannot be equipped")]
    NotEquippable(DefinitionId),

    /// The item to equip is not currently stored in the inventory.
    #[error("Item {0} is not in the inventory")]
    NotInInventory(InstanceId),

    /// Removing the item from the inventory failed before anything changed.
    #[error("Could not take item {0} out of the inventory")]
    RemovalFailed(InstanceId),

    /// The equipment slot holds nothing.
    #[error("Equipment slot {0} is empty")]
    SlotEmpty(EquipmentSlot),

    /// The instance is already placed in the inventory or equipped.
    #[error("Item {0} is already placed; an instance can only be in one place")]
    AlreadyPlaced(InstanceId),

    /// The inventory slot is already taken.
    #[error("Inventory slot {0} is already occupied")]
    SlotOccupied(usize),

    /// The inventory slot index is outside `[0, capacity)`.
    #[error("Inventory slot {index} is out of range (capacity {capacity})")]
    InvalidIndex { index: usize, capacity: usize },

    /// No free inventory slot exists.
    #[error("Inventory is full: no free slot available")]
    NoSpace,

    /// The replaced item could not be returned to the inventory.
    ///
    /// The operation was rolled back: no item was lost or duplicated.
    #[error(
        "No room to return {displaced} from {slot} to the inventory; equipment and inventory were restored"
    )]
    NoSpaceForSwappedItem {
        slot: EquipmentSlot,
        displaced: InstanceId,
    },

    /// Fewer units are stocked than were requested.
    #[error("Insufficient quantity of {definition}: requested {requested}, available {available}")]
    InsufficientQuantity {
        definition: DefinitionId,
        requested: u32,
        available: u32,
    },

    /// A split or removal amount is zero or out of range.
    #[error("Invalid quantity {amount}: {reason}")]
    InvalidQuantity { amount: u32, reason: &'static str },

    /// The requested item or stack does not exist.
    #[error("Item not found")]
    NotFound,

    /// The catalog does not know the definition id.
    #[error("Item definition not found: {0}")]
    DefinitionNotFound(DefinitionId),

    /// Two instances cannot be merged into one stack.
    #[error("Items {0} and {1} cannot be stacked together")]
    CannotStack(DefinitionId, DefinitionId),

    /// A direct slot swap would place an item into a slot that rejects it.
    #[error("Cannot swap {from} and {to}: an occupant does not fit the other slot")]
    SwapIncompatible {
        from: EquipmentSlot,
        to: EquipmentSlot,
    },

    /// Attribute points cannot be spent on a derived attribute.
    #[error("Attribute {0} cannot receive attribute points")]
    NotAllocatable(AttributeKind),

    /// The service has no state registered for this hero.
    #[error("Unknown hero: {0}")]
    UnknownHero(HeroKey),
}

/// Invariant violations detected by a validation pass.
///
/// These indicate corrupted state that existed before the call that found
/// them; they are never produced by a correct sequence of operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrityError {
    /// The same instance id appears in more than one place.
    #[error("Instance {instance} appears {count} times across inventory and equipment")]
    DuplicateInstance { instance: InstanceId, count: usize },

    /// An item's recorded slot index does not match the slot holding it.
    #[error("Item in slot {slot} records slot index {recorded:?}")]
    SlotIndexMismatch { slot: usize, recorded: Option<usize> },

    /// Equipment is stored without an instance id, or a stack carries one.
    #[error("Item {0} violates the instance-id/stackable rule")]
    IdentityMismatch(DefinitionId),
}

/// Failures while loading configuration or catalog data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures reported by a snapshot sink. The service logs these and
/// carries on.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Could not serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot backend failed: {0}")]
    Backend(String),
}
