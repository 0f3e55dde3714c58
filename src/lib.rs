//! # zzgear - Hero Equipment, Inventory and Attribute Core
//!
//! Manages a hero's equipment, inventory placement and derived combat
//! attributes while keeping three guarantees:
//! - **Unique placement**: every equipment instance sits in exactly one
//!   place, an inventory slot or an equipment slot
//! - **Atomic mutations**: equip, unequip and swap either fully apply or
//!   leave nothing changed
//! - **Coherent cache**: cached attributes are replaced, never patched, and
//!   are never served as fresh after an input changed without a recompute
//!
//! ## Core Concepts
//!
//! ### Item flow
//!
//! ```text
//! [ItemFactory] → [InventoryStore] ⇄ [Equipment]
//! ```
//!
//! 1. **Factory** creates instances: equipment gets an identity and rolled
//!    stats, consumables are counted stacks
//! 2. **Inventory** places them in a fixed-capacity slot grid
//! 3. **Equipment** holds at most one instance per slot
//!
//! ### Attribute pipeline
//!
//! ```text
//! base + equipment bonus + preview delta → class modifiers → CalculatedAttributes
//! ```
//!
//! Leadership is derived: a configured base plus armor-slot contributions.
//! Weapons never add leadership.
//!
//! ### Caching
//!
//! Equipment changes arm a debounced recompute per hero; a burst of changes
//! inside the window collapses into one recompute. Base stat changes and
//! explicit invalidation drop the cached bundle at once.
//!
//! ## Example
//!
//! ```rust
//! use zzgear::*;
//! use zzgear::catalog::MemoryCatalog;
//! use zzgear::item::{ItemDefinition, ItemType, StatGenerator};
//! use std::sync::Arc;
//!
//! let mut catalog = MemoryCatalog::new();
//! catalog.insert(
//!     ItemDefinition::new("mail", "Chain Mail", ItemType::Torso)
//!         .with_generator(StatGenerator::new().with_stat(AttributeKind::Leadership, 50.0, 50.0)),
//! );
//!
//! let mut service = GearService::new(GearConfig::default(), Arc::new(catalog)).unwrap();
//! let hero = HeroKey::new("captain");
//! service.register_hero(hero.clone(), HeroBaseStats::default());
//!
//! let mail = service
//!     .create_item(&DefinitionId::new("mail"), 1, &mut rand::thread_rng())
//!     .unwrap();
//! service.give_item(&hero, mail.clone()).unwrap();
//! service.equip(&hero, &mail).unwrap();
//!
//! // The debounced recompute has not run yet; an uncached read computes directly.
//! let attributes = service.get_calculated_attributes(&hero).unwrap();
//! assert_eq!(attributes.leadership(), 750.0);
//! ```
//!
//! ## Modules
//!
//! - [`ids`] - Hero, definition, class and instance identifiers
//! - [`attribute`] - Attribute kinds and maps
//! - [`item`] - Item definitions and instances
//! - [`catalog`] - Item catalog boundary
//! - [`factory`] - Item instance factory
//! - [`inventory`] - Slot-indexed inventory store
//! - [`equipment`] - Equipment slots with atomic equip/unequip/swap
//! - [`class`] - Class modifier bundles
//! - [`calculator`] - Pure attribute calculation
//! - [`debounce`] - Per-key debounced jobs and clocks
//! - [`cache`] - Per-hero attribute cache
//! - [`overlay`] - Respec preview overlay
//! - [`events`] - Change events and the event bus
//! - [`integrity`] - Invariant validation and repair
//! - [`persistence`] - Snapshots and the save hook
//! - [`service`] - Session-scoped service tying it together
//! - [`config`] - Runtime configuration
//! - [`error`] - Error types

pub mod attribute;
pub mod cache;
pub mod calculator;
pub mod catalog;
pub mod class;
pub mod config;
pub mod debounce;
pub mod equipment;
pub mod error;
pub mod events;
pub mod factory;
pub mod ids;
pub mod integrity;
pub mod inventory;
pub mod item;
pub mod overlay;
pub mod persistence;
pub mod service;

// Re-export main types for convenience
pub use attribute::{AttributeKind, AttributeMap, StatValue};
pub use calculator::{CalculatedAttributes, HeroBaseStats};
pub use config::GearConfig;
pub use equipment::{Equipment, EquipmentChange, EquipmentSlot};
pub use error::{ConfigError, GearError, IntegrityError, SaveError};
pub use events::{GearEvent, ListenerId};
pub use ids::{ClassId, DefinitionId, HeroKey, InstanceId};
pub use inventory::{InventoryStore, ItemStore};
pub use item::{ItemDefinition, ItemInstance};
pub use service::GearService;
