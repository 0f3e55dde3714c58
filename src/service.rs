//! Session-scoped gear service.
//!
//! [`GearService`] owns every hero's inventory and equipment together with
//! the attribute cache, the preview overlay, the event bus and the optional
//! hooks. Construct one per session; dropping it ends the session.
//!
//! The service is driven cooperatively. Equipment changes arm a debounced
//! recompute instead of recomputing at once; due recomputes run inside
//! [`GearService::tick`] and at the start of every attribute read.

use crate::attribute::{AttributeKind, AttributeMap, StatValue};
use crate::cache::AttributeCache;
use crate::calculator::{calculate, CalculatedAttributes, HeroBaseStats};
use crate::catalog::ItemCatalog;
use crate::class::{ClassModifiers, ClassProvider};
use crate::config::GearConfig;
use crate::debounce::{Clock, SystemClock};
use crate::equipment::{Equipment, EquipmentChange, EquipmentSlot};
use crate::error::{ConfigError, GearError, IntegrityError};
use crate::events::{EventBus, GearEvent, ListenerId};
use crate::factory::ItemFactory;
use crate::ids::{ClassId, DefinitionId, HeroKey};
use crate::integrity::{self, RepairReport};
use crate::inventory::InventoryStore;
use crate::item::ItemInstance;
use crate::overlay::TempOverlay;
use crate::persistence::{PlayerSnapshot, SnapshotSink};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback run when the host switches game phase (scene, mode, ...).
pub type PhaseHandler = Box<dyn FnMut(&str) + Send>;

#[derive(Debug, Clone)]
struct HeroState {
    class_id: Option<ClassId>,
    base: HeroBaseStats,
    inventory: InventoryStore,
    equipment: Equipment,
}

impl HeroState {
    fn class_modifiers<'a>(&self, classes: Option<&'a dyn ClassProvider>) -> Option<&'a ClassModifiers> {
        let class_id = self.class_id.as_ref()?;
        classes?.class_modifiers(class_id)
    }

    /// Inventory insertions must not duplicate an equipped instance.
    fn check_not_equipped(&self, item: &ItemInstance) -> Result<(), GearError> {
        match item.instance_id {
            Some(id) if self.equipment.is_equipped(id) => Err(GearError::AlreadyPlaced(id)),
            _ => Ok(()),
        }
    }

    fn calculate(
        &self,
        classes: Option<&dyn ClassProvider>,
        overlay: Option<&AttributeMap>,
        leadership_base: StatValue,
    ) -> CalculatedAttributes {
        calculate(
            &self.base,
            &self.equipment.aggregate_bonuses(),
            overlay,
            self.class_modifiers(classes),
            leadership_base,
        )
    }
}

fn hero_state<'a>(
    heroes: &'a HashMap<HeroKey, HeroState>,
    hero: &HeroKey,
) -> Result<&'a HeroState, GearError> {
    heroes
        .get(hero)
        .ok_or_else(|| GearError::UnknownHero(hero.clone()))
}

fn hero_state_mut<'a>(
    heroes: &'a mut HashMap<HeroKey, HeroState>,
    hero: &HeroKey,
) -> Result<&'a mut HeroState, GearError> {
    heroes
        .get_mut(hero)
        .ok_or_else(|| GearError::UnknownHero(hero.clone()))
}

/// Gear state for one session.
///
/// # Examples
///
/// ```rust
/// use zzgear::calculator::HeroBaseStats;
/// use zzgear::catalog::MemoryCatalog;
/// use zzgear::item::{ItemDefinition, ItemType};
/// use zzgear::service::GearService;
/// use zzgear::{AttributeKind, DefinitionId, GearConfig, HeroKey};
/// use std::sync::Arc;
///
/// let mut catalog = MemoryCatalog::new();
/// catalog.insert(ItemDefinition::new("cap", "Cap", ItemType::Helmet));
///
/// let mut service = GearService::new(GearConfig::default(), Arc::new(catalog)).unwrap();
/// let hero = HeroKey::new("knight");
/// service.register_hero(hero.clone(), HeroBaseStats { strength: 10.0, ..Default::default() });
///
/// let cap = service
///     .create_item(&DefinitionId::new("cap"), 1, &mut rand::thread_rng())
///     .unwrap();
/// service.give_item(&hero, cap.clone()).unwrap();
/// service.equip(&hero, &cap).unwrap();
///
/// let attributes = service.get_calculated_attributes(&hero).unwrap();
/// assert_eq!(attributes.get(AttributeKind::Strength), 10.0);
/// ```
pub struct GearService {
    config: GearConfig,
    catalog: Arc<dyn ItemCatalog>,
    classes: Option<Arc<dyn ClassProvider>>,
    clock: Arc<dyn Clock>,
    factory: ItemFactory,
    heroes: HashMap<HeroKey, HeroState>,
    cache: AttributeCache,
    overlay: TempOverlay,
    bus: EventBus,
    phase_handlers: Vec<PhaseHandler>,
    sink: Option<Box<dyn SnapshotSink>>,
}

impl GearService {
    /// Start a session. Fails if `config` does not validate.
    pub fn new(config: GearConfig, catalog: Arc<dyn ItemCatalog>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            factory: ItemFactory::new(&config),
            cache: AttributeCache::new(config.debounce_delay()),
            config,
            catalog,
            classes: None,
            clock: Arc::new(SystemClock),
            heroes: HashMap::new(),
            overlay: TempOverlay::new(),
            bus: EventBus::new(),
            phase_handlers: Vec::new(),
            sink: None,
        })
    }

    /// Replace the time source. Tests pass a [`ManualClock`](crate::debounce::ManualClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_class_provider(mut self, classes: Arc<dyn ClassProvider>) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn config(&self) -> &GearConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn ItemCatalog {
        self.catalog.as_ref()
    }

    // ----- heroes -----

    /// Register a hero with an empty inventory and no equipment.
    ///
    /// Registering an existing key replaces its state and drops its cached
    /// and preview data.
    pub fn register_hero(&mut self, hero: HeroKey, base: HeroBaseStats) {
        self.forget_derived(&hero);
        let state = HeroState {
            class_id: None,
            base,
            inventory: InventoryStore::new(self.config.inventory_capacity),
            equipment: Equipment::new(),
        };
        tracing::debug!(%hero, "hero registered");
        self.heroes.insert(hero, state);
    }

    /// Restore a hero from a saved snapshot.
    pub fn restore_hero(&mut self, snapshot: PlayerSnapshot) {
        self.forget_derived(&snapshot.hero);
        let state = HeroState {
            class_id: snapshot.class_id,
            base: snapshot.base_stats,
            inventory: snapshot.inventory,
            equipment: snapshot.equipment,
        };
        self.heroes.insert(snapshot.hero, state);
    }

    pub fn remove_hero(&mut self, hero: &HeroKey) -> bool {
        self.forget_derived(hero);
        self.heroes.remove(hero).is_some()
    }

    pub fn has_hero(&self, hero: &HeroKey) -> bool {
        self.heroes.contains_key(hero)
    }

    pub fn set_class(&mut self, hero: &HeroKey, class_id: Option<ClassId>) -> Result<(), GearError> {
        hero_state_mut(&mut self.heroes, hero)?.class_id = class_id;
        self.invalidate(hero)
    }

    pub fn base_stats(&self, hero: &HeroKey) -> Result<&HeroBaseStats, GearError> {
        Ok(&hero_state(&self.heroes, hero)?.base)
    }

    /// Commit new base stats. The cached bundle is dropped immediately.
    pub fn set_base_stats(&mut self, hero: &HeroKey, base: HeroBaseStats) -> Result<(), GearError> {
        hero_state_mut(&mut self.heroes, hero)?.base = base;
        self.invalidate(hero)?;
        self.persist(hero);
        Ok(())
    }

    pub fn inventory(&self, hero: &HeroKey) -> Result<&InventoryStore, GearError> {
        Ok(&hero_state(&self.heroes, hero)?.inventory)
    }

    pub fn equipment(&self, hero: &HeroKey) -> Result<&Equipment, GearError> {
        Ok(&hero_state(&self.heroes, hero)?.equipment)
    }

    pub fn snapshot(&self, hero: &HeroKey) -> Result<PlayerSnapshot, GearError> {
        let state = hero_state(&self.heroes, hero)?;
        Ok(PlayerSnapshot {
            hero: hero.clone(),
            class_id: state.class_id.clone(),
            base_stats: state.base.clone(),
            inventory: state.inventory.clone(),
            equipment: state.equipment.clone(),
        })
    }

    // ----- items and inventory -----

    pub fn create_item<R: Rng + ?Sized>(
        &self,
        definition_id: &DefinitionId,
        quantity: u32,
        rng: &mut R,
    ) -> Result<ItemInstance, GearError> {
        self.factory
            .create(self.catalog.as_ref(), definition_id, quantity, rng)
    }

    /// Put an item into the hero's lowest free slot (merging stacks first).
    pub fn give_item(&mut self, hero: &HeroKey, item: ItemInstance) -> Result<usize, GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        state.check_not_equipped(&item)?;
        let index = state.inventory.add_at_next_free(item)?;
        self.inventory_changed(hero);
        Ok(index)
    }

    pub fn give_item_at(&mut self, hero: &HeroKey, item: ItemInstance, index: usize) -> Result<(), GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        state.check_not_equipped(&item)?;
        state.inventory.add_at_slot(item, index)?;
        self.inventory_changed(hero);
        Ok(())
    }

    pub fn remove_item(&mut self, hero: &HeroKey, item: &ItemInstance) -> Result<ItemInstance, GearError> {
        let removed = hero_state_mut(&mut self.heroes, hero)?
            .inventory
            .remove_exact(item)?;
        self.inventory_changed(hero);
        Ok(removed)
    }

    pub fn remove_quantity(
        &mut self,
        hero: &HeroKey,
        definition_id: &DefinitionId,
        amount: u32,
    ) -> Result<(), GearError> {
        hero_state_mut(&mut self.heroes, hero)?
            .inventory
            .remove_quantity(definition_id, amount)?;
        self.inventory_changed(hero);
        Ok(())
    }

    pub fn move_item(&mut self, hero: &HeroKey, from: usize, to: usize) -> Result<(), GearError> {
        hero_state_mut(&mut self.heroes, hero)?
            .inventory
            .move_or_swap(from, to)?;
        self.inventory_changed(hero);
        Ok(())
    }

    pub fn split_stack(&mut self, hero: &HeroKey, index: usize, amount: u32) -> Result<usize, GearError> {
        let new_index = hero_state_mut(&mut self.heroes, hero)?
            .inventory
            .split(index, amount)?;
        self.inventory_changed(hero);
        Ok(new_index)
    }

    pub fn merge_stacks(&mut self, hero: &HeroKey, source: usize, target: usize) -> Result<(), GearError> {
        hero_state_mut(&mut self.heroes, hero)?
            .inventory
            .merge(source, target)?;
        self.inventory_changed(hero);
        Ok(())
    }

    // ----- equipment -----

    pub fn equip(&mut self, hero: &HeroKey, item: &ItemInstance) -> Result<EquipmentChange, GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        let change = state
            .equipment
            .equip(item, &mut state.inventory, self.catalog.as_ref())?;
        self.equipment_changed(hero, &change);
        Ok(change)
    }

    pub fn unequip(&mut self, hero: &HeroKey, slot: EquipmentSlot) -> Result<EquipmentChange, GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        let change = state.equipment.unequip(slot, &mut state.inventory)?;
        self.equipment_changed(hero, &change);
        Ok(change)
    }

    pub fn swap(
        &mut self,
        hero: &HeroKey,
        first: EquipmentSlot,
        second: EquipmentSlot,
    ) -> Result<EquipmentChange, GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        let change = state.equipment.swap(first, second, self.catalog.as_ref())?;
        self.equipment_changed(hero, &change);
        Ok(change)
    }

    // ----- attributes -----

    /// Calculated attributes for `hero`, served from the cache when possible.
    ///
    /// While a debounced recompute is pending the previous snapshot is
    /// returned; once it is due it runs before the read.
    pub fn get_calculated_attributes(
        &mut self,
        hero: &HeroKey,
    ) -> Result<Arc<CalculatedAttributes>, GearError> {
        self.tick();
        let state = hero_state(&self.heroes, hero)?;
        let classes = self.classes.as_deref();
        let leadership_base = self.config.leadership_base;
        Ok(self
            .cache
            .get_or_compute(hero, || state.calculate(classes, None, leadership_base)))
    }

    /// Drop the cached bundle for `hero` right away.
    pub fn invalidate(&mut self, hero: &HeroKey) -> Result<(), GearError> {
        hero_state(&self.heroes, hero)?;
        self.cache.invalidate(hero);
        self.bus.publish(&GearEvent::CacheInvalidated { hero: hero.clone() });
        Ok(())
    }

    pub fn is_recompute_pending(&self, hero: &HeroKey) -> bool {
        self.cache.is_recompute_pending(hero)
    }

    pub fn recompute_count(&self, hero: &HeroKey) -> u64 {
        self.cache.recompute_count(hero)
    }

    /// Run every debounced recompute that is due. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let due = self.cache.take_due(self.clock.now());
        let mut ran = 0;
        for hero in due {
            let Some(state) = self.heroes.get(&hero) else {
                continue;
            };
            let calculated =
                state.calculate(self.classes.as_deref(), None, self.config.leadership_base);
            self.cache.store(hero.clone(), calculated);
            self.bus.publish(&GearEvent::CacheInvalidated { hero });
            ran += 1;
        }
        ran
    }

    // ----- preview overlay -----

    pub fn apply_temp_change(
        &mut self,
        hero: &HeroKey,
        kind: AttributeKind,
        proposed: StatValue,
    ) -> Result<(), GearError> {
        hero_state(&self.heroes, hero)?;
        self.overlay.apply_temp_change(hero, kind, proposed)
    }

    /// Abandon the preview for `hero`. Base stats are untouched.
    pub fn clear_temp_changes(&mut self, hero: &HeroKey) -> Result<(), GearError> {
        hero_state(&self.heroes, hero)?;
        self.overlay.clear_temp_changes(hero);
        Ok(())
    }

    pub fn get_available_points(&self, hero: &HeroKey) -> Result<StatValue, GearError> {
        let state = hero_state(&self.heroes, hero)?;
        Ok(self
            .overlay
            .available_points(hero, &state.base, &state.equipment.aggregate_bonuses()))
    }

    /// Attributes as they would be with the preview committed. The cache
    /// is neither read nor written.
    pub fn get_attributes_with_temp_changes(
        &self,
        hero: &HeroKey,
    ) -> Result<CalculatedAttributes, GearError> {
        let state = hero_state(&self.heroes, hero)?;
        let mut calculated = state.calculate(
            self.classes.as_deref(),
            self.overlay.get(hero),
            self.config.leadership_base,
        );
        calculated.attribute_points = self
            .get_available_points(hero)?
            .max(0.0)
            .floor() as u32;
        Ok(calculated)
    }

    // ----- events and hooks -----

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GearEvent) + Send + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn register_on_phase_changed<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.phase_handlers.push(Box::new(handler));
    }

    /// Tell every registered phase handler that the host changed phase.
    pub fn notify_phase_changed(&mut self, phase: &str) {
        tracing::debug!(phase, handlers = self.phase_handlers.len(), "phase changed");
        for handler in &mut self.phase_handlers {
            handler(phase);
        }
    }

    /// Install the save hook called after every successful mutation.
    pub fn set_snapshot_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_snapshot_sink(&mut self) {
        self.sink = None;
    }

    // ----- integrity -----

    pub fn validate_hero(&self, hero: &HeroKey) -> Result<Vec<IntegrityError>, GearError> {
        let state = hero_state(&self.heroes, hero)?;
        Ok(integrity::validate(&state.inventory, &state.equipment))
    }

    /// Best-effort repair of a hero's state. Invalidates the cache if
    /// anything changed.
    pub fn repair_hero(&mut self, hero: &HeroKey) -> Result<RepairReport, GearError> {
        let state = hero_state_mut(&mut self.heroes, hero)?;
        let report = integrity::repair(&mut state.inventory, &mut state.equipment);
        if !report.is_clean() {
            tracing::warn!(%hero, ?report, "repaired hero gear state");
            self.invalidate(hero)?;
            self.persist(hero);
        }
        Ok(report)
    }

    // ----- internals -----

    fn forget_derived(&mut self, hero: &HeroKey) {
        self.cache.remove(hero);
        self.overlay.clear_temp_changes(hero);
    }

    fn inventory_changed(&mut self, hero: &HeroKey) {
        self.bus.publish(&GearEvent::InventoryChanged { hero: hero.clone() });
        self.persist(hero);
    }

    fn equipment_changed(&mut self, hero: &HeroKey, change: &EquipmentChange) {
        if change.is_noop() {
            return;
        }
        let event = match change {
            EquipmentChange::Equipped {
                slot,
                item,
                previous,
            } => GearEvent::Equipped {
                hero: hero.clone(),
                slot: *slot,
                item: item.clone(),
                previous: previous.clone(),
            },
            EquipmentChange::Unequipped { slot, item, .. } => GearEvent::Unequipped {
                hero: hero.clone(),
                slot: *slot,
                item: item.clone(),
            },
            EquipmentChange::Swapped { first, second, .. } => GearEvent::Swapped {
                hero: hero.clone(),
                first: *first,
                second: *second,
            },
        };
        self.cache.schedule(hero, self.clock.now());
        self.bus.publish(&event);
        if !matches!(change, EquipmentChange::Swapped { .. }) {
            self.bus.publish(&GearEvent::InventoryChanged { hero: hero.clone() });
        }
        self.persist(hero);
    }

    fn persist(&mut self, hero: &HeroKey) {
        if self.sink.is_none() {
            return;
        }
        let snapshot = match self.snapshot(hero) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%hero, error = %err, "could not build snapshot");
                return;
            }
        };
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.save(&snapshot) {
                tracing::warn!(%hero, error = %err, "snapshot save failed");
            }
        }
    }
}
