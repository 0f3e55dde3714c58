//! End-to-end tests through `GearService`.
//!
//! These tests verify:
//! - Unique placement of equipment instances across every mutation path
//! - Equip/unequip round trips
//! - Stack merging and splitting
//! - The leadership formula
//! - Debounced recompute coalescing and stale reads
//! - Preview point accounting
//! - Events, snapshots and class modifiers

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zzgear::catalog::MemoryCatalog;
use zzgear::class::{ClassModifiers, MemoryClassProvider};
use zzgear::debounce::ManualClock;
use zzgear::item::{ItemDefinition, ItemType, StatGenerator};
use zzgear::persistence::{MemorySink, PlayerSnapshot};
use zzgear::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixed(kind: AttributeKind, value: f64) -> StatGenerator {
    StatGenerator::new().with_stat(kind, value, value)
}

fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.insert(
        ItemDefinition::new("war_banner_blade", "War Banner Blade", ItemType::Weapon).with_generator(
            fixed(AttributeKind::Leadership, 999.0).with_stat(AttributeKind::Strength, 6.0, 6.0),
        ),
    );
    catalog.insert(
        ItemDefinition::new("iron_helm", "Iron Helm", ItemType::Helmet)
            .with_generator(fixed(AttributeKind::Armor, 3.0)),
    );
    catalog.insert(
        ItemDefinition::new("command_mail", "Command Mail", ItemType::Torso).with_generator(
            fixed(AttributeKind::Leadership, 50.0).with_stat(AttributeKind::Armor, 8.0, 8.0),
        ),
    );
    catalog.insert(
        ItemDefinition::new("march_boots", "March Boots", ItemType::Boots).with_generator(
            fixed(AttributeKind::Leadership, 20.0).with_stat(AttributeKind::Armor, 2.0, 2.0),
        ),
    );
    catalog.insert(ItemDefinition::new("herb", "Herb", ItemType::Consumable).stackable());
    catalog
}

struct Fixture {
    service: GearService,
    clock: ManualClock,
    hero: HeroKey,
    rng: StdRng,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(GearConfig::default())
    }

    fn with_config(config: GearConfig) -> Self {
        init_tracing();
        let clock = ManualClock::new();
        let mut service = GearService::new(config, Arc::new(catalog()))
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        let hero = HeroKey::new("captain");
        service.register_hero(
            hero.clone(),
            HeroBaseStats {
                strength: 10.0,
                dexterity: 7.0,
                armor: 4.0,
                vitality: 12.0,
                attribute_points: 5,
            },
        );
        Self {
            service,
            clock,
            hero,
            rng: StdRng::seed_from_u64(42),
        }
    }

    /// Create an item and put it into the hero's inventory.
    fn give(&mut self, definition: &str) -> ItemInstance {
        let item = self
            .service
            .create_item(&DefinitionId::new(definition), 1, &mut self.rng)
            .unwrap();
        self.service.give_item(&self.hero, item.clone()).unwrap();
        item
    }

    fn settle(&mut self) {
        self.clock.advance(Duration::from_millis(100));
        self.service.tick();
    }

    /// Every instance id and how many places hold it.
    fn placement_counts(&self) -> HashMap<InstanceId, usize> {
        let mut counts = HashMap::new();
        let inventory = self.service.inventory(&self.hero).unwrap();
        let equipment = self.service.equipment(&self.hero).unwrap();
        let ids = inventory
            .iter()
            .filter_map(|(_, item)| item.instance_id)
            .chain(equipment.all_equipped().filter_map(|(_, item)| item.instance_id));
        for id in ids {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// Placement invariants
// ============================================================================

#[test]
fn test_every_instance_has_exactly_one_place() {
    let mut fx = Fixture::new();
    let helm_a = fx.give("iron_helm");
    let helm_b = fx.give("iron_helm");
    let mail = fx.give("command_mail");
    fx.give("herb");
    let hero = fx.hero.clone();

    let all = [helm_a.instance_id, helm_b.instance_id, mail.instance_id];
    let check = |fx: &Fixture| {
        let counts = fx.placement_counts();
        for id in all.iter().flatten() {
            assert_eq!(counts.get(id), Some(&1), "instance {id} misplaced");
        }
        assert!(fx.service.validate_hero(&fx.hero).unwrap().is_empty());
    };

    fx.service.equip(&hero, &helm_a).unwrap();
    check(&fx);
    fx.service.equip(&hero, &helm_b).unwrap();
    check(&fx);
    fx.service.equip(&hero, &mail).unwrap();
    check(&fx);
    fx.service.move_item(&hero, 0, 5).unwrap();
    check(&fx);
    fx.service.unequip(&hero, EquipmentSlot::Helmet).unwrap();
    check(&fx);
    fx.service
        .swap(&hero, EquipmentSlot::Helmet, EquipmentSlot::Torso)
        .unwrap_err();
    check(&fx);
    fx.service.unequip(&hero, EquipmentSlot::Torso).unwrap();
    check(&fx);

    // Equipping something already equipped is rejected, not duplicated.
    fx.service.equip(&hero, &helm_a).unwrap();
    assert_eq!(
        fx.service.equip(&hero, &helm_a),
        Err(GearError::NotInInventory(helm_a.instance_id.unwrap()))
    );
    check(&fx);
}

#[test]
fn test_giving_a_placed_instance_again_is_rejected() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let helm = fx.give("iron_helm");
    let id = helm.instance_id.unwrap();

    // Already in the grid, whichever insertion path is used.
    assert_eq!(
        fx.service.give_item(&hero, helm.clone()),
        Err(GearError::AlreadyPlaced(id))
    );
    assert_eq!(
        fx.service.give_item_at(&hero, helm.clone(), 7),
        Err(GearError::AlreadyPlaced(id))
    );

    // Equipped instances cannot be put back into the inventory either.
    fx.service.equip(&hero, &helm).unwrap();
    assert_eq!(
        fx.service.give_item(&hero, helm.clone()),
        Err(GearError::AlreadyPlaced(id))
    );
    assert_eq!(
        fx.service.give_item_at(&hero, helm.clone(), 2),
        Err(GearError::AlreadyPlaced(id))
    );

    assert!(fx.service.inventory(&hero).unwrap().is_empty());
    assert_eq!(fx.placement_counts().get(&id), Some(&1));
    assert!(fx.service.validate_hero(&hero).unwrap().is_empty());
}

#[test]
fn test_noop_swap_is_silent() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let saves = MemorySink::new();
    fx.service.set_snapshot_sink(Box::new(saves.clone()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    fx.service
        .subscribe(move |event| seen.lock().unwrap().push(event.clone()));

    let helm = fx.give("iron_helm");
    fx.service.equip(&hero, &helm).unwrap();
    fx.settle();
    let recomputes = fx.service.recompute_count(&hero);
    let event_count = events.lock().unwrap().len();
    let save_count = saves.saved().len();

    for (first, second) in [
        (EquipmentSlot::Helmet, EquipmentSlot::Helmet),
        (EquipmentSlot::Gloves, EquipmentSlot::Pants),
    ] {
        let change = fx.service.swap(&hero, first, second).unwrap();
        assert!(change.is_noop());
    }

    assert!(!fx.service.is_recompute_pending(&hero));
    assert_eq!(events.lock().unwrap().len(), event_count);
    assert_eq!(saves.saved().len(), save_count);
    fx.settle();
    assert_eq!(fx.service.recompute_count(&hero), recomputes);
}

#[test]
fn test_equip_unequip_round_trip() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let mail = fx.give("command_mail");

    fx.service.equip(&hero, &mail).unwrap();
    assert!(fx.service.inventory(&hero).unwrap().is_empty());

    let change = fx.service.unequip(&hero, EquipmentSlot::Torso).unwrap();
    let inventory_slot = match change {
        EquipmentChange::Unequipped { inventory_slot, .. } => inventory_slot,
        other => panic!("expected an unequip, got {other:?}"),
    };

    let back = fx
        .service
        .inventory(&hero)
        .unwrap()
        .get(inventory_slot)
        .unwrap()
        .clone();
    assert_eq!(back.instance_id, mail.instance_id);
    assert_eq!(back.generated_stats, mail.generated_stats);
    assert_eq!(back.slot_index, Some(inventory_slot));
    assert!(fx.service.equipment(&hero).unwrap().get(EquipmentSlot::Torso).is_none());
}

#[test]
fn test_replaced_item_returns_to_vacated_slot() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let old = fx.give("iron_helm");
    fx.service.equip(&hero, &old).unwrap();

    fx.give("herb");
    let new = fx.give("iron_helm");
    let new_slot = fx
        .service
        .inventory(&hero)
        .unwrap()
        .slot_of(new.instance_id.unwrap())
        .unwrap();

    fx.service.equip(&hero, &new).unwrap();
    let inventory = fx.service.inventory(&hero).unwrap();
    assert_eq!(inventory.get(new_slot).unwrap().instance_id, old.instance_id);
}

#[test]
fn test_unequip_into_full_inventory_changes_nothing() {
    let mut fx = Fixture::with_config(GearConfig {
        inventory_capacity: 1,
        ..GearConfig::default()
    });
    let hero = fx.hero.clone();
    let helm = fx.give("iron_helm");
    fx.service.equip(&hero, &helm).unwrap();
    fx.give("command_mail");

    let before = fx.service.snapshot(&hero).unwrap();
    assert_eq!(
        fx.service.unequip(&hero, EquipmentSlot::Helmet),
        Err(GearError::NoSpace)
    );
    assert_eq!(fx.service.snapshot(&hero).unwrap(), before);
}

// ============================================================================
// Stacks
// ============================================================================

#[test]
fn test_merge_five_and_three() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    fx.service
        .give_item_at(&hero, ItemInstance::stack(DefinitionId::new("herb"), 5), 0)
        .unwrap();
    fx.service
        .give_item_at(&hero, ItemInstance::stack(DefinitionId::new("herb"), 3), 4)
        .unwrap();

    fx.service.merge_stacks(&hero, 4, 0).unwrap();
    let inventory = fx.service.inventory(&hero).unwrap();
    assert_eq!(inventory.get(0).unwrap().quantity, 8);
    assert!(inventory.get(4).is_none());
    assert_eq!(inventory.used_slots(), 1);
}

#[test]
fn test_split_ten_by_four() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let index = fx
        .service
        .give_item(&hero, ItemInstance::stack(DefinitionId::new("herb"), 10))
        .unwrap();

    for bad in [0, 10, 11] {
        assert!(matches!(
            fx.service.split_stack(&hero, index, bad),
            Err(GearError::InvalidQuantity { .. })
        ));
    }

    let new_index = fx.service.split_stack(&hero, index, 4).unwrap();
    assert_ne!(new_index, index);
    let inventory = fx.service.inventory(&hero).unwrap();
    assert_eq!(inventory.get(index).unwrap().quantity, 6);
    assert_eq!(inventory.get(new_index).unwrap().quantity, 4);
    assert_eq!(inventory.count(&DefinitionId::new("herb")), 10);
}

#[test]
fn test_remove_quantity_across_stacks() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let herb = DefinitionId::new("herb");
    fx.service
        .give_item(&hero, ItemInstance::stack(herb.clone(), 10))
        .unwrap();
    fx.service.split_stack(&hero, 0, 4).unwrap();

    fx.service.remove_quantity(&hero, &herb, 7).unwrap();
    assert_eq!(fx.service.inventory(&hero).unwrap().count(&herb), 3);
    assert!(matches!(
        fx.service.remove_quantity(&hero, &herb, 4),
        Err(GearError::InsufficientQuantity {
            requested: 4,
            available: 3,
            ..
        })
    ));
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_leadership_ignores_weapon() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    for definition in ["war_banner_blade", "command_mail", "march_boots"] {
        let item = fx.give(definition);
        fx.service.equip(&hero, &item).unwrap();
    }
    fx.settle();

    let attributes = fx.service.get_calculated_attributes(&hero).unwrap();
    assert_eq!(attributes.leadership(), 770.0);
    // The weapon still counts for everything else.
    assert_eq!(attributes.get(AttributeKind::Strength), 16.0);
    assert_eq!(attributes.get(AttributeKind::Armor), 14.0);
}

#[test]
fn test_three_equips_coalesce_into_one_recompute() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let items: Vec<_> = ["iron_helm", "command_mail", "march_boots"]
        .into_iter()
        .map(|definition| fx.give(definition))
        .collect();

    let before = fx.service.get_calculated_attributes(&hero).unwrap();
    assert_eq!(before.get(AttributeKind::Armor), 4.0);
    assert_eq!(fx.service.recompute_count(&hero), 1);

    for item in &items {
        fx.service.equip(&hero, item).unwrap();
        fx.clock.advance(Duration::from_millis(30));
    }

    // Still inside the window: the pre-change snapshot is served.
    let stale = fx.service.get_calculated_attributes(&hero).unwrap();
    assert!(Arc::ptr_eq(&before, &stale));
    assert!(fx.service.is_recompute_pending(&hero));
    assert_eq!(fx.service.recompute_count(&hero), 1);

    fx.clock.advance(Duration::from_millis(100));
    let fresh = fx.service.get_calculated_attributes(&hero).unwrap();
    assert_eq!(fresh.get(AttributeKind::Armor), 4.0 + 3.0 + 8.0 + 2.0);
    assert_eq!(fx.service.recompute_count(&hero), 2);
    assert!(!fx.service.is_recompute_pending(&hero));
}

#[test]
fn test_explicit_invalidate_recomputes_on_next_read() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let helm = fx.give("iron_helm");
    fx.service.get_calculated_attributes(&hero).unwrap();
    fx.service.equip(&hero, &helm).unwrap();

    fx.service.invalidate(&hero).unwrap();
    assert!(!fx.service.is_recompute_pending(&hero));
    let fresh = fx.service.get_calculated_attributes(&hero).unwrap();
    assert_eq!(fresh.get(AttributeKind::Armor), 7.0);
}

#[test]
fn test_overlay_point_accounting() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let helm = fx.give("iron_helm");
    fx.service.equip(&hero, &helm).unwrap();

    // base armor 4 + helm 3
    let floor = 7.0;
    assert_eq!(fx.service.get_available_points(&hero).unwrap(), 5.0);

    fx.service
        .apply_temp_change(&hero, AttributeKind::Armor, floor + 3.0)
        .unwrap();
    assert_eq!(fx.service.get_available_points(&hero).unwrap(), 2.0);
    let preview = fx.service.get_attributes_with_temp_changes(&hero).unwrap();
    assert_eq!(preview.get(AttributeKind::Armor), floor + 3.0);

    fx.service
        .apply_temp_change(&hero, AttributeKind::Armor, floor)
        .unwrap();
    assert_eq!(fx.service.get_available_points(&hero).unwrap(), 5.0);

    fx.service
        .apply_temp_change(&hero, AttributeKind::Strength, 12.0)
        .unwrap();
    fx.service.clear_temp_changes(&hero).unwrap();
    assert_eq!(fx.service.get_available_points(&hero).unwrap(), 5.0);
    assert_eq!(fx.service.base_stats(&hero).unwrap().strength, 10.0);
}

#[test]
fn test_class_modifiers_apply_last() {
    let mut classes = MemoryClassProvider::new();
    classes.insert(
        "vanguard",
        ClassModifiers::new()
            .multiply(AttributeKind::Armor, 2.0)
            .clamp_max(AttributeKind::Armor, 20.0),
    );
    let clock = ManualClock::new();
    let mut service = GearService::new(GearConfig::default(), Arc::new(catalog()))
        .unwrap()
        .with_clock(Arc::new(clock.clone()))
        .with_class_provider(Arc::new(classes));
    let hero = HeroKey::new("tank");
    service.register_hero(
        hero.clone(),
        HeroBaseStats {
            armor: 6.0,
            ..Default::default()
        },
    );
    service
        .set_class(&hero, Some(ClassId::new("vanguard")))
        .unwrap();

    assert_eq!(
        service
            .get_calculated_attributes(&hero)
            .unwrap()
            .get(AttributeKind::Armor),
        12.0
    );

    service.apply_temp_change(&hero, AttributeKind::Armor, 11.0).unwrap();
    let preview = service.get_attributes_with_temp_changes(&hero).unwrap();
    assert_eq!(preview.get(AttributeKind::Armor), 20.0);
}

// ============================================================================
// Events and persistence
// ============================================================================

#[test]
fn test_events_follow_mutations() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let listener = fx
        .service
        .subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let helm = fx.give("iron_helm");
    fx.service.equip(&hero, &helm).unwrap();
    fx.service.invalidate(&hero).unwrap();

    {
        let seen = events.lock().unwrap();
        assert!(matches!(seen[0], GearEvent::InventoryChanged { .. }));
        assert!(matches!(
            &seen[1],
            GearEvent::Equipped { slot: EquipmentSlot::Helmet, previous: None, .. }
        ));
        assert!(matches!(seen.last(), Some(GearEvent::CacheInvalidated { .. })));
    }

    assert!(fx.service.unsubscribe(listener));
    let count = events.lock().unwrap().len();
    fx.service.unequip(&hero, EquipmentSlot::Helmet).unwrap();
    assert_eq!(events.lock().unwrap().len(), count);
}

#[test]
fn test_snapshots_saved_and_restored() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let saves = MemorySink::new();
    fx.service.set_snapshot_sink(Box::new(saves.clone()));

    let mail = fx.give("command_mail");
    fx.service.equip(&hero, &mail).unwrap();
    fx.give("herb");
    assert_eq!(saves.saved().len(), 3);

    // Detached sink sees nothing further.
    fx.service.clear_snapshot_sink();
    fx.give("herb");
    assert_eq!(saves.saved().len(), 3);

    let latest = saves.latest().unwrap();
    let json = latest.to_json().unwrap();
    let restored = PlayerSnapshot::from_json(&json).unwrap();

    let mut fresh = GearService::new(GearConfig::default(), Arc::new(catalog())).unwrap();
    fresh.restore_hero(restored);
    assert!(fresh
        .equipment(&hero)
        .unwrap()
        .is_equipped(mail.instance_id.unwrap()));
    assert_eq!(
        fresh.inventory(&hero).unwrap().count(&DefinitionId::new("herb")),
        1
    );
    assert_eq!(fresh.get_calculated_attributes(&hero).unwrap().leadership(), 750.0);
}

#[test]
fn test_repair_after_corrupted_restore() {
    let mut fx = Fixture::new();
    let hero = fx.hero.clone();
    let mail = fx.give("command_mail");
    fx.service.equip(&hero, &mail).unwrap();

    // Simulate a save written mid-move: the equipped item also sits in slot 3.
    let mut saved = serde_json::to_value(fx.service.snapshot(&hero).unwrap()).unwrap();
    let mut stray = serde_json::to_value(&mail).unwrap();
    stray["slot_index"] = serde_json::json!(3);
    saved["inventory"]["slots"][3] = stray;
    let snapshot = PlayerSnapshot::from_json(&saved.to_string()).unwrap();
    fx.service.restore_hero(snapshot);

    assert_eq!(
        fx.service.validate_hero(&hero).unwrap(),
        vec![IntegrityError::DuplicateInstance {
            instance: mail.instance_id.unwrap(),
            count: 2
        }]
    );
    let report = fx.service.repair_hero(&hero).unwrap();
    assert_eq!(report.dropped_duplicates, 1);
    assert!(fx.service.validate_hero(&hero).unwrap().is_empty());
    assert!(fx.service.inventory(&hero).unwrap().is_empty());
}
