//! Respec example: previewing attribute points and debounced recomputes
//!
//! This example demonstrates:
//! - Previewing point spending without touching the cache
//! - Class modifiers applied after the preview
//! - A burst of equips collapsing into one recompute
//! - Subscribing to change events

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use zzgear::catalog::MemoryCatalog;
use zzgear::class::{ClassModifiers, MemoryClassProvider};
use zzgear::debounce::ManualClock;
use zzgear::item::{ItemDefinition, ItemType, StatGenerator};
use zzgear::*;

fn main() -> Result<(), Box<dyn Error>> {
    let mut catalog = MemoryCatalog::new();
    for (id, kind) in [
        ("gloves", ItemType::Gloves),
        ("pants", ItemType::Pants),
        ("boots", ItemType::Boots),
    ] {
        catalog.insert(
            ItemDefinition::new(id, id, kind)
                .with_generator(StatGenerator::new().with_stat(AttributeKind::Dexterity, 2.0, 2.0)),
        );
    }

    // Knights double their vitality and never drop below 20 strength
    let mut classes = MemoryClassProvider::new();
    classes.insert(
        "knight",
        ClassModifiers::new()
            .multiply(AttributeKind::Vitality, 2.0)
            .clamp_min(AttributeKind::Strength, 20.0),
    );

    let clock = ManualClock::new();
    let mut service = GearService::new(GearConfig::default(), Arc::new(catalog))?
        .with_clock(Arc::new(clock.clone()))
        .with_class_provider(Arc::new(classes));
    let hero = HeroKey::new("squire");
    service.register_hero(
        hero.clone(),
        HeroBaseStats {
            strength: 12.0,
            vitality: 10.0,
            attribute_points: 5,
            ..Default::default()
        },
    );
    service.set_class(&hero, Some(ClassId::new("knight")))?;

    service.subscribe(|event| println!("  [event] {:?} for {}", event.kind(), event.hero()));

    // Preview spending three points on strength
    println!("=== Preview ===");
    service.apply_temp_change(&hero, AttributeKind::Strength, 15.0)?;
    println!("Available points: {}", service.get_available_points(&hero)?);
    let preview = service.get_attributes_with_temp_changes(&hero)?;
    println!(
        "Strength {} (clamped by class), vitality {}",
        preview.get(AttributeKind::Strength),
        preview.get(AttributeKind::Vitality)
    );

    // Abandon the preview; nothing was committed
    service.clear_temp_changes(&hero)?;
    println!("Points after clearing: {}", service.get_available_points(&hero)?);

    // Three equips inside the debounce window
    println!("\n=== Burst of equips ===");
    let mut rng = rand::thread_rng();
    for id in ["gloves", "pants", "boots"] {
        let item = service.create_item(&DefinitionId::new(id), 1, &mut rng)?;
        service.give_item(&hero, item.clone())?;
        service.equip(&hero, &item)?;
    }
    let stale = service.get_calculated_attributes(&hero)?;
    println!(
        "Inside the window: dexterity {} (pending: {})",
        stale.get(AttributeKind::Dexterity),
        service.is_recompute_pending(&hero)
    );

    clock.advance(Duration::from_millis(100));
    println!("Recomputes run by tick: {}", service.tick());
    let fresh = service.get_calculated_attributes(&hero)?;
    println!(
        "After the window: dexterity {} ({} recomputes total)",
        fresh.get(AttributeKind::Dexterity),
        service.recompute_count(&hero)
    );

    Ok(())
}
