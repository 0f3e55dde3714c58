//! Basic example: equipping gear and reading derived attributes
//!
//! This example demonstrates:
//! - Building an item catalog
//! - Creating items with rolled stats
//! - Equipping, replacing and unequipping gear
//! - Reading the attribute breakdown and leadership

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::sync::Arc;
use zzgear::catalog::MemoryCatalog;
use zzgear::item::{ItemDefinition, ItemType, StatGenerator};
use zzgear::*;

fn main() -> Result<(), Box<dyn Error>> {
    // Define the items the world knows about
    let mut catalog = MemoryCatalog::new();
    catalog.insert(
        ItemDefinition::new("iron_helm", "Iron Helm", ItemType::Helmet)
            .with_generator(StatGenerator::new().with_stat(AttributeKind::Armor, 2.0, 5.0)),
    );
    catalog.insert(
        ItemDefinition::new("command_mail", "Command Mail", ItemType::Torso).with_generator(
            StatGenerator::new()
                .with_stat(AttributeKind::Armor, 8.0, 8.0)
                .with_stat(AttributeKind::Leadership, 50.0, 50.0),
        ),
    );
    catalog.insert(
        ItemDefinition::new("banner_blade", "Banner Blade", ItemType::Weapon).with_generator(
            StatGenerator::new()
                .with_stat(AttributeKind::Strength, 6.0, 6.0)
                .with_stat(AttributeKind::Leadership, 999.0, 999.0),
        ),
    );

    let mut service = GearService::new(GearConfig::default(), Arc::new(catalog))?;
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

    // Roll a few items into the inventory
    let mut rng = StdRng::seed_from_u64(7);
    println!("Creating items:");
    let mut give = |service: &mut GearService, id: &str| -> Result<ItemInstance, GearError> {
        let item = service.create_item(&DefinitionId::new(id), 1, &mut rng)?;
        let slot = service.give_item(&hero, item.clone())?;
        println!("  - {} -> inventory slot {} {:?}", id, slot, item.generated_stats);
        Ok(item)
    };
    let helm = give(&mut service, "iron_helm")?;
    let spare_helm = give(&mut service, "iron_helm")?;
    let mail = give(&mut service, "command_mail")?;
    let blade = give(&mut service, "banner_blade")?;

    // Equip everything
    println!("\nEquipping:");
    for item in [&helm, &mail, &blade] {
        if let EquipmentChange::Equipped { slot, .. } = service.equip(&hero, item)? {
            println!("  - {} into {}", item.definition_id, slot);
        }
    }

    // Replace the helm; the old one goes back where the new one was
    if let EquipmentChange::Equipped {
        previous: Some(old), ..
    } = service.equip(&hero, &spare_helm)?
    {
        if let Some(id) = old.instance_id {
            let slot = service.inventory(&hero)?.slot_of(id);
            println!("  - swapped helms, old helm back in slot {:?}", slot);
        }
    }

    // Equipment changes are debounced; an explicit invalidation forces a fresh read
    service.invalidate(&hero)?;
    let attributes = service.get_calculated_attributes(&hero)?;

    println!("\n=== Calculated Attributes ===");
    for (kind, value) in attributes.values().iter() {
        println!("{}: {:.0}", kind, value);
    }

    println!("\nArmor Breakdown:");
    if let Some(breakdown) = attributes.breakdown(AttributeKind::Armor) {
        for (desc, value) in &breakdown.sources {
            println!("  {}: {:.0}", desc, value);
        }
    }

    println!(
        "\nLeadership: 700 + 50 (torso) = {:.0}, weapon excluded",
        attributes.leadership()
    );

    // Unequip back into the inventory
    let change = service.unequip(&hero, EquipmentSlot::Weapon)?;
    if let EquipmentChange::Unequipped { inventory_slot, .. } = change {
        println!("\nUnequipped weapon into inventory slot {}", inventory_slot);
    }

    Ok(())
}
