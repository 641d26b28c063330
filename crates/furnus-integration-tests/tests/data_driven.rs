//! Integration test: devices running on a registry loaded from data files.
//!
//! Writes a small content pack (RON items, TOML recipes, JSON settings) to a
//! temporary directory, loads it with `furnus-data`, and runs devices in a
//! world built on the result.

use furnus_core::device::{DeviceKind, NoNeighbors};
use furnus_core::id::BlockPos;
use furnus_core::item::ItemStack;
use furnus_core::routing::Facing;
use furnus_core::upgrade::Upgrade;
use furnus_core::world::World;
use furnus_data::{DataLoadError, load_registry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ITEMS: &str = r#"[
    (name: "copper_ore"),
    (name: "copper_dust"),
    (name: "copper_ingot"),
    (name: "charcoal", burn_time: 1600),
    (name: "speed_upgrade", upgrade: Some(speed)),
    (name: "eco_upgrade", upgrade: Some(eco)),
]"#;

const RECIPES: &str = r#"
[[recipes]]
device = "pulverizer"
input = "copper_ore"
output = "copper_dust"
count = 2

[[recipes]]
device = "furnace"
input = "copper_dust"
output = "copper_ingot"
"#;

fn make_pack(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "furnus_pack_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("items.ron"), ITEMS).unwrap();
    fs::write(dir.join("recipes.toml"), RECIPES).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn loaded_pack_drives_a_pulverizer() {
    let dir = make_pack("pulverize");
    let registry = Arc::new(load_registry(&dir).unwrap());
    let ore = registry.item_id("copper_ore").unwrap();
    let dust = registry.item_id("copper_dust").unwrap();
    let charcoal = registry.item_id("charcoal").unwrap();

    let mut world = World::new(Arc::clone(&registry));
    let here = BlockPos::new(3, 70, -2);
    world
        .place_device(DeviceKind::Pulverizer, here, Facing::South)
        .unwrap();
    let device = world.device_at_mut(here).unwrap();
    assert!(device.insert_stack(0, ItemStack::new(ore, 2)).is_none());
    assert!(device.insert_stack(6, ItemStack::new(charcoal, 1)).is_none());
    assert!(
        device.insert_stack(0, ItemStack::new(dust, 1)).is_some(),
        "dust has no pulverizer recipe"
    );

    let mut completed = 0;
    for _ in 0..180 {
        completed += world.tick().completed;
    }
    assert_eq!(completed, 1);
    assert_eq!(
        world.device_at(here).unwrap().stack(3),
        Some(&ItemStack::new(dust, 2))
    );

    cleanup(&dir);
}

#[test]
fn settings_file_tunes_speed_upgrades() {
    let dir = make_pack("settings");
    fs::write(
        dir.join("settings.json"),
        r#"{"speed_multiplier": 1.0, "enabled_upgrades": ["speed"]}"#,
    )
    .unwrap();
    let registry = Arc::new(load_registry(&dir).unwrap());
    let speed = registry.item_id("speed_upgrade").unwrap();
    let eco = registry.item_id("eco_upgrade").unwrap();

    let mut device = furnus_core::device::Device::new(
        DeviceKind::Furnace,
        BlockPos::new(0, 0, 0),
        Facing::North,
        Arc::clone(&registry),
    );
    assert!(device.insert_stack(8, ItemStack::new(speed, 3)).is_none());
    // 140 / (1 + 3 * 1.0)
    assert_eq!(device.needed_ticks(), 35);

    // Disabled upgrade kinds are refused.
    assert!(device.insert_stack(9, ItemStack::new(eco, 1)).is_some());
    assert_eq!(device.amount(Upgrade::Eco), 0);

    let dust = registry.item_id("copper_dust").unwrap();
    device.set_stack(0, Some(ItemStack::new(dust, 1)));
    device.set_fuel(1000.0);
    let mut completed = 0;
    for t in 1..=35 {
        completed += device.tick(t, &mut NoNeighbors).completed;
    }
    assert_eq!(completed, 1);

    cleanup(&dir);
}

#[test]
fn broken_pack_reports_the_bad_name() {
    let dir = make_pack("broken");
    fs::write(
        dir.join("recipes.toml"),
        r#"
[[recipes]]
device = "furnace"
input = "tin_ore"
output = "copper_ingot"
"#,
    )
    .unwrap();

    let err = load_registry(&dir).unwrap_err();
    assert!(
        matches!(err, DataLoadError::UnresolvedRef { .. }),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("tin_ore"));

    cleanup(&dir);
}
