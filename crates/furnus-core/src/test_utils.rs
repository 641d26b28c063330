//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).
//!
//! Item ids are fixed by registration order in [`build_test_registry`].

use crate::device::{Device, DeviceKind};
use crate::id::{BlockPos, ItemTypeId};
use crate::registry::{DeviceSettings, ItemTypeDef, Registry, RegistryBuilder};
use crate::routing::Facing;
use crate::upgrade::Upgrade;
use std::sync::Arc;

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn iron_ingot() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn iron_dust() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(3)
}
pub fn lava_bucket() -> ItemTypeId {
    ItemTypeId(4)
}
/// Stacks to 16.
pub fn bucket() -> ItemTypeId {
    ItemTypeId(5)
}
pub fn sand() -> ItemTypeId {
    ItemTypeId(6)
}
pub fn glass() -> ItemTypeId {
    ItemTypeId(7)
}
/// Burns briefly but has no recipe.
pub fn stick() -> ItemTypeId {
    ItemTypeId(8)
}
/// Neither fuel nor processable anywhere.
pub fn apple() -> ItemTypeId {
    ItemTypeId(9)
}

const FIRST_UPGRADE: u32 = 10;

pub fn upgrade_item(upgrade: Upgrade) -> ItemTypeId {
    let offset = Upgrade::ALL
        .iter()
        .position(|u| *u == upgrade)
        .unwrap_or_default();
    ItemTypeId(FIRST_UPGRADE + offset as u32)
}

// ===========================================================================
// Registry
// ===========================================================================

/// Items, fuels, upgrades and recipes used throughout the tests.
pub fn build_test_registry(settings: DeviceSettings) -> Registry {
    let mut b = RegistryBuilder::new();
    let ore = b.register_simple("iron_ore");
    let ingot = b.register_simple("iron_ingot");
    let dust = b.register_simple("iron_dust");
    b.register_item(ItemTypeDef {
        burn_time: 1600,
        ..ItemTypeDef::new("coal")
    });
    let lava = b.register_item(ItemTypeDef {
        burn_time: 20_000,
        max_stack: 1,
        ..ItemTypeDef::new("lava_bucket")
    });
    let empty_bucket = b.register_item(ItemTypeDef {
        max_stack: 16,
        ..ItemTypeDef::new("bucket")
    });
    let sand = b.register_simple("sand");
    let glass = b.register_simple("glass");
    b.register_item(ItemTypeDef {
        burn_time: 100,
        ..ItemTypeDef::new("stick")
    });
    b.register_simple("apple");
    for upgrade in Upgrade::ALL {
        b.register_item(ItemTypeDef {
            upgrade: Some(upgrade),
            ..ItemTypeDef::new(&format!("upgrade_{upgrade:?}").to_lowercase())
        });
    }

    b.mutate_item("lava_bucket", |i| i.container = Some(empty_bucket))
        .expect("lava bucket registered");
    debug_assert_eq!(lava, lava_bucket());

    b.register_recipe(DeviceKind::Furnace, ore, ingot, 1);
    b.register_recipe(DeviceKind::Furnace, dust, ingot, 1);
    b.register_recipe(DeviceKind::Furnace, sand, glass, 1);
    b.register_recipe(DeviceKind::Pulverizer, ore, dust, 2);
    b.register_recipe(DeviceKind::Pulverizer, glass, sand, 1);
    b.set_settings(settings);
    b.build().expect("test registry is valid")
}

pub fn test_registry() -> Arc<Registry> {
    Arc::new(build_test_registry(DeviceSettings::default()))
}

pub fn registry_with_settings(settings: DeviceSettings) -> Arc<Registry> {
    Arc::new(build_test_registry(settings))
}

// ===========================================================================
// Device constructors
// ===========================================================================

pub fn origin() -> BlockPos {
    BlockPos::new(0, 64, 0)
}

pub fn make_device(kind: DeviceKind, facing: Facing) -> Device {
    Device::new(kind, origin(), facing, test_registry())
}

/// A north-facing furnace at [`origin`].
pub fn furnace() -> Device {
    make_device(DeviceKind::Furnace, Facing::North)
}

/// A north-facing pulverizer at [`origin`].
pub fn pulverizer() -> Device {
    make_device(DeviceKind::Pulverizer, Facing::North)
}
