//! Integration test: IO-upgraded devices wired to chests and to each other.
//!
//! Builds small worlds where devices pull ore and fuel from neighbouring
//! containers through AUTO faces and push their products onwards, then
//! checks where every item ended up.

use furnus_core::device::DeviceKind;
use furnus_core::energy::CapabilityKey;
use furnus_core::id::BlockPos;
use furnus_core::item::{ItemHandler, ItemStack, insert_anywhere};
use furnus_core::routing::{Channel, Direction, Facing};
use furnus_core::test_utils::*;
use furnus_core::ui::UiMessage;
use furnus_core::upgrade::Upgrade;
use furnus_core::world::World;

fn automated_furnace(world: &mut World, pos: BlockPos) {
    world
        .place_device(DeviceKind::Furnace, pos, Facing::North)
        .unwrap();
    world
        .device_at_mut(pos)
        .unwrap()
        .set_stack(8, Some(ItemStack::new(upgrade_item(Upgrade::Io), 1)));
    for (channel, direction) in [
        (Channel::Input, Direction::Top),
        (Channel::Output, Direction::Bottom),
        (Channel::Fuel, Direction::Front),
    ] {
        world
            .interact(pos, &UiMessage::cycle(channel, direction))
            .unwrap();
    }
}

#[test]
fn furnace_pulls_from_chests_and_pushes_ingots_down() {
    let mut world = World::new(test_registry());
    let here = origin();
    let (above, below, front) = (
        here.offset(Facing::Up),
        here.offset(Facing::Down),
        here.offset(Facing::North),
    );
    automated_furnace(&mut world, here);
    for pos in [above, below, front] {
        world.place_container(pos, 9).unwrap();
    }
    world
        .container_at_mut(above)
        .unwrap()
        .set_stack(0, Some(ItemStack::new(iron_ore(), 16)));
    world
        .container_at_mut(front)
        .unwrap()
        .set_stack(4, Some(ItemStack::new(coal(), 4)));

    let mut completed = 0;
    for _ in 0..150 {
        completed += world.tick().completed;
    }

    // Ore arrives two at a time every ten ticks, from t=10.
    assert!(world.container_at(above).unwrap().is_empty());
    // Fuel arrives one item at a time; the first was burned on arrival.
    assert!(world.container_at(front).unwrap().is_empty());
    let device = world.device_at(here).unwrap();
    let staged: u32 = [6, 7]
        .into_iter()
        .filter_map(|slot| device.stack(slot))
        .map(|s| s.count)
        .sum();
    assert_eq!(staged, 3);

    // First ingot done at t=149 and exported at t=150.
    assert_eq!(completed, 1);
    assert_eq!(device.stack(0), Some(&ItemStack::new(iron_ore(), 15)));
    assert!(device.stack(3).is_none());
    assert_eq!(world.container_at(below).unwrap().count_of(iron_ingot()), 1);
}

#[test]
fn import_skips_items_without_a_recipe() {
    let mut world = World::new(test_registry());
    let here = origin();
    let above = here.offset(Facing::Up);
    automated_furnace(&mut world, here);
    world.place_container(above, 3).unwrap();
    let chest = world.container_at_mut(above).unwrap();
    chest.set_stack(0, Some(ItemStack::new(apple(), 5)));
    chest.set_stack(1, Some(ItemStack::new(sand(), 5)));

    for _ in 0..10 {
        world.tick();
    }
    let chest = world.container_at(above).unwrap();
    assert_eq!(chest.count_of(apple()), 5);
    assert_eq!(chest.count_of(sand()), 3);
    assert_eq!(
        world.device_at(here).unwrap().stack(0),
        Some(&ItemStack::new(sand(), 2))
    );
}

#[test]
fn slot_upgrades_raise_the_transfer_rate() {
    let mut world = World::new(test_registry());
    let here = origin();
    let above = here.offset(Facing::Up);
    automated_furnace(&mut world, here);
    world
        .device_at_mut(here)
        .unwrap()
        .set_stack(9, Some(ItemStack::new(upgrade_item(Upgrade::Slot), 2)));
    world.place_container(above, 1).unwrap();
    world
        .container_at_mut(above)
        .unwrap()
        .set_stack(0, Some(ItemStack::new(iron_ore(), 64)));

    for _ in 0..10 {
        world.tick();
    }
    assert_eq!(world.container_at(above).unwrap().count_of(iron_ore()), 58);
}

#[test]
fn without_io_upgrade_nothing_moves() {
    let mut world = World::new(test_registry());
    let here = origin();
    let above = here.offset(Facing::Up);
    automated_furnace(&mut world, here);
    world.device_at_mut(here).unwrap().set_stack(8, None);
    world.place_container(above, 1).unwrap();
    world
        .container_at_mut(above)
        .unwrap()
        .set_stack(0, Some(ItemStack::new(iron_ore(), 10)));

    for _ in 0..30 {
        world.tick();
    }
    assert_eq!(world.container_at(above).unwrap().count_of(iron_ore()), 10);
}

#[test]
fn pulverizer_feeds_furnace_below() {
    let mut world = World::new(test_registry());
    let top = origin();
    let bottom = top.offset(Facing::Down);
    world
        .place_device(DeviceKind::Pulverizer, top, Facing::East)
        .unwrap();
    automated_furnace(&mut world, bottom);

    let pulverizer = world.device_at_mut(top).unwrap();
    pulverizer.set_stack(8, Some(ItemStack::new(upgrade_item(Upgrade::Io), 1)));
    pulverizer.set_stack(0, Some(ItemStack::new(iron_ore(), 1)));
    pulverizer.set_fuel(500.0);
    world
        .interact(top, &UiMessage::cycle(Channel::Output, Direction::Bottom))
        .unwrap();
    world.device_at_mut(bottom).unwrap().set_fuel(500.0);

    // Dust is ready at t=180 and the furnace, ticked second, pulls it at once.
    for _ in 0..190 {
        world.tick();
    }
    let furnace = world.device_at(bottom).unwrap();
    assert_eq!(furnace.stack(0), Some(&ItemStack::new(iron_dust(), 2)));
    assert!(world.device_at(top).unwrap().stack(3).is_none());

    for _ in 0..140 {
        world.tick();
    }
    assert_eq!(
        world.device_at(bottom).unwrap().stack(3),
        Some(&ItemStack::new(iron_ingot(), 1))
    );
}

#[test]
fn hoppers_respect_face_routing() {
    let mut world = World::new(test_registry());
    let here = origin();
    world
        .place_device(DeviceKind::Furnace, here, Facing::West)
        .unwrap();

    // A west-facing furnace sees fuel through its world-north face (its right).
    let Some(furnus_core::device::Capability::Items(mut side)) =
        world.capability(here, CapabilityKey::Items, Facing::North)
    else {
        panic!("items are always exposed");
    };
    assert!(insert_anywhere(&mut side, ItemStack::new(coal(), 3), false).is_none());
    assert!(
        insert_anywhere(&mut side, ItemStack::new(iron_ore(), 1), false).is_some(),
        "ore is not fuel"
    );
    assert_eq!(side.slots(), 2);
    drop(side);

    let Some(furnus_core::device::Capability::Items(mut top)) =
        world.capability(here, CapabilityKey::Items, Facing::Up)
    else {
        panic!("items are always exposed");
    };
    assert!(insert_anywhere(&mut top, ItemStack::new(iron_ore(), 5), false).is_none());
    drop(top);

    let device = world.device_at(here).unwrap();
    assert_eq!(device.stack(0), Some(&ItemStack::new(iron_ore(), 5)));
    assert_eq!(device.stack(6), Some(&ItemStack::new(coal(), 3)));
}
