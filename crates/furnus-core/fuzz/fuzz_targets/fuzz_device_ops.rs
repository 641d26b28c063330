#![no_main]
use arbitrary::Arbitrary;
use furnus_core::device::{DeviceKind, SLOT_COUNT};
use furnus_core::id::{BlockPos, ItemTypeId};
use furnus_core::item::ItemStack;
use furnus_core::routing::Facing;
use furnus_core::test_utils::*;
use furnus_core::ui::UiMessage;
use furnus_core::world::World;
use libfuzzer_sys::fuzz_target;

/// A structured world operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Insert { device: bool, slot: u8, item: u8, count: u8 },
    Take { device: bool, slot: u8, count: u8 },
    Press { id: i8, window: u8 },
    Fuel { device: bool, amount: u16 },
    Tick { count: u8 },
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let registry = test_registry();
    let item_count = registry.item_count() as u32;
    let mut world = World::new(registry);
    let top = origin();
    let bottom = top.offset(Facing::Down);
    let _ = world.place_device(DeviceKind::Pulverizer, top, Facing::East);
    let _ = world.place_device(DeviceKind::Furnace, bottom, Facing::North);
    let _ = world.place_container(BlockPos::new(0, 62, 0), 9);

    let pick = |device: bool| if device { top } else { bottom };

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Insert { device, slot, item, count } => {
                let stack = ItemStack::new(ItemTypeId(item as u32 % item_count), count as u32);
                if let Some(d) = world.device_at_mut(pick(device)) {
                    d.insert_stack(slot as usize % SLOT_COUNT, stack);
                }
            }
            FuzzOp::Take { device, slot, count } => {
                if let Some(d) = world.device_at_mut(pick(device)) {
                    d.take_stack(slot as usize % SLOT_COUNT, count as u32);
                }
            }
            FuzzOp::Press { id, window } => {
                let window = ["in", "out", "fuel", "bogus"]
                    .get(window as usize % 5)
                    .map(|w| w.to_string());
                let _ = world.interact(top, &UiMessage { id: id as i32, window });
            }
            FuzzOp::Fuel { device, amount } => {
                if let Some(d) = world.device_at_mut(pick(device)) {
                    d.set_fuel(amount as f64);
                }
            }
            FuzzOp::Tick { count } => {
                for _ in 0..count.min(50) {
                    world.tick();
                }
            }
        }
    }

    if let Ok(bytes) = world.save() {
        let _ = World::load(&bytes, test_registry());
    }
});
