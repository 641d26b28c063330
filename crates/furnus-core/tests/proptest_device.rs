//! Property-based tests for device ticking.
//!
//! Uses proptest to drive devices through random sequences of player
//! actions and ticks, then verify structural invariants hold.

use furnus_core::device::{Device, DeviceKind, NoNeighbors, Ticks};
use furnus_core::item::{ItemStack, SLOT_STACK_LIMIT};
use furnus_core::test_utils::*;
use furnus_core::ui::UiAction;
use furnus_core::upgrade::{UPGRADE_SLOTS, Upgrade, UpgradeCounts};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Player-level operations on one device.
#[derive(Debug, Clone)]
enum Op {
    PutInput(usize, u32, u8),
    PutFuel(u32),
    InstallUpgrade(usize, u32),
    RemoveUpgrade(usize),
    TakeOutput(usize),
    ToggleSplit,
    Tick(u64),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            (0..3usize, 1..=64u32, 0..3u8).prop_map(|(s, n, i)| Op::PutInput(s, n, i)),
            (1..=8u32).prop_map(Op::PutFuel),
            (0..6usize, 1..=8u32).prop_map(|(u, n)| Op::InstallUpgrade(u, n)),
            (0..5usize).prop_map(Op::RemoveUpgrade),
            (3..6usize).prop_map(Op::TakeOutput),
            Just(Op::ToggleSplit),
            (1..60u64).prop_map(Op::Tick),
        ],
        1..=max_ops,
    )
}

fn input_item(choice: u8) -> furnus_core::id::ItemTypeId {
    match choice {
        0 => iron_ore(),
        1 => sand(),
        _ => glass(),
    }
}

fn apply(device: &mut Device, op: &Op, time: &mut Ticks) {
    match *op {
        Op::PutInput(slot, count, item) => {
            device.insert_stack(slot, ItemStack::new(input_item(item), count));
        }
        Op::PutFuel(count) => {
            device.insert_stack(7, ItemStack::new(coal(), count));
        }
        Op::InstallUpgrade(kind, count) => {
            let stack = ItemStack::new(upgrade_item(Upgrade::ALL[kind]), count);
            for slot in UPGRADE_SLOTS {
                if device.insert_stack(slot, stack.clone()).is_none() {
                    break;
                }
            }
        }
        Op::RemoveUpgrade(offset) => {
            device.take_stack(UPGRADE_SLOTS.start + offset, SLOT_STACK_LIMIT);
        }
        Op::TakeOutput(slot) => {
            device.take_stack(slot, SLOT_STACK_LIMIT);
        }
        Op::ToggleSplit => device.handle_ui(UiAction::ToggleSplit),
        Op::Tick(n) => {
            for _ in 0..n {
                *time += 1;
                device.tick(*time, &mut NoNeighbors);
            }
        }
    }
}

fn input_total(device: &Device) -> u32 {
    (0..3).filter_map(|s| device.stack(s)).map(|s| s.count).sum()
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Fuel stays within `0..=max_fuel`, active progress stays below the
    /// cycle length, and the upgrade cache matches a fresh scan.
    #[test]
    fn tick_invariants_hold(
        pulverize in any::<bool>(),
        ops in arb_ops(40),
    ) {
        let mut device = if pulverize { pulverizer() } else { furnace() };
        let mut time = 0;

        for op in &ops {
            apply(&mut device, op, &mut time);

            prop_assert!(device.fuel() >= 0.0);
            prop_assert!(device.fuel() <= device.max_fuel());
            prop_assert_eq!(
                device.upgrades(),
                UpgradeCounts::scan(device.slots(), device.registry())
            );
            if matches!(op, Op::Tick(_)) {
                for &slot in device.layout().inputs() {
                    prop_assert!(
                        device.progress(slot) < device.needed_ticks(),
                        "slot {} at {} of {}", slot, device.progress(slot), device.needed_ticks()
                    );
                }
            }
            for (slot, stack) in device.slots().iter().enumerate() {
                if let Some(stack) = stack {
                    prop_assert!(stack.count > 0, "empty stack left in slot {}", slot);
                    prop_assert!(stack.count <= SLOT_STACK_LIMIT);
                }
            }
        }
    }

    /// Without fuel nothing is processed, so organizing only moves items.
    #[test]
    fn organizing_conserves_inputs(
        counts in proptest::collection::vec(0..=64u32, 3),
        extra_slots in 0..=2u32,
        split in any::<bool>(),
        ticks in 1..100u64,
    ) {
        let mut device = furnace();
        if extra_slots > 0 {
            device.set_stack(8, Some(ItemStack::new(upgrade_item(Upgrade::Slot), extra_slots)));
        }
        for (slot, &count) in counts.iter().enumerate() {
            device.set_stack(slot, Some(ItemStack::new(iron_ore(), count)));
        }
        if split {
            device.handle_ui(UiAction::ToggleSplit);
        }
        let before = input_total(&device);

        for t in 1..=ticks {
            device.tick(t, &mut NoNeighbors);
            prop_assert_eq!(input_total(&device), before);
        }
        prop_assert_eq!(device.kind(), DeviceKind::Furnace);
    }
}
