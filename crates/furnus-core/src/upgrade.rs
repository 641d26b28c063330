//! Upgrade modules and the memoized per-device upgrade counts.
//!
//! Upgrades live in the device's own inventory (slots 8..=12). Every read of
//! an upgrade count goes through [`UpgradeCache`], which scans those slots
//! once and keeps the result until the inventory is next mutated.

use crate::item::ItemStack;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::ops::Range;

/// Slot range holding upgrade modules.
pub const UPGRADE_SLOTS: Range<usize> = 8..13;

/// Kinds of upgrade module a device recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgrade {
    /// Extra parallel input/output slot pairs (at most two).
    Slot,
    Speed,
    Efficiency,
    /// Accept energy as an alternative to fuel items.
    Energy,
    /// Enable configurable routing and automatic import/export.
    Io,
    /// Keep partial progress while starved of fuel.
    Eco,
}

impl Upgrade {
    pub const ALL: [Upgrade; 6] = [
        Upgrade::Slot,
        Upgrade::Speed,
        Upgrade::Efficiency,
        Upgrade::Energy,
        Upgrade::Io,
        Upgrade::Eco,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// How many modules of this kind one upgrade slot accepts.
    pub fn max_stack(self) -> u32 {
        match self {
            Upgrade::Slot => 2,
            Upgrade::Speed | Upgrade::Efficiency => 8,
            Upgrade::Energy | Upgrade::Io | Upgrade::Eco => 1,
        }
    }
}

/// Count of each upgrade kind installed in a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeCounts([u32; 6]);

impl UpgradeCounts {
    /// Scan the upgrade slots. Kinds disabled in settings are ignored; when
    /// the same kind appears twice the later slot wins.
    pub fn scan(slots: &[Option<ItemStack>], registry: &Registry) -> Self {
        let mut counts = [0u32; 6];
        for stack in slots[UPGRADE_SLOTS].iter().flatten() {
            if let Some(kind) = registry.upgrade_kind(stack) {
                if registry.settings().is_enabled(kind) {
                    counts[kind.index()] = stack.count;
                }
            }
        }
        Self(counts)
    }

    pub fn get(&self, upgrade: Upgrade) -> u32 {
        self.0[upgrade.index()]
    }

    pub fn has(&self, upgrade: Upgrade) -> bool {
        self.get(upgrade) > 0
    }

    /// Active input and output slots implied by the SLOT count.
    pub fn layout(&self) -> SlotLayout {
        SlotLayout::for_extra_slots(self.get(Upgrade::Slot))
    }
}

/// Lazily recomputed upgrade counts. Invalidate on every inventory mutation.
#[derive(Debug, Clone, Default)]
pub struct UpgradeCache {
    counts: Cell<Option<UpgradeCounts>>,
}

impl UpgradeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slots: &[Option<ItemStack>], registry: &Registry) -> UpgradeCounts {
        if let Some(counts) = self.counts.get() {
            return counts;
        }
        let counts = UpgradeCounts::scan(slots, registry);
        self.counts.set(Some(counts));
        counts
    }

    pub fn invalidate(&self) {
        self.counts.set(None);
    }

    pub fn is_cached(&self) -> bool {
        self.counts.get().is_some()
    }
}

// ---------------------------------------------------------------------------
// Slot layout
// ---------------------------------------------------------------------------

/// Input slot indices, all three.
pub const INPUT_SLOTS: [usize; 3] = [0, 1, 2];
/// Output slot indices, all three. Output `i + 3` pairs with input `i`.
pub const OUTPUT_SLOTS: [usize; 3] = [3, 4, 5];
/// Fuel slots: the burning slot first, then the staging slot.
pub const FUEL_SLOTS: [usize; 2] = [6, 7];
/// Distance between an input slot and its paired output slot.
pub const OUTPUT_OFFSET: usize = 3;

/// The input and output slots a device currently works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    active: usize,
}

impl SlotLayout {
    /// One slot pair plus one per SLOT upgrade, capped at three pairs.
    pub fn for_extra_slots(extra: u32) -> Self {
        Self {
            active: 1 + (extra.min(2) as usize),
        }
    }

    pub fn inputs(&self) -> &'static [usize] {
        let all: &'static [usize; 3] = &INPUT_SLOTS;
        &all[..self.active]
    }

    pub fn outputs(&self) -> &'static [usize] {
        let all: &'static [usize; 3] = &OUTPUT_SLOTS;
        &all[..self.active]
    }

    pub fn fuel(&self) -> &'static [usize] {
        &FUEL_SLOTS
    }

    pub fn is_input(&self, slot: usize) -> bool {
        self.inputs().contains(&slot)
    }

    pub fn is_output(&self, slot: usize) -> bool {
        self.outputs().contains(&slot)
    }

    pub fn is_fuel(&self, slot: usize) -> bool {
        FUEL_SLOTS.contains(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn slots_with(upgrades: &[(usize, ItemStack)]) -> Vec<Option<ItemStack>> {
        let mut slots = vec![None; 13];
        for (i, stack) in upgrades {
            slots[*i] = Some(stack.clone());
        }
        slots
    }

    #[test]
    fn scan_counts_stack_sizes() {
        let registry = test_registry();
        let slots = slots_with(&[
            (8, ItemStack::new(upgrade_item(Upgrade::Speed), 3)),
            (10, ItemStack::new(upgrade_item(Upgrade::Slot), 2)),
        ]);
        let counts = UpgradeCounts::scan(&slots, &registry);
        assert_eq!(counts.get(Upgrade::Speed), 3);
        assert_eq!(counts.get(Upgrade::Slot), 2);
        assert!(!counts.has(Upgrade::Eco));
    }

    #[test]
    fn scan_ignores_non_upgrade_slots() {
        let registry = test_registry();
        let slots = slots_with(&[(0, ItemStack::new(upgrade_item(Upgrade::Io), 1))]);
        assert!(!UpgradeCounts::scan(&slots, &registry).has(Upgrade::Io));
    }

    #[test]
    fn disabled_kinds_count_as_absent() {
        let registry = registry_with_settings(crate::registry::DeviceSettings {
            enabled_upgrades: vec![Upgrade::Speed],
            ..Default::default()
        });
        let slots = slots_with(&[
            (8, ItemStack::new(upgrade_item(Upgrade::Eco), 1)),
            (9, ItemStack::new(upgrade_item(Upgrade::Speed), 1)),
        ]);
        let counts = UpgradeCounts::scan(&slots, &registry);
        assert!(!counts.has(Upgrade::Eco));
        assert!(counts.has(Upgrade::Speed));
    }

    #[test]
    fn cache_memoizes_until_invalidated() {
        let registry = test_registry();
        let cache = UpgradeCache::new();
        let mut slots = slots_with(&[(8, ItemStack::new(upgrade_item(Upgrade::Speed), 1))]);

        assert_eq!(cache.get(&slots, &registry).get(Upgrade::Speed), 1);
        assert!(cache.is_cached());

        // A stale read is expected until the owner invalidates.
        slots[8] = Some(ItemStack::new(upgrade_item(Upgrade::Speed), 4));
        assert_eq!(cache.get(&slots, &registry).get(Upgrade::Speed), 1);

        cache.invalidate();
        assert_eq!(cache.get(&slots, &registry).get(Upgrade::Speed), 4);
    }

    #[test]
    fn layout_follows_slot_count() {
        assert_eq!(SlotLayout::for_extra_slots(0).inputs(), &[0]);
        assert_eq!(SlotLayout::for_extra_slots(1).outputs(), &[3, 4]);
        assert_eq!(SlotLayout::for_extra_slots(2).inputs(), &[0, 1, 2]);
        assert_eq!(SlotLayout::for_extra_slots(9).inputs(), &[0, 1, 2]);
    }

    #[test]
    fn fuel_slots_never_change() {
        for extra in 0..3 {
            assert_eq!(SlotLayout::for_extra_slots(extra).fuel(), &[6, 7]);
        }
    }
}
