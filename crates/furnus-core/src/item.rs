use crate::id::ItemTypeId;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound on any single slot, independent of the item's own stack size.
pub const SLOT_STACK_LIMIT: u32 = 64;

/// A stack of identical items. An empty slot is `None`, never a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemTypeId,
    pub count: u32,
    /// Auxiliary tag distinguishing otherwise identical items.
    #[serde(default)]
    pub tag: Option<String>,
}

impl ItemStack {
    pub fn new(item: ItemTypeId, count: u32) -> Self {
        Self {
            item,
            count,
            tag: None,
        }
    }

    pub fn with_tag(item: ItemTypeId, count: u32, tag: impl Into<String>) -> Self {
        Self {
            item,
            count,
            tag: Some(tag.into()),
        }
    }

    /// Whether `other` may share a slot with this stack.
    pub fn can_stack_with(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.tag == other.tag
    }

    /// A copy of this stack holding `count` items.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            item: self.item,
            count,
            tag: self.tag.clone(),
        }
    }

    /// Split into two halves. The first half takes the odd remainder.
    pub fn split_half(&self) -> (ItemStack, ItemStack) {
        let (larger, smaller) = split_count(self.count);
        (self.with_count(larger), self.with_count(smaller))
    }
}

/// Divide `total` into two parts, the first taking the odd remainder.
pub fn split_count(total: u32) -> (u32, u32) {
    let smaller = total / 2;
    (total - smaller, smaller)
}

/// Remove `amount` items from a slot, clearing it when it runs out.
pub(crate) fn shrink_slot(slot: &mut Option<ItemStack>, amount: u32) {
    if let Some(stack) = slot {
        stack.count = stack.count.saturating_sub(amount);
        if stack.count == 0 {
            *slot = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Item handler seam
// ---------------------------------------------------------------------------

/// Slot-indexed inventory access used for all item movement between blocks.
///
/// `insert_item` returns whatever did not fit; `extract_item` returns what
/// was (or, when simulating, would be) removed. Partial results are normal.
pub trait ItemHandler {
    fn slots(&self) -> usize;

    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack>;

    fn insert_item(&mut self, slot: usize, stack: ItemStack, simulate: bool)
    -> Option<ItemStack>;

    fn extract_item(&mut self, slot: usize, amount: u32, simulate: bool) -> Option<ItemStack>;
}

impl<T: ItemHandler + ?Sized> ItemHandler for &mut T {
    fn slots(&self) -> usize {
        (**self).slots()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack> {
        (**self).stack_in_slot(slot)
    }

    fn insert_item(&mut self, slot: usize, stack: ItemStack, simulate: bool) -> Option<ItemStack> {
        (**self).insert_item(slot, stack, simulate)
    }

    fn extract_item(&mut self, slot: usize, amount: u32, simulate: bool) -> Option<ItemStack> {
        (**self).extract_item(slot, amount, simulate)
    }
}

/// Offer `stack` to every slot of `handler` in order. Returns the remainder.
pub fn insert_anywhere(
    handler: &mut dyn ItemHandler,
    stack: ItemStack,
    simulate: bool,
) -> Option<ItemStack> {
    let mut remaining = Some(stack);
    for slot in 0..handler.slots() {
        let Some(stack) = remaining.take() else {
            break;
        };
        remaining = handler.insert_item(slot, stack, simulate);
    }
    remaining
}

/// Move up to `limit` items matching `filter` from `from` into `to`.
///
/// Returns `true` if at least one item moved.
pub fn transfer(
    from: &mut dyn ItemHandler,
    to: &mut dyn ItemHandler,
    limit: u32,
    filter: &dyn Fn(&ItemStack) -> bool,
) -> bool {
    let mut budget = limit;
    let mut moved = false;

    for slot in 0..from.slots() {
        if budget == 0 {
            break;
        }
        match from.stack_in_slot(slot) {
            Some(stack) if filter(stack) => {}
            _ => continue,
        }
        let Some(offered) = from.extract_item(slot, budget, true) else {
            continue;
        };
        let offered_count = offered.count;
        let rejected = insert_anywhere(to, offered, true).map_or(0, |s| s.count);
        let accepted = offered_count - rejected;
        if accepted == 0 {
            continue;
        }
        if let Some(taken) = from.extract_item(slot, accepted, false) {
            let taken_count = taken.count;
            // Anything the destination refuses on the real pass goes back.
            if let Some(leftover) = insert_anywhere(to, taken, false) {
                let _ = from.insert_item(slot, leftover.clone(), false);
                budget -= taken_count - leftover.count;
            } else {
                budget -= taken_count;
            }
            moved = true;
        }
    }

    moved
}

// ---------------------------------------------------------------------------
// Plain container
// ---------------------------------------------------------------------------

/// A plain chest-like inventory with no per-slot rules.
#[derive(Debug, Clone)]
pub struct Container {
    slots: Vec<Option<ItemStack>>,
    registry: Arc<Registry>,
}

impl Container {
    pub fn new(size: usize, registry: Arc<Registry>) -> Self {
        Self {
            slots: vec![None; size],
            registry,
        }
    }

    /// Rebuild a container from saved slot contents.
    pub fn from_stacks(stacks: Vec<Option<ItemStack>>, registry: Arc<Registry>) -> Self {
        Self {
            slots: stacks,
            registry,
        }
    }

    pub fn stacks(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn set_stack(&mut self, slot: usize, stack: Option<ItemStack>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = stack;
        }
    }

    /// Total count of `item` across all slots.
    pub fn count_of(&self, item: ItemTypeId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl ItemHandler for Container {
    fn slots(&self) -> usize {
        self.slots.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn insert_item(
        &mut self,
        slot: usize,
        stack: ItemStack,
        simulate: bool,
    ) -> Option<ItemStack> {
        let limit = self.registry.slot_limit(stack.item);
        let Some(current) = self.slots.get_mut(slot) else {
            return Some(stack);
        };
        insert_into_slot(current, stack, limit, simulate)
    }

    fn extract_item(&mut self, slot: usize, amount: u32, simulate: bool) -> Option<ItemStack> {
        let current = self.slots.get_mut(slot)?;
        extract_from_slot(current, amount, simulate)
    }
}

/// Insert into a single slot honouring `limit`. Returns the remainder.
pub(crate) fn insert_into_slot(
    current: &mut Option<ItemStack>,
    stack: ItemStack,
    limit: u32,
    simulate: bool,
) -> Option<ItemStack> {
    let existing = match current {
        Some(existing) if !existing.can_stack_with(&stack) => return Some(stack),
        Some(existing) => existing.count,
        None => 0,
    };
    let room = limit.saturating_sub(existing);
    let accepted = stack.count.min(room);
    if accepted == 0 {
        return Some(stack);
    }
    if !simulate {
        match current {
            Some(existing) => existing.count += accepted,
            None => *current = Some(stack.with_count(accepted)),
        }
    }
    let rest = stack.count - accepted;
    (rest > 0).then(|| stack.with_count(rest))
}

/// Extract up to `amount` from a single slot.
pub(crate) fn extract_from_slot(
    current: &mut Option<ItemStack>,
    amount: u32,
    simulate: bool,
) -> Option<ItemStack> {
    let stack = current.as_ref()?;
    let taken = amount.min(stack.count);
    if taken == 0 {
        return None;
    }
    let out = stack.with_count(taken);
    if !simulate {
        shrink_slot(current, taken);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn split_count_puts_remainder_first() {
        assert_eq!(split_count(7), (4, 3));
        assert_eq!(split_count(8), (4, 4));
        assert_eq!(split_count(1), (1, 0));
    }

    #[test]
    fn tags_prevent_stacking() {
        let a = ItemStack::new(iron_ore(), 1);
        let b = ItemStack::with_tag(iron_ore(), 1, "enchanted");
        assert!(!a.can_stack_with(&b));
        assert!(a.can_stack_with(&ItemStack::new(iron_ore(), 30)));
    }

    #[test]
    fn container_insert_respects_item_stack_size() {
        let mut chest = Container::new(1, test_registry());
        // Buckets stack to 16 in the test registry.
        let rest = chest.insert_item(0, ItemStack::new(bucket(), 20), false);
        assert_eq!(rest, Some(ItemStack::new(bucket(), 4)));
        assert_eq!(chest.count_of(bucket()), 16);
    }

    #[test]
    fn container_simulated_insert_leaves_slot_untouched() {
        let mut chest = Container::new(1, test_registry());
        let rest = chest.insert_item(0, ItemStack::new(coal(), 10), true);
        assert!(rest.is_none());
        assert!(chest.is_empty());
    }

    #[test]
    fn container_extract_clears_slot() {
        let mut chest = Container::new(1, test_registry());
        chest.set_stack(0, Some(ItemStack::new(coal(), 3)));
        let out = chest.extract_item(0, 10, false);
        assert_eq!(out, Some(ItemStack::new(coal(), 3)));
        assert!(chest.stack_in_slot(0).is_none());
    }

    #[test]
    fn transfer_is_capped_and_filtered() {
        let registry = test_registry();
        let mut from = Container::new(2, registry.clone());
        from.set_stack(0, Some(ItemStack::new(coal(), 10)));
        from.set_stack(1, Some(ItemStack::new(iron_ore(), 10)));
        let mut to = Container::new(4, registry);

        let only_ore = |s: &ItemStack| s.item == iron_ore();
        assert!(transfer(&mut from, &mut to, 4, &only_ore));
        assert_eq!(to.count_of(iron_ore()), 4);
        assert_eq!(to.count_of(coal()), 0);
        assert_eq!(from.count_of(iron_ore()), 6);
    }

    #[test]
    fn transfer_into_full_target_moves_nothing() {
        let registry = test_registry();
        let mut from = Container::new(1, registry.clone());
        from.set_stack(0, Some(ItemStack::new(coal(), 10)));
        let mut to = Container::new(1, registry);
        to.set_stack(0, Some(ItemStack::new(iron_ore(), 64)));

        assert!(!transfer(&mut from, &mut to, 8, &|_| true));
        assert_eq!(from.count_of(coal()), 10);
    }
}
