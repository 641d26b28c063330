//! The processing device: inventory, fuel, progress, and the per-tick pipeline.
//!
//! # Tick phases
//!
//! [`Device::tick`] runs, in order:
//!
//! 1. **Export** -- every 10 ticks with an IO upgrade, push output and fuel
//!    items through AUTO faces into neighbouring inventories.
//! 2. **Import** -- same cadence, pull input and fuel items through AUTO faces.
//! 3. **Organize** -- every 8 ticks with a SLOT upgrade, rebalance input slots.
//! 4. **Clamp** -- `max_fuel >= fuel >= 0`.
//! 5. **Indicator** -- every 6 ticks, `burning = fuel > 0`.
//! 6. **Refuel** -- stage fuel, then burn one item (or draw energy) when nearly empty.
//! 7. **Burn** -- advance every active input slot and record fuel use.
//!
//! Later phases rely on the state left by earlier ones, so the order is fixed.

use crate::energy::{CapabilityKey, CapabilityTable, EnergyBuffer, PowerAdapter};
use crate::id::{BlockPos, ObserverId};
use crate::item::{
    ItemHandler, ItemStack, extract_from_slot, insert_into_slot, shrink_slot, split_count,
    transfer,
};
use crate::registry::Registry;
use crate::routing::{Channel, Direction, Facing, Mode, RoutingTable};
use crate::sync::ProgressMessage;
use crate::ui::UiAction;
use crate::upgrade::{
    FUEL_SLOTS, OUTPUT_OFFSET, SlotLayout, UPGRADE_SLOTS, Upgrade, UpgradeCache, UpgradeCounts,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// World time, in ticks.
pub type Ticks = u64;

/// Number of inventory slots on every device.
pub const SLOT_COUNT: usize = 13;

/// Shortest possible processing cycle, whatever the SPEED count.
pub const MIN_NEEDED_TICKS: u32 = 5;

/// Reference cycle length that `fuel_multiplier` is expressed against.
const FUEL_REFERENCE_TICKS: f64 = 200.0;

/// Energy drawn per refuel attempt, and energy per unit of fuel.
const ENERGY_PER_FUEL: u32 = 25;
const ENERGY_DRAW: u32 = 1600 * ENERGY_PER_FUEL;

/// Refuel once fuel drops to last tick's use plus this margin.
const REFUEL_MARGIN: f64 = 2.0;

/// Tolerance for fuel comparisons, absorbing accumulated rounding.
pub const FUEL_EPSILON: f64 = 1e-9;

const EXPORT_INTERVAL: Ticks = 10;
const ORGANIZE_INTERVAL: Ticks = 8;
const INDICATOR_INTERVAL: Ticks = 6;

// ---------------------------------------------------------------------------
// Device kind
// ---------------------------------------------------------------------------

/// What a device does with its inputs. The only behavioural differences are
/// the recipe table, the base cycle length, and the UI it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Furnace,
    Pulverizer,
}

impl DeviceKind {
    pub fn base_ticks(self) -> u32 {
        match self {
            DeviceKind::Furnace => 140,
            DeviceKind::Pulverizer => 180,
        }
    }

    pub fn gui_id(self) -> u32 {
        match self {
            DeviceKind::Furnace => 0,
            DeviceKind::Pulverizer => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Neighbour access
// ---------------------------------------------------------------------------

/// Lookup of adjacent inventories during a tick.
pub trait Neighbors {
    /// The item handler at `pos`, as seen from its `side`.
    fn item_handler(&mut self, pos: BlockPos, side: Facing) -> Option<Box<dyn ItemHandler + '_>>;
}

/// A device with nothing around it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNeighbors;

impl Neighbors for NoNeighbors {
    fn item_handler(&mut self, _: BlockPos, _: Facing) -> Option<Box<dyn ItemHandler + '_>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tick outcome
// ---------------------------------------------------------------------------

/// What happened during one [`Device::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Processing cycles completed this tick, across all slots.
    pub completed: u32,
    /// Whether fuel was replenished from an item or from energy.
    pub refueled: bool,
    /// Progress record to push, set when observers exist and visible state changed.
    pub sync: Option<ProgressMessage>,
}

/// The part of device state remote observers see.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    burning: bool,
    fuel: i32,
    max_fuel: i32,
    progress: BTreeMap<usize, u32>,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A capability resolved against a device face.
pub enum Capability<'a> {
    Items(SidedView<'a>),
    Energy(&'a mut EnergyBuffer),
    Power(PowerAdapter<'a>),
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// One placed processing block.
#[derive(Debug, Clone)]
pub struct Device {
    pub(crate) kind: DeviceKind,
    pub(crate) pos: BlockPos,
    pub(crate) facing: Facing,
    pub(crate) slots: Vec<Option<ItemStack>>,
    pub(crate) progress: BTreeMap<usize, u32>,
    pub(crate) fuel: f64,
    pub(crate) max_fuel: f64,
    pub(crate) last_tick_fuel_used: f64,
    pub(crate) energy: EnergyBuffer,
    pub(crate) routing: RoutingTable,
    pub(crate) split: bool,
    burning: bool,
    observers: BTreeSet<ObserverId>,
    upgrades: UpgradeCache,
    registry: Arc<Registry>,
}

impl Device {
    pub fn new(kind: DeviceKind, pos: BlockPos, facing: Facing, registry: Arc<Registry>) -> Self {
        Self {
            kind,
            pos,
            facing,
            slots: vec![None; SLOT_COUNT],
            progress: (0..3).map(|i| (i, 0)).collect(),
            fuel: 0.0,
            max_fuel: 0.0,
            last_tick_fuel_used: 0.0,
            energy: EnergyBuffer::default(),
            routing: RoutingTable::default(),
            split: false,
            burning: false,
            observers: BTreeSet::new(),
            upgrades: UpgradeCache::new(),
            registry,
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn max_fuel(&self) -> f64 {
        self.max_fuel
    }

    pub fn last_tick_fuel_used(&self) -> f64 {
        self.last_tick_fuel_used
    }

    /// Set fuel directly. `max_fuel` is raised to match if needed.
    pub fn set_fuel(&mut self, fuel: f64) {
        self.fuel = fuel.max(0.0);
        self.max_fuel = self.max_fuel.max(self.fuel);
    }

    pub fn progress(&self, slot: usize) -> u32 {
        self.progress.get(&slot).copied().unwrap_or(0)
    }

    pub fn progress_map(&self) -> &BTreeMap<usize, u32> {
        &self.progress
    }

    pub fn set_progress(&mut self, slot: usize, ticks: u32) {
        self.progress.insert(slot, ticks);
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn is_burning(&self) -> bool {
        self.burning
    }

    pub fn energy(&self) -> &EnergyBuffer {
        &self.energy
    }

    pub fn energy_mut(&mut self) -> &mut EnergyBuffer {
        &mut self.energy
    }

    pub fn stack(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    // -- Inventory mutation -------------------------------------------------

    /// Replace a slot's contents without validity checks.
    pub fn set_stack(&mut self, slot: usize, stack: Option<ItemStack>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = stack.filter(|s| s.count > 0);
            self.mark_dirty();
        }
    }

    /// Insert the way a player placing items by hand would: slot rules and
    /// limits apply, but not face routing. Returns what did not fit.
    pub fn insert_stack(&mut self, slot: usize, stack: ItemStack) -> Option<ItemStack> {
        if slot >= SLOT_COUNT || !self.is_item_valid(slot, &stack) {
            return Some(stack);
        }
        let limit = self.slot_limit(slot, &stack);
        let rest = insert_into_slot(&mut self.slots[slot], stack, limit, false);
        self.mark_dirty();
        rest
    }

    /// Remove up to `amount` items from a slot by hand.
    pub fn take_stack(&mut self, slot: usize, amount: u32) -> Option<ItemStack> {
        let taken = extract_from_slot(self.slots.get_mut(slot)?, amount, false);
        self.mark_dirty();
        taken
    }

    /// Every inventory mutation must pass through here.
    fn mark_dirty(&self) {
        self.upgrades.invalidate();
    }

    // -- Upgrades -----------------------------------------------------------

    pub fn upgrades(&self) -> UpgradeCounts {
        self.upgrades.get(&self.slots, &self.registry)
    }

    pub fn amount(&self, upgrade: Upgrade) -> u32 {
        self.upgrades().get(upgrade)
    }

    pub fn layout(&self) -> SlotLayout {
        self.upgrades().layout()
    }

    /// Ticks per processing cycle at the current SPEED count.
    pub fn needed_ticks(&self) -> u32 {
        let speed = self.amount(Upgrade::Speed) as f64;
        let divisor = 1.0 + speed * self.registry.settings().speed_multiplier;
        let ticks = (self.kind.base_ticks() as f64 / divisor) as u32;
        ticks.max(MIN_NEEDED_TICKS)
    }

    /// Fuel cost scale from SPEED (up) and EFFICIENCY (down).
    pub fn fuel_multiplier(&self) -> f64 {
        let settings = self.registry.settings();
        let speed = self.amount(Upgrade::Speed) as f64;
        let efficiency = self.amount(Upgrade::Efficiency) as f64;
        (1.0 + speed * settings.speed_fuel_multiplier)
            / (1.0 + efficiency * settings.effi_fuel_multiplier)
    }

    /// Fuel one active slot burns per tick.
    pub fn needed_fuel(&self) -> f64 {
        self.fuel_multiplier() / (self.needed_ticks() as f64 / FUEL_REFERENCE_TICKS)
    }

    // -- Slot rules ---------------------------------------------------------

    /// Whether `stack` belongs in `slot` at all, regardless of face.
    pub fn is_item_valid(&self, slot: usize, stack: &ItemStack) -> bool {
        let layout = self.layout();
        if stack.count == 0 || layout.is_output(slot) {
            return false;
        }
        if layout.is_input(slot) {
            return self.registry.result(self.kind, stack).is_some();
        }
        if layout.is_fuel(slot) {
            return self.registry.is_fuel(stack);
        }
        if UPGRADE_SLOTS.contains(&slot) {
            return self.accepts_upgrade(slot, stack);
        }
        false
    }

    /// Upgrade slots take enabled upgrade kinds, one slot per kind.
    fn accepts_upgrade(&self, slot: usize, stack: &ItemStack) -> bool {
        let Some(kind) = self.registry.upgrade_kind(stack) else {
            return false;
        };
        if !self.registry.settings().is_enabled(kind) {
            return false;
        }
        UPGRADE_SLOTS.filter(|&other| other != slot).all(|other| {
            self.stack(other)
                .and_then(|s| self.registry.upgrade_kind(s))
                .is_none_or(|k| k != kind)
        })
    }

    fn slot_limit(&self, slot: usize, stack: &ItemStack) -> u32 {
        let base = self.registry.slot_limit(stack.item);
        if UPGRADE_SLOTS.contains(&slot) {
            if let Some(kind) = self.registry.upgrade_kind(stack) {
                return base.min(kind.max_stack());
            }
        }
        base
    }

    /// Whether input `slot` can complete a cycle into its paired output.
    pub fn can_process(&self, slot: usize) -> bool {
        let Some(input) = self.stack(slot) else {
            return false;
        };
        let Some(result) = self.registry.result(self.kind, input) else {
            return false;
        };
        match self.stack(slot + OUTPUT_OFFSET) {
            None => true,
            Some(output) if !result.can_stack_with(output) => false,
            Some(output) => output.count + result.count <= self.registry.slot_limit(output.item),
        }
    }

    pub fn can_process_any(&self) -> bool {
        self.layout().inputs().iter().any(|&i| self.can_process(i))
    }

    /// Whether the product of `stack` would fit the output paired with `slot`.
    fn fits(&self, stack: &ItemStack, slot: usize) -> bool {
        let Some(output) = self.stack(slot + OUTPUT_OFFSET) else {
            return true;
        };
        match self.registry.result(self.kind, stack) {
            Some(result) => {
                result.can_stack_with(output)
                    && output.count + result.count <= self.registry.max_stack(output.item)
            }
            None => false,
        }
    }

    // -- Face routing -------------------------------------------------------

    /// The logical face seen on world face `side`.
    pub fn direction_for(&self, side: Facing) -> Direction {
        Direction::from_side(side, self.facing)
    }

    fn channel_open(&self, channel: Channel, side: Facing) -> bool {
        self.routing.get(channel, self.direction_for(side)).is_open()
    }

    /// Slots reachable through world face `side`.
    ///
    /// Without an IO upgrade the routing table is ignored: the bottom reaches
    /// outputs, the top reaches inputs, and every other face reaches fuel.
    pub fn slots_for_face(&self, side: Facing) -> Vec<usize> {
        let layout = self.layout();
        if !self.upgrades().has(Upgrade::Io) {
            return match side {
                Facing::Down => layout.outputs().to_vec(),
                Facing::Up => layout.inputs().to_vec(),
                _ => layout.fuel().to_vec(),
            };
        }
        let mut slots = Vec::new();
        if self.channel_open(Channel::Input, side) {
            slots.extend_from_slice(layout.inputs());
        }
        if self.channel_open(Channel::Output, side) {
            slots.extend_from_slice(layout.outputs());
        }
        if self.channel_open(Channel::Fuel, side) {
            slots.extend_from_slice(layout.fuel());
        }
        slots
    }

    pub fn can_insert(&self, slot: usize, stack: &ItemStack, side: Facing) -> bool {
        let layout = self.layout();
        let routed = (self.channel_open(Channel::Input, side) && layout.is_input(slot))
            || (self.channel_open(Channel::Fuel, side) && layout.is_fuel(slot));
        routed && self.is_item_valid(slot, stack)
    }

    /// Fuel items never leave through the fuel channel, so automation cannot
    /// undo fuel staging; spent containers and leftovers can.
    pub fn can_extract(&self, slot: usize, stack: &ItemStack, side: Facing) -> bool {
        let layout = self.layout();
        (self.channel_open(Channel::Output, side) && layout.is_output(slot))
            || (self.channel_open(Channel::Fuel, side)
                && layout.is_fuel(slot)
                && !self.registry.is_fuel(stack))
    }

    /// Item access through one world face.
    pub fn sided(&mut self, side: Facing) -> SidedView<'_> {
        let slots = self.slots_for_face(side);
        SidedView {
            device: self,
            side,
            slots,
        }
    }

    // -- Capabilities -------------------------------------------------------

    pub fn has_capability(&self, key: CapabilityKey, table: &CapabilityTable) -> bool {
        !key.is_energy() || (table.is_registered(key) && self.upgrades().has(Upgrade::Energy))
    }

    /// Resolve a capability on world face `side`. Energy flavours resolve only
    /// with an ENERGY upgrade and a registered key.
    pub fn capability(
        &mut self,
        key: CapabilityKey,
        side: Facing,
        table: &CapabilityTable,
    ) -> Option<Capability<'_>> {
        if !self.has_capability(key, table) {
            return None;
        }
        Some(match key {
            CapabilityKey::Items => Capability::Items(self.sided(side)),
            CapabilityKey::ForgeEnergy | CapabilityKey::RedstoneFlux => {
                Capability::Energy(&mut self.energy)
            }
            CapabilityKey::TeslaConsumer | CapabilityKey::TeslaHolder => {
                Capability::Power(PowerAdapter::new(&mut self.energy))
            }
        })
    }

    // -- Observers ----------------------------------------------------------

    pub fn add_observer(&mut self, observer: ObserverId) -> bool {
        self.observers.insert(observer)
    }

    pub fn remove_observer(&mut self, observer: ObserverId) -> bool {
        self.observers.remove(&observer)
    }

    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// The compact record pushed to observers.
    pub fn progress_message(&self) -> ProgressMessage {
        ProgressMessage {
            burning: self.burning,
            x: self.pos.x,
            y: self.pos.y,
            z: self.pos.z,
            fuel: self.fuel as i32,
            max_fuel: self.max_fuel as i32,
            progress: self.progress.clone(),
        }
    }

    fn observed(&self) -> Observed {
        Observed {
            burning: self.burning,
            fuel: self.fuel as i32,
            max_fuel: self.max_fuel as i32,
            progress: self.progress.clone(),
        }
    }

    // -- UI -----------------------------------------------------------------

    pub fn handle_ui(&mut self, action: UiAction) {
        match action {
            UiAction::ToggleSplit => self.split = !self.split,
            UiAction::CycleRouting { channel, direction } => {
                self.routing.advance(channel, direction);
            }
        }
    }

    // -- Tick pipeline ------------------------------------------------------

    /// Advance this device by one tick at world time `world_time`.
    pub fn tick(&mut self, world_time: Ticks, neighbours: &mut dyn Neighbors) -> TickOutcome {
        let before = self.observed();
        let mut outcome = TickOutcome::default();

        self.export(world_time, neighbours);
        self.import(world_time, neighbours);
        self.organize(world_time);

        if self.fuel > self.max_fuel {
            self.max_fuel = self.fuel;
        }
        if self.fuel < 0.0 {
            self.fuel = 0.0;
        }

        if world_time % INDICATOR_INTERVAL == 0 {
            self.burning = self.fuel > 0.0;
        }

        outcome.refueled = self.refuel();

        let fuel_before = self.fuel;
        for &slot in self.layout().inputs() {
            if self.burn(slot) {
                outcome.completed += 1;
            }
        }
        let previous = self.last_tick_fuel_used;
        self.last_tick_fuel_used = fuel_before - self.fuel;
        if self.last_tick_fuel_used.abs() < FUEL_EPSILON && self.upgrades().has(Upgrade::Eco) {
            self.last_tick_fuel_used = previous;
        }

        if self.has_observers() && self.observed() != before {
            outcome.sync = Some(self.progress_message());
        }
        outcome
    }

    fn auto_io_due(&self, world_time: Ticks) -> bool {
        world_time % EXPORT_INTERVAL == 0 && self.upgrades().has(Upgrade::Io)
    }

    fn item_transfer_limit(&self) -> u32 {
        2 + 2 * self.amount(Upgrade::Slot)
    }

    /// Push output and fuel-channel items into neighbours on AUTO faces.
    fn export(&mut self, world_time: Ticks, neighbours: &mut dyn Neighbors) {
        if !self.auto_io_due(world_time) {
            return;
        }
        for channel in [Channel::Output, Channel::Fuel] {
            for side in Facing::ALL {
                if self.routing.get(channel, self.direction_for(side)) != Mode::Auto {
                    continue;
                }
                let limit = self.item_transfer_limit();
                let target = self.pos.offset(side);
                let Some(mut neighbour) = neighbours.item_handler(target, side.opposite()) else {
                    continue;
                };
                let mut own = self.sided(side);
                if transfer(&mut own, neighbour.as_mut(), limit, &|_| true) {
                    break;
                }
            }
        }
    }

    /// Pull input and fuel items from neighbours on AUTO faces.
    fn import(&mut self, world_time: Ticks, neighbours: &mut dyn Neighbors) {
        if !self.auto_io_due(world_time) {
            return;
        }
        for channel in [Channel::Input, Channel::Fuel] {
            let registry = Arc::clone(&self.registry);
            let kind = self.kind;
            let (limit, filter): (u32, Box<dyn Fn(&ItemStack) -> bool>) = match channel {
                Channel::Fuel => (1, Box::new(move |s: &ItemStack| registry.is_fuel(s))),
                _ => (
                    self.item_transfer_limit(),
                    Box::new(move |s: &ItemStack| registry.result(kind, s).is_some()),
                ),
            };
            for side in Facing::ALL {
                if self.routing.get(channel, self.direction_for(side)) != Mode::Auto {
                    continue;
                }
                let target = self.pos.offset(side);
                let Some(mut neighbour) = neighbours.item_handler(target, side.opposite()) else {
                    continue;
                };
                let mut own = self.sided(side);
                if transfer(neighbour.as_mut(), &mut own, limit, filter.as_ref()) {
                    break;
                }
            }
        }
    }

    /// Spread or compact items across the active input slots.
    fn organize(&mut self, world_time: Ticks) {
        if world_time % ORGANIZE_INTERVAL != 0 || self.amount(Upgrade::Slot) == 0 {
            return;
        }
        let inputs = self.layout().inputs();
        if self.split {
            for &i in inputs {
                for &j in inputs {
                    if i > j {
                        self.split_pair(i, j);
                    }
                }
            }
        } else {
            for &i in inputs {
                for &j in inputs {
                    let movable = self.stack(j).is_none()
                        && !self.can_process(i)
                        && self.stack(i).is_some_and(|s| self.fits(s, j));
                    if movable {
                        let moved = self.slots[i].take();
                        self.slots[j] = moved;
                        self.mark_dirty();
                    }
                }
            }
        }
    }

    /// Balance one pair of input slots. The higher slot takes any odd item.
    fn split_pair(&mut self, high: usize, low: usize) {
        let (a, b) = (self.slots[high].clone(), self.slots[low].clone());
        let (high_stack, low_stack) = match (a, b) {
            (None, None) => return,
            (None, Some(lone)) | (Some(lone), None) => {
                let empty = if self.slots[high].is_none() { high } else { low };
                if lone.count <= 1 || !self.fits(&lone, empty) {
                    return;
                }
                lone.split_half()
            }
            (Some(first), Some(second)) => {
                if !first.can_stack_with(&second) {
                    return;
                }
                let (larger, smaller) = split_count(first.count + second.count);
                (first.with_count(larger), first.with_count(smaller))
            }
        };
        self.slots[high] = Some(high_stack);
        self.slots[low] = Some(low_stack);
        self.mark_dirty();
    }

    /// Stage fuel and top up when nearly empty. Returns `true` on refuel.
    fn refuel(&mut self) -> bool {
        let [primary, staging] = FUEL_SLOTS;
        let staged = self.slots[primary].is_none()
            && self.stack(staging).is_some_and(|s| self.registry.is_fuel(s));
        if staged {
            self.slots[primary] = self.slots[staging].take();
            self.mark_dirty();
        }

        if !self.can_process_any() || self.fuel > self.last_tick_fuel_used + REFUEL_MARGIN {
            return false;
        }

        let mut gained = 0;
        if let Some(stack) = self.slots[primary].clone() {
            gained = self.registry.burn_time(&stack);
            if gained > 0 {
                match self.registry.container_item(&stack) {
                    Some(container) => self.slots[primary] = Some(container),
                    None => shrink_slot(&mut self.slots[primary], 1),
                }
                self.mark_dirty();
            }
        }
        if gained == 0 && self.upgrades().has(Upgrade::Energy) {
            gained = self.energy.extract_energy(ENERGY_DRAW, false) / ENERGY_PER_FUEL;
        }

        if gained == 0 {
            return false;
        }
        self.fuel += gained as f64;
        self.max_fuel = self.fuel;
        true
    }

    /// Advance one input slot. Returns `true` when a cycle completed.
    fn burn(&mut self, slot: usize) -> bool {
        let needed_fuel = self.needed_fuel();
        let eco = self.upgrades().has(Upgrade::Eco);
        let mut advanced = false;
        let mut completed = false;

        if !self.can_process(slot) {
            self.progress.insert(slot, 0);
        } else if self.fuel + FUEL_EPSILON >= needed_fuel {
            let ticks = self.progress(slot) + 1;
            advanced = true;
            if ticks >= self.needed_ticks() {
                self.process_item(slot);
                self.progress.insert(slot, 0);
                completed = true;
            } else {
                self.progress.insert(slot, ticks);
            }
        } else if !eco {
            self.progress.insert(slot, 0);
        }

        if advanced || !eco {
            self.fuel -= needed_fuel.min(self.fuel);
        }
        completed
    }

    /// Turn one input item into its product in the paired output.
    fn process_item(&mut self, slot: usize) {
        let Some(result) = self
            .stack(slot)
            .and_then(|input| self.registry.result(self.kind, input))
        else {
            return;
        };
        let output = &mut self.slots[slot + OUTPUT_OFFSET];
        match output {
            None => *output = Some(result),
            Some(existing) if existing.can_stack_with(&result) => existing.count += result.count,
            Some(_) => {}
        }
        shrink_slot(&mut self.slots[slot], 1);
        self.mark_dirty();
    }
}

// ---------------------------------------------------------------------------
// Sided view
// ---------------------------------------------------------------------------

/// A device seen through one world face, exposing only the slots that face
/// reaches and enforcing the face's insert and extract rules.
pub struct SidedView<'a> {
    device: &'a mut Device,
    side: Facing,
    slots: Vec<usize>,
}

impl SidedView<'_> {
    pub fn side(&self) -> Facing {
        self.side
    }

    /// Device slot indices behind this view, in view order.
    pub fn device_slots(&self) -> &[usize] {
        &self.slots
    }
}

impl ItemHandler for SidedView<'_> {
    fn slots(&self) -> usize {
        self.slots.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(|&s| self.device.stack(s))
    }

    fn insert_item(
        &mut self,
        slot: usize,
        stack: ItemStack,
        simulate: bool,
    ) -> Option<ItemStack> {
        let Some(&target) = self.slots.get(slot) else {
            return Some(stack);
        };
        if !self.device.can_insert(target, &stack, self.side) {
            return Some(stack);
        }
        let limit = self.device.slot_limit(target, &stack);
        let rest = insert_into_slot(&mut self.device.slots[target], stack, limit, simulate);
        if !simulate {
            self.device.mark_dirty();
        }
        rest
    }

    fn extract_item(&mut self, slot: usize, amount: u32, simulate: bool) -> Option<ItemStack> {
        let &target = self.slots.get(slot)?;
        let stack = self.device.stack(target)?;
        if !self.device.can_extract(target, stack, self.side) {
            return None;
        }
        let taken = extract_from_slot(&mut self.device.slots[target], amount, simulate);
        if !simulate {
            self.device.mark_dirty();
        }
        taken
    }
}
