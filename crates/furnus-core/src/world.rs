//! Server-side host for devices and plain containers.
//!
//! The world owns every device in a `SlotMap`, indexed by block position,
//! and ticks them in placement order. While a device ticks it is taken out
//! of its slot, so it can borrow its neighbours (other devices included)
//! mutably without aliasing itself.

use crate::device::{Capability, Device, DeviceKind, Neighbors, Ticks};
use crate::energy::{CapabilityKey, CapabilityTable};
use crate::id::{BlockPos, DeviceId, ObserverId};
use crate::item::{Container, ItemHandler, ItemStack};
use crate::persist::{DeserializeError, DeviceRecord, SerializeError, SnapshotHeader};
use crate::registry::Registry;
use crate::routing::Facing;
use crate::sync::SyncSender;
use crate::ui::{UiError, UiMessage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("position {0:?} is already occupied")]
    Occupied(BlockPos),
    #[error("no device at {0:?}")]
    NoDevice(BlockPos),
    #[error(transparent)]
    Ui(#[from] UiError),
}

/// Totals for one [`World::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldTick {
    /// Processing cycles completed across all devices.
    pub completed: u32,
    /// Progress messages handed to the sync channel.
    pub synced: usize,
}

pub struct World {
    registry: Arc<Registry>,
    devices: SlotMap<DeviceId, Option<Device>>,
    order: Vec<DeviceId>,
    by_pos: HashMap<BlockPos, DeviceId>,
    containers: HashMap<BlockPos, Container>,
    time: Ticks,
    capabilities: CapabilityTable,
    sync: Option<SyncSender>,
}

impl World {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            devices: SlotMap::with_key(),
            order: Vec::new(),
            by_pos: HashMap::new(),
            containers: HashMap::new(),
            time: 0,
            capabilities: CapabilityTable::default(),
            sync: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Route progress messages to `sender` from now on.
    pub fn attach_sync(&mut self, sender: SyncSender) {
        self.sync = Some(sender);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn time(&self) -> Ticks {
        self.time
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn device_count(&self) -> usize {
        self.order.len()
    }

    fn is_occupied(&self, pos: BlockPos) -> bool {
        self.by_pos.contains_key(&pos) || self.containers.contains_key(&pos)
    }

    // -- Placement ----------------------------------------------------------

    pub fn place_device(
        &mut self,
        kind: DeviceKind,
        pos: BlockPos,
        facing: Facing,
    ) -> Result<DeviceId, WorldError> {
        let device = Device::new(kind, pos, facing, Arc::clone(&self.registry));
        self.insert_device(device)
    }

    fn insert_device(&mut self, device: Device) -> Result<DeviceId, WorldError> {
        let pos = device.pos();
        if self.is_occupied(pos) {
            return Err(WorldError::Occupied(pos));
        }
        info!("placing {:?} at {pos:?} facing {:?}", device.kind(), device.facing());
        let id = self.devices.insert(Some(device));
        self.order.push(id);
        self.by_pos.insert(pos, id);
        Ok(id)
    }

    pub fn place_container(&mut self, pos: BlockPos, size: usize) -> Result<(), WorldError> {
        if self.is_occupied(pos) {
            return Err(WorldError::Occupied(pos));
        }
        debug!("placing {size}-slot container at {pos:?}");
        self.containers
            .insert(pos, Container::new(size, Arc::clone(&self.registry)));
        Ok(())
    }

    pub fn remove_device(&mut self, pos: BlockPos) -> Result<Device, WorldError> {
        let id = self.by_pos.remove(&pos).ok_or(WorldError::NoDevice(pos))?;
        self.order.retain(|&o| o != id);
        info!("removing device at {pos:?}");
        self.devices
            .remove(id)
            .flatten()
            .ok_or(WorldError::NoDevice(pos))
    }

    // -- Lookup -------------------------------------------------------------

    pub fn device_id(&self, pos: BlockPos) -> Option<DeviceId> {
        self.by_pos.get(&pos).copied()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id).and_then(Option::as_ref)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id).and_then(Option::as_mut)
    }

    pub fn device_at(&self, pos: BlockPos) -> Option<&Device> {
        self.device(self.device_id(pos)?)
    }

    pub fn device_at_mut(&mut self, pos: BlockPos) -> Option<&mut Device> {
        let id = self.device_id(pos)?;
        self.device_mut(id)
    }

    pub fn container_at(&self, pos: BlockPos) -> Option<&Container> {
        self.containers.get(&pos)
    }

    pub fn container_at_mut(&mut self, pos: BlockPos) -> Option<&mut Container> {
        self.containers.get_mut(&pos)
    }

    /// Resolve a capability of the device at `pos` on world face `side`.
    pub fn capability(
        &mut self,
        pos: BlockPos,
        key: CapabilityKey,
        side: Facing,
    ) -> Option<Capability<'_>> {
        let id = self.by_pos.get(&pos)?;
        let device = self.devices.get_mut(*id)?.as_mut()?;
        device.capability(key, side, &self.capabilities)
    }

    // -- UI -----------------------------------------------------------------

    /// Register `observer` on the device at `pos`. Returns the UI id to open.
    pub fn open_gui(&mut self, pos: BlockPos, observer: ObserverId) -> Result<u32, WorldError> {
        let device = self.device_at_mut(pos).ok_or(WorldError::NoDevice(pos))?;
        device.add_observer(observer);
        let gui = device.kind().gui_id();
        let snapshot = device.progress_message();
        debug!("observer {observer:?} opened ui {gui} at {pos:?}");
        if let Some(sync) = &self.sync {
            sync.send(&snapshot);
        }
        Ok(gui)
    }

    pub fn close_gui(&mut self, pos: BlockPos, observer: ObserverId) -> Result<(), WorldError> {
        let device = self.device_at_mut(pos).ok_or(WorldError::NoDevice(pos))?;
        device.remove_observer(observer);
        debug!("observer {observer:?} closed ui at {pos:?}");
        Ok(())
    }

    /// Apply a UI button press to the device at `pos`.
    pub fn interact(&mut self, pos: BlockPos, message: &UiMessage) -> Result<(), WorldError> {
        let action = message.action().inspect_err(|e| {
            warn!("rejected ui message at {pos:?}: {e}");
        })?;
        let device = self.device_at_mut(pos).ok_or(WorldError::NoDevice(pos))?;
        device.handle_ui(action);
        Ok(())
    }

    // -- Tick ---------------------------------------------------------------

    /// Advance world time by one tick and tick every device in placement order.
    pub fn tick(&mut self) -> WorldTick {
        self.time += 1;
        let mut report = WorldTick::default();

        for &id in &self.order {
            let Some(mut device) = self.devices.get_mut(id).and_then(Option::take) else {
                continue;
            };
            let mut neighbours = WorldNeighbors {
                devices: &mut self.devices,
                by_pos: &self.by_pos,
                containers: &mut self.containers,
            };
            let outcome = device.tick(self.time, &mut neighbours);
            report.completed += outcome.completed;

            if let (Some(message), Some(sync)) = (&outcome.sync, &self.sync) {
                if sync.send(message) {
                    report.synced += 1;
                }
            }
            if let Some(slot) = self.devices.get_mut(id) {
                *slot = Some(device);
            }
        }
        report
    }

    // -- Snapshots ----------------------------------------------------------

    pub fn save(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.time),
            devices: self
                .order
                .iter()
                .filter_map(|&id| self.device(id))
                .map(|d| (d.pos(), d.to_record()))
                .collect(),
            containers: self
                .containers
                .iter()
                .map(|(pos, c)| (*pos, c.stacks().to_vec()))
                .collect(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Rebuild a world from [`World::save`] output. Observers and the sync
    /// channel are not part of a snapshot.
    pub fn load(data: &[u8], registry: Arc<Registry>) -> Result<World, DeserializeError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut world = World::new(Arc::clone(&registry));
        world.time = snapshot.header.time;
        for (pos, record) in &snapshot.devices {
            let device = Device::from_record(record, *pos, Arc::clone(&registry))?;
            world
                .insert_device(device)
                .map_err(|e| DeserializeError::Decode(e.to_string()))?;
        }
        for (pos, stacks) in snapshot.containers {
            world
                .containers
                .insert(pos, Container::from_stacks(stacks, Arc::clone(&registry)));
        }
        info!(
            "loaded world at t={} with {} devices",
            world.time,
            world.device_count()
        );
        Ok(world)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    devices: Vec<(BlockPos, DeviceRecord)>,
    containers: Vec<(BlockPos, Vec<Option<ItemStack>>)>,
}

/// Neighbour lookup over everything in the world except the ticking device.
struct WorldNeighbors<'w> {
    devices: &'w mut SlotMap<DeviceId, Option<Device>>,
    by_pos: &'w HashMap<BlockPos, DeviceId>,
    containers: &'w mut HashMap<BlockPos, Container>,
}

impl Neighbors for WorldNeighbors<'_> {
    fn item_handler(&mut self, pos: BlockPos, side: Facing) -> Option<Box<dyn ItemHandler + '_>> {
        if let Some(container) = self.containers.get_mut(&pos) {
            return Some(Box::new(container));
        }
        let id = self.by_pos.get(&pos)?;
        let device = self.devices.get_mut(*id)?.as_mut()?;
        Some(Box::new(device.sided(side)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::ui::UiMessage;
    use crate::upgrade::Upgrade;

    const HERE: BlockPos = BlockPos::new(0, 64, 0);

    #[test]
    fn placing_twice_at_same_position_fails() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Furnace, HERE, Facing::North)
            .unwrap();
        assert!(matches!(
            world.place_device(DeviceKind::Pulverizer, HERE, Facing::North),
            Err(WorldError::Occupied(_))
        ));
        assert!(matches!(
            world.place_container(HERE, 9),
            Err(WorldError::Occupied(_))
        ));
    }

    #[test]
    fn tick_advances_time_and_devices() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Furnace, HERE, Facing::North)
            .unwrap();
        let device = world.device_at_mut(HERE).unwrap();
        device.set_stack(0, Some(ItemStack::new(iron_ore(), 1)));
        device.set_fuel(500.0);

        let mut completed = 0;
        for _ in 0..140 {
            completed += world.tick().completed;
        }
        assert_eq!(world.time(), 140);
        assert_eq!(completed, 1);
    }

    #[test]
    fn gui_ids_and_observers() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Pulverizer, HERE, Facing::East)
            .unwrap();
        assert_eq!(world.open_gui(HERE, ObserverId(3)).unwrap(), 1);
        assert!(world.device_at(HERE).unwrap().has_observers());
        world.close_gui(HERE, ObserverId(3)).unwrap();
        assert!(!world.device_at(HERE).unwrap().has_observers());
        assert!(matches!(
            world.open_gui(BlockPos::new(5, 5, 5), ObserverId(3)),
            Err(WorldError::NoDevice(_))
        ));
    }

    #[test]
    fn interact_routes_to_device() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Furnace, HERE, Facing::North)
            .unwrap();
        world.interact(HERE, &UiMessage::toggle_split()).unwrap();
        assert!(world.device_at(HERE).unwrap().is_split());

        let bad = UiMessage {
            id: 99,
            window: None,
        };
        assert!(matches!(
            world.interact(HERE, &bad),
            Err(WorldError::Ui(UiError::UnknownButton(99)))
        ));

        let hostile = UiMessage {
            id: i32::MIN,
            window: Some("in".into()),
        };
        assert!(matches!(
            world.interact(HERE, &hostile),
            Err(WorldError::Ui(UiError::UnknownButton(i32::MIN)))
        ));
        assert_eq!(world.device_at(HERE).unwrap().routing(), &Default::default());
    }

    #[test]
    fn device_exports_into_neighbouring_device() {
        let mut world = World::new(test_registry());
        let below = HERE.offset(Facing::Down);
        world
            .place_device(DeviceKind::Pulverizer, HERE, Facing::North)
            .unwrap();
        world
            .place_device(DeviceKind::Furnace, below, Facing::North)
            .unwrap();

        let top = world.device_at_mut(HERE).unwrap();
        top.set_stack(8, Some(ItemStack::new(upgrade_item(Upgrade::Io), 1)));
        top.handle_ui(crate::ui::UiAction::CycleRouting {
            channel: crate::routing::Channel::Output,
            direction: crate::routing::Direction::Bottom,
        });
        top.set_stack(3, Some(ItemStack::new(sand(), 10)));

        // Sand goes out of the pulverizer's bottom into the furnace's top.
        for _ in 0..10 {
            world.tick();
        }
        let furnace = world.device_at(below).unwrap();
        assert_eq!(furnace.stack(0), Some(&ItemStack::new(sand(), 2)));
    }

    #[test]
    fn energy_capability_through_world() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Furnace, HERE, Facing::North)
            .unwrap();
        assert!(world.capability(HERE, CapabilityKey::ForgeEnergy, Facing::Up).is_none());

        world
            .device_at_mut(HERE)
            .unwrap()
            .set_stack(8, Some(ItemStack::new(upgrade_item(Upgrade::Energy), 1)));
        match world.capability(HERE, CapabilityKey::ForgeEnergy, Facing::Up) {
            Some(Capability::Energy(buffer)) => {
                buffer.receive_energy(1_000, false);
            }
            _ => panic!("expected energy capability"),
        }
        assert_eq!(world.device_at(HERE).unwrap().energy().energy(), 1_000);
    }

    #[test]
    fn save_and_load_preserve_devices() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Pulverizer, HERE, Facing::West)
            .unwrap();
        world.place_container(BlockPos::new(1, 64, 0), 4).unwrap();
        world
            .container_at_mut(BlockPos::new(1, 64, 0))
            .unwrap()
            .set_stack(2, Some(ItemStack::new(coal(), 7)));
        let device = world.device_at_mut(HERE).unwrap();
        device.set_stack(0, Some(ItemStack::new(iron_ore(), 4)));
        device.set_fuel(300.0);
        for _ in 0..25 {
            world.tick();
        }

        let bytes = world.save().unwrap();
        let loaded = World::load(&bytes, test_registry()).unwrap();
        assert_eq!(loaded.time(), 25);
        let (a, b) = (world.device_at(HERE).unwrap(), loaded.device_at(HERE).unwrap());
        assert_eq!(a.to_record(), b.to_record());
        assert_eq!(b.facing(), Facing::West);
        assert_eq!(
            loaded
                .container_at(BlockPos::new(1, 64, 0))
                .unwrap()
                .count_of(coal()),
            7
        );
    }

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(
            World::load(&[1, 2, 3], test_registry()),
            Err(DeserializeError::Decode(_))
        ));
    }

    #[test]
    fn removed_device_is_gone() {
        let mut world = World::new(test_registry());
        world
            .place_device(DeviceKind::Furnace, HERE, Facing::North)
            .unwrap();
        assert!(world.remove_device(HERE).is_ok());
        assert!(world.device_at(HERE).is_none());
        assert_eq!(world.device_count(), 0);
        world.tick();
    }
}
