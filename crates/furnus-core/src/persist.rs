//! Device records and versioned world snapshots.
//!
//! A [`DeviceRecord`] is the structured, field-by-field save of one device.
//! Every field defaults, so records written by older builds (missing routing
//! maps, missing progress) still load; gaps are filled with the values a
//! freshly placed device would have.
//!
//! World snapshots wrap a list of records in a bitcode payload behind a
//! [`SnapshotHeader`] carrying a magic number and format version.

use crate::device::{Device, DeviceKind, SLOT_COUNT, Ticks};
use crate::id::{BlockPos, ItemTypeId};
use crate::item::ItemStack;
use crate::registry::Registry;
use crate::routing::{Channel, Direction, Facing, Mode, RoutingTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a Furnus world snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xF0_2A_05_01;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {} (this build supports up to {})", .0, FORMAT_VERSION)]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error(transparent)]
    Record(#[from] PersistError),
}

/// Errors turning a [`DeviceRecord`] back into a device.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("slot {} is out of range (devices have {} slots)", .0, SLOT_COUNT)]
    SlotOutOfRange(usize),
    #[error("slot {slot} holds unknown item {item:?}")]
    UnknownItem { slot: usize, item: ItemTypeId },
    #[error("slot {0} holds an empty stack")]
    EmptyStack(usize),
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every world snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// World time when the snapshot was taken.
    pub time: Ticks,
}

impl SnapshotHeader {
    pub fn new(time: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            time,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Device record
// ---------------------------------------------------------------------------

/// One occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot: usize,
    pub stack: ItemStack,
}

/// Structured save of a device. Field names follow the established save
/// layout; every field is optional on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    pub kind: Option<DeviceKind>,
    pub facing: Option<Facing>,
    pub energy: u32,
    pub progress: BTreeMap<usize, u32>,
    pub split: bool,
    pub fuel: f64,
    #[serde(rename = "maxfuel")]
    pub max_fuel: f64,
    #[serde(rename = "lastTickFuelUsed")]
    pub last_tick_fuel_used: f64,
    pub inmap: Option<BTreeMap<Direction, Mode>>,
    pub outmap: Option<BTreeMap<Direction, Mode>>,
    pub fuelmap: Option<BTreeMap<Direction, Mode>>,
    pub items: Vec<SlotRecord>,
}

impl DeviceRecord {
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Device {
    /// Capture everything persistent about this device.
    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            kind: Some(self.kind),
            facing: Some(self.facing),
            energy: self.energy.energy(),
            progress: self.progress.clone(),
            split: self.split,
            fuel: self.fuel,
            max_fuel: self.max_fuel,
            last_tick_fuel_used: self.last_tick_fuel_used,
            inmap: Some(self.routing.channel_map(Channel::Input)),
            outmap: Some(self.routing.channel_map(Channel::Output)),
            fuelmap: Some(self.routing.channel_map(Channel::Fuel)),
            items: self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(slot, stack)| {
                    stack.clone().map(|stack| SlotRecord { slot, stack })
                })
                .collect(),
        }
    }

    /// Rebuild a device at `pos` from a record. A record without a kind
    /// loads as a furnace; one without a facing loads facing north.
    pub fn from_record(
        record: &DeviceRecord,
        pos: BlockPos,
        registry: Arc<Registry>,
    ) -> Result<Device, PersistError> {
        for SlotRecord { slot, stack } in &record.items {
            if *slot >= SLOT_COUNT {
                return Err(PersistError::SlotOutOfRange(*slot));
            }
            if stack.count == 0 {
                return Err(PersistError::EmptyStack(*slot));
            }
            if registry.get_item(stack.item).is_none() {
                return Err(PersistError::UnknownItem {
                    slot: *slot,
                    item: stack.item,
                });
            }
        }

        let kind = record.kind.unwrap_or(DeviceKind::Furnace);
        let facing = record.facing.unwrap_or(Facing::North);
        let mut device = Device::new(kind, pos, facing, registry);

        for SlotRecord { slot, stack } in &record.items {
            device.set_stack(*slot, Some(stack.clone()));
        }
        device.progress.extend(record.progress.iter().map(|(k, v)| (*k, *v)));
        device.energy.set_energy(record.energy);
        device.split = record.split;
        device.fuel = record.fuel;
        device.max_fuel = record.max_fuel;
        device.last_tick_fuel_used = record.last_tick_fuel_used;
        device.routing = RoutingTable::from_channel_maps(
            record.inmap.as_ref(),
            record.outmap.as_ref(),
            record.fuelmap.as_ref(),
        );
        Ok(device)
    }
}
