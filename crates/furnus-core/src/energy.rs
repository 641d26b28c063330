//! Energy storage and optional energy-interop capabilities.
//!
//! A device always owns an [`EnergyBuffer`], but only exposes it (and only
//! draws fuel from it) while an ENERGY upgrade is installed. Which interop
//! flavours are reachable is decided at runtime by a [`CapabilityTable`]: an
//! unregistered key behaves exactly like an unsupported capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default buffer capacity of a device.
pub const DEVICE_ENERGY_CAPACITY: u32 = 80_000;
/// Default per-call transfer cap of a device, both directions.
pub const DEVICE_ENERGY_TRANSFER: u32 = 2_000;

/// Anything that can accept energy from a neighbour.
pub trait EnergyReceiver {
    /// Accept up to `amount`. Returns how much was (or would be) accepted.
    fn receive(&mut self, amount: u64, simulate: bool) -> u64;

    fn stored(&self) -> u64;

    fn capacity(&self) -> u64;
}

/// Bounded energy store with per-call transfer caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyBuffer {
    stored: u32,
    capacity: u32,
    max_receive: u32,
    max_extract: u32,
}

impl Default for EnergyBuffer {
    fn default() -> Self {
        Self::new(DEVICE_ENERGY_CAPACITY, DEVICE_ENERGY_TRANSFER)
    }
}

impl EnergyBuffer {
    pub fn new(capacity: u32, max_transfer: u32) -> Self {
        Self {
            stored: 0,
            capacity,
            max_receive: max_transfer,
            max_extract: max_transfer,
        }
    }

    pub fn energy(&self) -> u32 {
        self.stored
    }

    pub fn max_energy(&self) -> u32 {
        self.capacity
    }

    /// Overwrite the stored amount, clamped to capacity.
    pub fn set_energy(&mut self, stored: u32) {
        self.stored = stored.min(self.capacity);
    }

    pub fn receive_energy(&mut self, amount: u32, simulate: bool) -> u32 {
        let accepted = amount
            .min(self.max_receive)
            .min(self.capacity - self.stored);
        if !simulate {
            self.stored += accepted;
        }
        accepted
    }

    pub fn extract_energy(&mut self, amount: u32, simulate: bool) -> u32 {
        let taken = amount.min(self.max_extract).min(self.stored);
        if !simulate {
            self.stored -= taken;
        }
        taken
    }
}

impl EnergyReceiver for EnergyBuffer {
    fn receive(&mut self, amount: u64, simulate: bool) -> u64 {
        let amount = u32::try_from(amount).unwrap_or(u32::MAX);
        self.receive_energy(amount, simulate) as u64
    }

    fn stored(&self) -> u64 {
        self.stored as u64
    }

    fn capacity(&self) -> u64 {
        self.capacity as u64
    }
}

/// Adapter presenting a buffer through the 64-bit "power" interop flavour.
///
/// Offers above `i32::MAX` wrap modulo `i32::MAX` before reaching the buffer,
/// the way that interface's bridge always has.
#[derive(Debug)]
pub struct PowerAdapter<'a> {
    buffer: &'a mut EnergyBuffer,
}

impl<'a> PowerAdapter<'a> {
    pub fn new(buffer: &'a mut EnergyBuffer) -> Self {
        Self { buffer }
    }
}

impl EnergyReceiver for PowerAdapter<'_> {
    fn receive(&mut self, amount: u64, simulate: bool) -> u64 {
        let wrapped = (amount % i32::MAX as u64) as u32;
        self.buffer.receive_energy(wrapped, simulate) as u64
    }

    fn stored(&self) -> u64 {
        self.buffer.stored as u64
    }

    fn capacity(&self) -> u64 {
        self.buffer.capacity as u64
    }
}

// ---------------------------------------------------------------------------
// Capability table
// ---------------------------------------------------------------------------

/// Keys a neighbour can query a device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityKey {
    /// Sided item access. Always available.
    Items,
    /// The host's native energy interface.
    ForgeEnergy,
    /// 64-bit power interop, consumer side.
    TeslaConsumer,
    /// 64-bit power interop, holder side.
    TeslaHolder,
    /// Flux interop receiver.
    RedstoneFlux,
}

impl CapabilityKey {
    pub fn is_energy(self) -> bool {
        !matches!(self, CapabilityKey::Items)
    }
}

/// Energy capability keys whose companion systems are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    registered: BTreeSet<CapabilityKey>,
}

impl Default for CapabilityTable {
    /// Only the native energy interface.
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(CapabilityKey::ForgeEnergy);
        table
    }
}

impl CapabilityTable {
    pub fn empty() -> Self {
        Self {
            registered: BTreeSet::new(),
        }
    }

    pub fn register(&mut self, key: CapabilityKey) {
        self.registered.insert(key);
    }

    pub fn is_registered(&self, key: CapabilityKey) -> bool {
        key == CapabilityKey::Items || self.registered.contains(&key)
    }
}
