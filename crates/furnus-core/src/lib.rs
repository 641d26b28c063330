//! Furnus Core -- simulation of fuel-driven item processing devices.
//!
//! A device (furnace or pulverizer) has a 13-slot inventory, burns fuel items
//! or stored energy to advance per-slot progress, is modified by upgrade
//! modules held in its own inventory, routes items through its six faces,
//! and pushes a compact progress record to whoever has its UI open.
//!
//! # Seven-Phase Tick Pipeline
//!
//! Each call to [`device::Device::tick`] advances one device by one tick:
//!
//! 1. **Export** -- Push output and fuel items through AUTO faces.
//! 2. **Import** -- Pull input and fuel items through AUTO faces.
//! 3. **Organize** -- Split or compact stacks across active input slots.
//! 4. **Clamp** -- Keep `0 <= fuel <= max_fuel`.
//! 5. **Indicator** -- Refresh the burning flag every 6 ticks.
//! 6. **Refuel** -- Burn a fuel item or draw energy when nearly empty.
//! 7. **Burn** -- Advance progress in every active slot and consume fuel.
//!
//! # Slot Layout
//!
//! | Slots  | Purpose                                   |
//! |--------|-------------------------------------------|
//! | 0..=2  | Inputs (active count set by SLOT upgrade) |
//! | 3..=5  | Outputs, paired with input `i - 3`        |
//! | 6, 7   | Burning fuel, staged fuel                 |
//! | 8..=12 | Upgrade modules                           |
//!
//! # Key Types
//!
//! - [`device::Device`] -- Per-device state and the tick pipeline.
//! - [`world::World`] -- Server-side host that ticks devices in placement
//!   order and ships progress over the sync channel.
//! - [`client::ClientWorld`] -- Presentation-side mirror fed by
//!   [`sync::SyncReceiver::drain_into`].
//! - [`registry::Registry`] -- Immutable item, fuel, recipe and settings
//!   tables (frozen at startup).
//! - [`routing::RoutingTable`] -- Per-channel, per-face routing modes.
//! - [`persist::DeviceRecord`] -- Structured device save with defaulting.

pub mod client;
pub mod device;
pub mod energy;
pub mod id;
pub mod item;
pub mod persist;
pub mod registry;
pub mod routing;
pub mod sync;
pub mod ui;
pub mod upgrade;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
