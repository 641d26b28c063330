//! Serde data file structs for device content definitions.
//!
//! These structs define the on-disk format for items, recipes, and device
//! settings. They are deserialized from RON, JSON, or TOML data files and
//! then resolved into a [`Registry`](furnus_core::registry::Registry) by the
//! loader.

use furnus_core::device::DeviceKind;
use furnus_core::upgrade::Upgrade;
use serde::Deserialize;

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    /// Defaults to the slot limit.
    #[serde(default)]
    pub max_stack: Option<u32>,
    /// Fuel value. Zero or absent means the item is not a fuel.
    #[serde(default)]
    pub burn_time: u32,
    /// Name of the item left behind after burning.
    #[serde(default)]
    pub container: Option<String>,
    /// Marks the item as an upgrade module of this kind.
    #[serde(default)]
    pub upgrade: Option<Upgrade>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A single-input processing recipe in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub device: DeviceKind,
    pub input: String,
    pub output: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}
