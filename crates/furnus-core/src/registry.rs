use crate::device::DeviceKind;
use crate::id::ItemTypeId;
use crate::item::{ItemStack, SLOT_STACK_LIMIT};
use crate::upgrade::Upgrade;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemTypeDef {
    pub name: String,
    pub max_stack: u32,
    /// Fuel value when burned. Zero means "not a fuel".
    pub burn_time: u32,
    /// Item left behind after this one is burned (a lava bucket leaves a bucket).
    pub container: Option<ItemTypeId>,
    /// Set when this item is an upgrade module.
    pub upgrade: Option<Upgrade>,
}

impl ItemTypeDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_stack: SLOT_STACK_LIMIT,
            burn_time: 0,
            container: None,
            upgrade: None,
        }
    }
}

/// A single-input processing recipe for one device kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDef {
    pub kind: DeviceKind,
    pub input: ItemTypeId,
    pub output: ItemTypeId,
    pub output_count: u32,
}

/// Tunable upgrade behaviour shared by every device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Each SPEED upgrade divides the cycle length by `1 + n * speed_multiplier`.
    pub speed_multiplier: f64,
    /// Each SPEED upgrade raises fuel use by this factor.
    pub speed_fuel_multiplier: f64,
    /// Each EFFICIENCY upgrade divides fuel use by `1 + n * effi_fuel_multiplier`.
    pub effi_fuel_multiplier: f64,
    /// Upgrade kinds recognised by devices. Disabled kinds count as absent.
    pub enabled_upgrades: Vec<Upgrade>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            speed_multiplier: 0.5,
            speed_fuel_multiplier: 0.3,
            effi_fuel_multiplier: 0.25,
            enabled_upgrades: Upgrade::ALL.to_vec(),
        }
    }
}

impl DeviceSettings {
    pub fn is_enabled(&self, upgrade: Upgrade) -> bool {
        self.enabled_upgrades.contains(&upgrade)
    }
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    settings: DeviceSettings,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, def: ItemTypeDef) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.item_name_to_id.insert(def.name.clone(), id);
        self.items.push(def);
        id
    }

    /// Phase 1: Register a plain item with default properties.
    pub fn register_simple(&mut self, name: &str) -> ItemTypeId {
        self.register_item(ItemTypeDef::new(name))
    }

    /// Phase 1: Register a processing recipe for a device kind.
    pub fn register_recipe(
        &mut self,
        kind: DeviceKind,
        input: ItemTypeId,
        output: ItemTypeId,
        output_count: u32,
    ) {
        self.recipes.push(RecipeDef {
            kind,
            input,
            output,
            output_count,
        });
    }

    /// Phase 2: Mutate an existing item by name.
    pub fn mutate_item<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut ItemTypeDef),
    {
        let id = self
            .item_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.items[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Replace the device settings.
    pub fn set_settings(&mut self, settings: DeviceSettings) {
        self.settings = settings;
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let known = |id: ItemTypeId| (id.0 as usize) < self.items.len();

        for item in &self.items {
            if item.max_stack == 0 {
                return Err(RegistryError::ZeroStackSize(item.name.clone()));
            }
            if let Some(container) = item.container {
                if !known(container) {
                    return Err(RegistryError::InvalidItemRef(container));
                }
            }
        }

        let mut recipes = HashMap::new();
        for recipe in self.recipes {
            for id in [recipe.input, recipe.output] {
                if !known(id) {
                    return Err(RegistryError::InvalidItemRef(id));
                }
            }
            if recipe.output_count == 0 {
                return Err(RegistryError::EmptyRecipeOutput(recipe.input));
            }
            let key = (recipe.kind, recipe.input);
            if recipes.insert(key, recipe).is_some() {
                return Err(RegistryError::DuplicateRecipe(key.0, key.1));
            }
        }

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes,
            settings: self.settings,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: HashMap<(DeviceKind, ItemTypeId), RecipeDef>,
    settings: DeviceSettings,
}

impl Registry {
    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Maximum stack size of an item. Unknown items use the slot limit.
    pub fn max_stack(&self, id: ItemTypeId) -> u32 {
        self.get_item(id).map_or(SLOT_STACK_LIMIT, |i| i.max_stack)
    }

    /// How many of `id` a single slot may hold.
    pub fn slot_limit(&self, id: ItemTypeId) -> u32 {
        self.max_stack(id).min(SLOT_STACK_LIMIT)
    }

    pub fn burn_time(&self, stack: &ItemStack) -> u32 {
        self.get_item(stack.item).map_or(0, |i| i.burn_time)
    }

    pub fn is_fuel(&self, stack: &ItemStack) -> bool {
        self.burn_time(stack) > 0
    }

    /// The item left behind once `stack` has been burned.
    pub fn container_item(&self, stack: &ItemStack) -> Option<ItemStack> {
        self.get_item(stack.item)
            .and_then(|i| i.container)
            .map(|c| ItemStack::new(c, 1))
    }

    pub fn upgrade_kind(&self, stack: &ItemStack) -> Option<Upgrade> {
        self.get_item(stack.item).and_then(|i| i.upgrade)
    }

    /// The product one input item yields in a device of `kind`, if any.
    pub fn result(&self, kind: DeviceKind, input: &ItemStack) -> Option<ItemStack> {
        self.recipes
            .get(&(kind, input.item))
            .map(|r| ItemStack::new(r.output, r.output_count))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("item '{0}' has a max stack size of zero")]
    ZeroStackSize(String),
    #[error("recipe for {0:?} produces nothing")]
    EmptyRecipeOutput(ItemTypeId),
    #[error("duplicate {0:?} recipe for input {1:?}")]
    DuplicateRecipe(DeviceKind, ItemTypeId),
}
