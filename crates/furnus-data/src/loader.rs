//! Resolution pipeline: reads data files, resolves cross-references, builds registry.
//!
//! A data directory holds up to three files, each in RON, TOML, or JSON:
//!
//! - `items` (required): item types, fuel values, containers, upgrade kinds.
//! - `recipes` (optional): single-input recipes per device kind.
//! - `settings` (optional): upgrade multipliers and enabled upgrade kinds.
//!
//! In TOML the item and recipe lists live under `[[items]]` and
//! `[[recipes]]`; RON and JSON files hold the bare list. Names are resolved
//! to [`ItemTypeId`]s and the result is frozen into a [`Registry`].

use crate::schema::{ItemData, RecipeData};
use furnus_core::id::ItemTypeId;
use furnus_core::registry::{DeviceSettings, ItemTypeDef, Registry, RegistryBuilder, RegistryError};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The items file was not found in the given directory.
    #[error("required file '{file}' not found in {}", .dir.display())]
    MissingRequired { file: String, dir: PathBuf },

    /// The same data file exists in more than one format.
    #[error("conflicting formats: {} and {}", .a.display(), .b.display())]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {}: {detail}", .file.display())]
    Parse { file: PathBuf, detail: String },

    /// An item name that no entry in the items file defines.
    #[error("unresolved {expected_kind} reference '{name}' in {}", .file.display())]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {}", .file.display())]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved data was rejected by the registry builder.
    #[error("invalid data: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Data files
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const ALL: [(Format, &'static str); 3] =
        [(Format::Ron, "ron"), (Format::Toml, "toml"), (Format::Json, "json")];
}

/// One located data file.
#[derive(Debug)]
struct DataFile {
    path: PathBuf,
    format: Format,
}

impl DataFile {
    /// Find `{stem}.ron`, `{stem}.toml` or `{stem}.json` in `dir`. At most one
    /// may exist.
    fn locate(dir: &Path, stem: &str) -> Result<Option<Self>, DataLoadError> {
        let mut found: Option<Self> = None;
        for (format, ext) in Format::ALL {
            let path = dir.join(format!("{stem}.{ext}"));
            if !path.exists() {
                continue;
            }
            if let Some(first) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: first.path,
                    b: path,
                });
            }
            found = Some(Self { path, format });
        }
        Ok(found)
    }

    fn require(dir: &Path, stem: &str) -> Result<Self, DataLoadError> {
        Self::locate(dir, stem)?.ok_or_else(|| DataLoadError::MissingRequired {
            file: stem.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    /// Deserialize the whole document.
    fn parse<T: DeserializeOwned>(&self) -> Result<T, DataLoadError> {
        let text = std::fs::read_to_string(&self.path)?;
        match self.format {
            Format::Ron => ron::from_str(&text).map_err(|e| self.parse_error(e)),
            Format::Json => serde_json::from_str(&text).map_err(|e| self.parse_error(e)),
            Format::Toml => toml::from_str(&text).map_err(|e| self.parse_error(e)),
        }
    }

    /// Deserialize a list. TOML has no top-level arrays, so there the list is
    /// read from the array of tables named `key`.
    fn parse_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, DataLoadError> {
        if self.format != Format::Toml {
            return self.parse();
        }
        let mut table: toml::Table = self.parse()?;
        let list = table
            .remove(key)
            .ok_or_else(|| self.parse_error(format_args!("missing [[{key}]] array")))?;
        list.try_into()
            .map_err(|e: toml::de::Error| self.parse_error(e))
    }

    fn parse_error(&self, detail: impl Display) -> DataLoadError {
        DataLoadError::Parse {
            file: self.path.clone(),
            detail: detail.to_string(),
        }
    }
}

/// Item names from the items file, mapped to their registered ids.
#[derive(Debug, Default)]
struct ItemNames(HashMap<String, ItemTypeId>);

impl ItemNames {
    fn insert(&mut self, name: &str, id: ItemTypeId, file: &DataFile) -> Result<(), DataLoadError> {
        if self.0.insert(name.to_string(), id).is_some() {
            return Err(DataLoadError::DuplicateName {
                file: file.path.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn resolve(&self, name: &str, file: &DataFile) -> Result<ItemTypeId, DataLoadError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| DataLoadError::UnresolvedRef {
                file: file.path.clone(),
                name: name.to_string(),
                expected_kind: "item",
            })
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Load every data file in `dir` and build the registry.
pub fn load_registry(dir: &Path) -> Result<Registry, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    let items_file = DataFile::require(dir, "items")?;
    let items: Vec<ItemData> = items_file.parse_list("items")?;
    let names = register_items(&mut builder, &items, &items_file)?;

    if let Some(file) = DataFile::locate(dir, "recipes")? {
        let recipes: Vec<RecipeData> = file.parse_list("recipes")?;
        register_recipes(&mut builder, &recipes, &names, &file)?;
        debug!("{} recipes from {}", recipes.len(), file.path.display());
    }

    if let Some(file) = DataFile::locate(dir, "settings")? {
        let settings: DeviceSettings = file.parse()?;
        builder.set_settings(settings);
    }

    let registry = builder.build()?;
    info!(
        "loaded {} items and {} recipes from {}",
        registry.item_count(),
        registry.recipe_count(),
        dir.display()
    );
    Ok(registry)
}

/// Register items in file order, then resolve container references, which
/// may point forwards.
fn register_items(
    builder: &mut RegistryBuilder,
    items: &[ItemData],
    file: &DataFile,
) -> Result<ItemNames, DataLoadError> {
    let mut names = ItemNames::default();
    for item in items {
        let mut def = ItemTypeDef::new(&item.name);
        if let Some(max_stack) = item.max_stack {
            def.max_stack = max_stack;
        }
        def.burn_time = item.burn_time;
        def.upgrade = item.upgrade;
        names.insert(&item.name, builder.register_item(def), file)?;
    }

    for item in items {
        let Some(container) = &item.container else {
            continue;
        };
        let id = names.resolve(container, file)?;
        builder.mutate_item(&item.name, |def| def.container = Some(id))?;
    }
    Ok(names)
}

fn register_recipes(
    builder: &mut RegistryBuilder,
    recipes: &[RecipeData],
    names: &ItemNames,
    file: &DataFile,
) -> Result<(), DataLoadError> {
    for recipe in recipes {
        let input = names.resolve(&recipe.input, file)?;
        let output = names.resolve(&recipe.output, file)?;
        builder.register_recipe(recipe.device, input, output, recipe.count);
    }
    Ok(())
}
