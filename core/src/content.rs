//! Content packs: duplicate-id validation and the definition catalog.
//!
//! RULE: A pack is validated in full before any of it is loaded. A
//! duplicate id anywhere aborts startup; the simulation never sees a
//! catalog that failed validation and never re-checks uniqueness itself.

use crate::{
    error::{SimError, SimResult},
    hotspot_subsystem::{
        builtin_family_profiles, builtin_tier_profiles, HotspotFamily, HotspotFamilyProfile,
        HotspotTierProfile,
    },
    recipe_matcher::{ItemRequirement, RecipeDefinition},
    structure_subsystem::{builtin_blueprints, BlueprintDefinition, BlueprintId},
};
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

/// Category directories checked for duplicate ids, in order.
pub const CATEGORIES: [&str; 6] = [
    "hotspots",
    "recipes",
    "events",
    "raid_factions",
    "policies",
    "blueprints",
];

pub struct ContentPackValidator;

impl ContentPackValidator {
    /// Fail on the first id that appears twice within one category.
    /// Missing category directories are skipped.
    pub fn validate_no_duplicate_ids(base_dir: &Path) -> SimResult<()> {
        for category in CATEGORIES {
            let dir = base_dir.join(category);
            if !dir.is_dir() {
                continue;
            }
            let mut seen: HashMap<String, PathBuf> = HashMap::new();
            for file in json_files(&dir)? {
                for id in ids_in(&file)? {
                    if let Some(first) = seen.get(&id) {
                        return Err(SimError::DuplicateDefinition {
                            category: category.to_string(),
                            id,
                            first: first.clone(),
                            duplicate: file.clone(),
                        });
                    }
                    seen.insert(id, file.clone());
                }
            }
            log::debug!("content category {category}: {} ids", seen.len());
        }
        Ok(())
    }
}

/// Every `.json` file under `dir`, recursively, in path order.
fn json_files(dir: &Path) -> SimResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn read_json(file: &Path) -> SimResult<Value> {
    let raw = fs::read_to_string(file)?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("Failed parsing content file {}: {e}", file.display()).into())
}

/// Ids declared by a file holding one object or an array of objects.
/// Entries without a non-blank string `id` are ignored.
fn ids_in(file: &Path) -> SimResult<Vec<String>> {
    let value = read_json(file)?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_str))
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Typed definitions from every file of a category directory.
fn definitions<T: DeserializeOwned>(dir: &Path) -> SimResult<Vec<T>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut defs = Vec::new();
    for file in json_files(dir)? {
        let items = match read_json(&file)? {
            Value::Array(items) => items,
            other => vec![other],
        };
        for item in items {
            let def = serde_json::from_value(item)
                .map_err(|e| anyhow!("Invalid definition in {}: {e}", file.display()))?;
            defs.push(def);
        }
    }
    Ok(defs)
}

/// Static definitions the simulation runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentCatalog {
    pub hotspot_families: BTreeMap<HotspotFamily, HotspotFamilyProfile>,
    pub hotspot_tiers:    Vec<HotspotTierProfile>,
    pub blueprints:       BTreeMap<BlueprintId, BlueprintDefinition>,
    pub recipes:          BTreeMap<String, RecipeDefinition>,
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ContentCatalog {
    /// The definitions shipped with the game.
    pub fn builtin() -> Self {
        Self {
            hotspot_families: builtin_family_profiles()
                .into_iter()
                .map(|p| (p.family, p))
                .collect(),
            hotspot_tiers: builtin_tier_profiles(),
            blueprints: builtin_blueprints().into_iter().map(|b| (b.id, b)).collect(),
            recipes: builtin_recipes().into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Validate a pack, then overlay its definitions on the builtin ones.
    pub fn load(base_dir: &Path) -> SimResult<Self> {
        ContentPackValidator::validate_no_duplicate_ids(base_dir)?;
        let mut catalog = Self::builtin();

        for profile in definitions::<HotspotFamilyProfile>(&base_dir.join("hotspots"))? {
            catalog.hotspot_families.insert(profile.family, profile);
        }
        for blueprint in definitions::<BlueprintDefinition>(&base_dir.join("blueprints"))? {
            blueprint.cost.iter().try_for_each(ItemRequirement::validate)?;
            catalog.blueprints.insert(blueprint.id, blueprint);
        }
        for recipe in definitions::<RecipeDefinition>(&base_dir.join("recipes"))? {
            recipe.validate()?;
            catalog.recipes.insert(recipe.id.clone(), recipe);
        }

        log::info!(
            "content loaded from {}: {} hotspot families, {} blueprints, {} recipes",
            base_dir.display(),
            catalog.hotspot_families.len(),
            catalog.blueprints.len(),
            catalog.recipes.len(),
        );
        Ok(catalog)
    }

    pub fn blueprint(&self, id: BlueprintId) -> SimResult<&BlueprintDefinition> {
        self.blueprints
            .get(&id)
            .ok_or_else(|| SimError::not_found("blueprint", id.as_str()))
    }

    pub fn recipe(&self, id: &str) -> SimResult<&RecipeDefinition> {
        self.recipes
            .get(id)
            .ok_or_else(|| SimError::not_found("recipe", id))
    }
}

fn builtin_recipes() -> Vec<RecipeDefinition> {
    let raw = |item: &str, qty: u32| ItemRequirement {
        item_id: item.to_string(),
        min_tier: 1,
        min_quality: 1,
        min_quantity: qty,
    };
    vec![
        RecipeDefinition {
            id: "rope".into(),
            inputs: vec![raw("fiber", 3)],
            output_item: "rope".into(),
            output_qty: 1,
        },
        RecipeDefinition {
            id: "stone_brick".into(),
            inputs: vec![raw("stone", 4)],
            output_item: "stone_brick".into(),
            output_qty: 2,
        },
        RecipeDefinition {
            id: "reinforced_beam".into(),
            inputs: vec![raw("wood", 6), raw("ore", 2)],
            output_item: "reinforced_beam".into(),
            output_qty: 1,
        },
    ]
}
