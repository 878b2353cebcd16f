//! Blueprints, placed structures, population cap and unlock stages.

use crate::{
    arena::Keyed,
    callbacks::ColonyCallbacks,
    error::{SimError, SimResult},
    hotspot_subsystem,
    recipe_matcher::{self, ItemRequirement},
    state::{ColonyState, Resource},
    task_broker::{TaskBroker, TaskType},
    types::{EntityId, WorldSec},
};
use serde::{Deserialize, Serialize};

/// Base priority of the BUILD task queued for a new blueprint.
pub const BUILD_PRIORITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlueprintId {
    TownCore,
    House,
    Stockpile,
    Watchtower,
    FarmShed,
    Workshop,
    TrapPost,
    Infirmary,
}

impl BlueprintId {
    pub const ALL: [BlueprintId; 8] = [
        BlueprintId::TownCore,
        BlueprintId::House,
        BlueprintId::Stockpile,
        BlueprintId::Watchtower,
        BlueprintId::FarmShed,
        BlueprintId::Workshop,
        BlueprintId::TrapPost,
        BlueprintId::Infirmary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintId::TownCore   => "TOWN_CORE",
            BlueprintId::House      => "HOUSE",
            BlueprintId::Stockpile  => "STOCKPILE",
            BlueprintId::Watchtower => "WATCHTOWER",
            BlueprintId::FarmShed   => "FARM_SHED",
            BlueprintId::Workshop   => "WORKSHOP",
            BlueprintId::TrapPost   => "TRAP_POST",
            BlueprintId::Infirmary  => "INFIRMARY",
        }
    }

    /// Accepts `TownCore`, `town_core`, `TOWN-CORE`, ...
    pub fn parse(raw: &str) -> Option<BlueprintId> {
        let squash = |s: &str| {
            s.chars()
                .filter(|c| *c != '_' && *c != '-')
                .collect::<String>()
                .to_ascii_uppercase()
        };
        let wanted = squash(raw.trim());
        BlueprintId::ALL.into_iter().find(|b| squash(b.as_str()) == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnlockStage {
    Bootstrap,
    Stage1,
    Stage2,
    Stage3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintDefinition {
    pub id:            BlueprintId,
    pub stage:         UnlockStage,
    pub width:         u32,
    pub depth:         u32,
    /// 0 means the structure is complete on placement.
    pub build_seconds: WorldSec,
    pub cost:          Vec<ItemRequirement>,
    #[serde(default)]
    pub description:   String,
}

fn raw_cost(lines: &[(&str, u32)]) -> Vec<ItemRequirement> {
    lines
        .iter()
        .map(|&(item, qty)| ItemRequirement {
            item_id: item.to_string(),
            min_tier: 1,
            min_quality: 1,
            min_quantity: qty,
        })
        .collect()
}

pub fn builtin_blueprints() -> Vec<BlueprintDefinition> {
    use BlueprintId::*;
    use UnlockStage::*;
    let def = |id, stage, size: u32, build_seconds, cost: &[(&str, u32)], description: &str| {
        BlueprintDefinition {
            id,
            stage,
            width: size,
            depth: size,
            build_seconds,
            cost: raw_cost(cost),
            description: description.to_string(),
        }
    };
    vec![
        def(TownCore, Bootstrap, 9, 0, &[], "Colony anchor and rally point."),
        def(House, Stage1, 5, 90,
            &[("wood", 35), ("stone", 20), ("fiber", 10)], "Adds +2 housing cap."),
        def(Stockpile, Stage1, 7, 120,
            &[("wood", 45), ("stone", 30), ("fiber", 15)], "Adds storage and haul throughput."),
        def(Watchtower, Stage1, 5, 110,
            &[("wood", 30), ("stone", 40), ("fiber", 5)], "Adds defense rating and a guard post."),
        def(FarmShed, Stage1, 5, 95,
            &[("wood", 30), ("stone", 15), ("fiber", 20)], "Improves nearby farm task speed."),
        def(Workshop, Stage2, 7, 140,
            &[("wood", 60), ("stone", 45), ("ore", 20)], "Unlocks tiered processing recipes."),
        def(TrapPost, Stage2, 3, 70,
            &[("wood", 20), ("stone", 20), ("fiber", 10)], "Deploys reusable defensive traps."),
        def(Infirmary, Stage3, 5, 130,
            &[("wood", 50), ("stone", 35), ("herbs", 15)], "Speeds recovery of citizens."),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedStructure {
    pub id:               EntityId,
    pub blueprint_id:     BlueprintId,
    pub x:                f64,
    pub y:                f64,
    /// Degrees, always in 0..360.
    pub rotation:         u16,
    pub complete:         bool,
    pub started_at_sec:   WorldSec,
    pub completes_at_sec: WorldSec,
}

impl Keyed for PlacedStructure {
    fn key(&self) -> &str {
        &self.id
    }
}

impl PlacedStructure {
    pub fn new(
        id: impl Into<EntityId>,
        blueprint_id: BlueprintId,
        (x, y): (f64, f64),
        rotation: i32,
        started_at_sec: WorldSec,
        build_seconds: WorldSec,
    ) -> Self {
        Self {
            id: id.into(),
            blueprint_id,
            x,
            y,
            rotation: rotation.rem_euclid(360) as u16,
            complete: build_seconds == 0,
            started_at_sec,
            completes_at_sec: started_at_sec + build_seconds,
        }
    }
}

/// Pay for a blueprint and place it. Structures with a build time also
/// get a BUILD task; completing that task completes the structure.
pub fn place_blueprint(
    state: &mut ColonyState,
    definition: &BlueprintDefinition,
    x: f64,
    y: f64,
    rotation: i32,
    callbacks: &mut dyn ColonyCallbacks,
) -> SimResult<PlacedStructure> {
    if !recipe_matcher::accepts_all(&definition.cost, &state.stock.as_item_stacks()) {
        return Err(SimError::rejected(format!(
            "Missing stock for {}",
            definition.id.as_str()
        )));
    }
    let cost = definition
        .cost
        .iter()
        .map(|req| {
            Resource::from_item_id(&req.item_id)
                .map(|r| (r, req.min_quantity))
                .ok_or_else(|| SimError::rejected(format!("{} is not a stock item", req.item_id)))
        })
        .collect::<SimResult<Vec<_>>>()?;
    state.stock.consume(&cost)?;

    let structure = PlacedStructure::new(
        state.counters.next_structure(),
        definition.id,
        (x, y),
        rotation,
        state.world_time_sec,
        definition.build_seconds,
    );
    log::info!(
        "t={} blueprint {} placed id={} at ({x}, {y})",
        state.world_time_sec, definition.id.as_str(), structure.id,
    );
    state.structures.insert(structure.clone())?;

    if structure.complete {
        callbacks.on_structure_completed(&structure.id);
    } else {
        TaskBroker::create_task(
            state,
            TaskType::Build,
            structure.id.clone(),
            BUILD_PRIORITY,
            false,
            callbacks,
        )?;
    }
    Ok(structure)
}

pub fn complete_structure(
    state: &mut ColonyState,
    structure_id: &str,
    callbacks: &mut dyn ColonyCallbacks,
) -> SimResult<()> {
    let now = state.world_time_sec;
    let structure = state
        .structures
        .get_mut(structure_id)
        .ok_or_else(|| SimError::not_found("structure", structure_id))?;
    if structure.complete {
        return Ok(());
    }
    structure.complete = true;
    structure.completes_at_sec = now;
    log::info!("t={now} structure={structure_id} complete");
    callbacks.on_structure_completed(structure_id);
    Ok(())
}

pub fn count_completed(state: &ColonyState, blueprint: BlueprintId) -> u32 {
    state
        .structures
        .iter()
        .filter(|s| s.complete && s.blueprint_id == blueprint)
        .count() as u32
}

/// 2 + 2 per completed house, never above `max_citizens`.
pub fn refresh_population_cap(state: &mut ColonyState, max_citizens: u32) -> u32 {
    let houses = count_completed(state, BlueprintId::House);
    state.population_cap = (2 + houses * 2).min(max_citizens);
    state.population_cap
}

/// The furthest unlock stage the colony has reached.
pub fn current_stage(state: &ColonyState) -> UnlockStage {
    let population = state.population();
    let upgraded = hotspot_subsystem::upgraded_count(state);
    if population >= 5 && state.raid.raids_survived >= 3 && upgraded >= 4 {
        return UnlockStage::Stage3;
    }
    if population >= 3 && count_completed(state, BlueprintId::Watchtower) >= 1 && upgraded >= 2 {
        return UnlockStage::Stage2;
    }
    UnlockStage::Stage1
}
