//! The persisted save document.
//!
//! RULE: SCHEMA_VERSION is bumped whenever a field changes meaning or a
//! required field is added. Loading never migrates between versions.
//! Optional additions carry `#[serde(default)]` and keep the version.

use crate::{
    arena::Arena,
    citizen::CitizenState,
    error::SimResult,
    hotspot_subsystem::HotspotState,
    state::{ColonyState, IdCounters, InsuranceState, PolicyId, PolicyWeights, RaidState, StockLedger},
    structure_subsystem::PlacedStructure,
    task_broker::ColonyTask,
    types::WorldSec,
    zone_subsystem::ZoneState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColonySave {
    pub schema_version: u32,
    pub world_time_sec: WorldSec,
    /// Wall-clock time of the save. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at:       Option<DateTime<Utc>>,
    pub colony:         ColonyEnvelope,
    pub citizens:       Vec<CitizenState>,
    pub hotspots:       Vec<HotspotState>,
    pub tasks:          Vec<ColonyTask>,
    pub raid:           RaidState,
    pub insurance:      InsuranceState,
    #[serde(default)]
    pub zones:          Vec<ZoneState>,
    #[serde(default)]
    pub structures:     Vec<PlacedStructure>,
}

/// Colony-wide scalars: stock, policy, cap, id counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColonyEnvelope {
    pub population_cap: u32,
    pub active_policy:  PolicyId,
    pub task_weights:   PolicyWeights,
    pub stock:          StockLedger,
    #[serde(default)]
    pub counters:       IdCounters,
}

impl ColonySave {
    pub fn from_state(state: &ColonyState) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            world_time_sec: state.world_time_sec,
            saved_at:       Some(Utc::now()),
            colony: ColonyEnvelope {
                population_cap: state.population_cap,
                active_policy:  state.active_policy,
                task_weights:   state.task_weights.clone(),
                stock:          state.stock.clone(),
                counters:       state.counters.clone(),
            },
            citizens:   state.citizens.as_slice().to_vec(),
            hotspots:   state.hotspots.as_slice().to_vec(),
            tasks:      state.tasks.as_slice().to_vec(),
            raid:       state.raid.clone(),
            insurance:  state.insurance.clone(),
            zones:      state.zones.as_slice().to_vec(),
            structures: state.structures.as_slice().to_vec(),
        }
    }

    /// Rebuild the aggregate. Fails on a repeated entity id. Id counters
    /// missing from or behind the document are raised past the ids in use.
    pub fn into_state(self) -> SimResult<ColonyState> {
        let mut state = ColonyState {
            world_time_sec: self.world_time_sec,
            citizens:       Arena::try_from(self.citizens)?,
            hotspots:       Arena::try_from(self.hotspots)?,
            tasks:          Arena::try_from(self.tasks)?,
            zones:          Arena::try_from(self.zones)?,
            structures:     Arena::try_from(self.structures)?,
            raid:           self.raid,
            insurance:      self.insurance,
            stock:          self.colony.stock,
            active_policy:  self.colony.active_policy,
            task_weights:   self.colony.task_weights,
            population_cap: self.colony.population_cap,
            counters:       self.colony.counters,
        };
        if state.repair_counters() {
            log::warn!("save counters were behind the ids in use; raised to {:?}", state.counters);
        }
        Ok(state)
    }
}
