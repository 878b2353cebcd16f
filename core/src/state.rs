//! The colony aggregate and its ledgers.
//!
//! RULE: ColonyState owns every entity collection. Relations between
//! entities are ids resolved against these arenas, never references.
//! Only the systems in this crate mutate it, and only from the thread
//! that drives the tick loop.

use crate::{
    arena::Arena,
    citizen::CitizenState,
    error::{SimError, SimResult},
    hotspot_subsystem::HotspotState,
    recipe_matcher::{ItemKey, ItemStack},
    structure_subsystem::PlacedStructure,
    task_broker::{ColonyTask, TaskType},
    types::WorldSec,
    zone_subsystem::ZoneState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Resources ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Stone,
    Fiber,
    Food,
    Hide,
    Crystal,
    Ore,
    Herbs,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Wood,
        Resource::Stone,
        Resource::Fiber,
        Resource::Food,
        Resource::Hide,
        Resource::Crystal,
        Resource::Ore,
        Resource::Herbs,
    ];

    /// The item id this resource is known by in recipes and blueprints.
    pub fn item_id(&self) -> &'static str {
        match self {
            Resource::Wood    => "wood",
            Resource::Stone   => "stone",
            Resource::Fiber   => "fiber",
            Resource::Food    => "food",
            Resource::Hide    => "hide",
            Resource::Crystal => "crystal",
            Resource::Ore     => "ore",
            Resource::Herbs   => "herbs",
        }
    }

    pub fn from_item_id(item_id: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|r| r.item_id() == item_id)
    }
}

/// Named resource counters. Every resource is always present, possibly 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLedger {
    counts: BTreeMap<Resource, u32>,
}

impl Default for StockLedger {
    fn default() -> Self {
        Self {
            counts: Resource::ALL.into_iter().map(|r| (r, 0)).collect(),
        }
    }
}

impl StockLedger {
    /// What a fresh colony starts with.
    pub fn starting() -> Self {
        let mut ledger = Self::default();
        ledger.add(Resource::Wood, 100);
        ledger.add(Resource::Stone, 70);
        ledger.add(Resource::Fiber, 30);
        ledger.add(Resource::Food, 40);
        ledger.add(Resource::Hide, 10);
        ledger
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.counts.get(&resource).copied().unwrap_or(0)
    }

    pub fn add(&mut self, resource: Resource, qty: u32) {
        let entry = self.counts.entry(resource).or_insert(0);
        *entry = entry.saturating_add(qty);
    }

    pub fn can_afford(&self, cost: &[(Resource, u32)]) -> bool {
        self.shortfall(cost).is_none()
    }

    /// Take every line of `cost`, or nothing at all. Lines naming the same
    /// resource are summed before the check.
    pub fn consume(&mut self, cost: &[(Resource, u32)]) -> SimResult<()> {
        if let Some((r, need)) = self.shortfall(cost) {
            return Err(SimError::rejected(format!(
                "Insufficient stock: need {need} {}, have {}",
                r.item_id(),
                self.get(r)
            )));
        }
        for (r, need) in totals(cost) {
            let have = u64::from(self.get(r));
            let left = have
                .checked_sub(need)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    SimError::rejected(format!(
                        "Insufficient stock: need {need} {}, have {have}",
                        r.item_id()
                    ))
                })?;
            self.counts.insert(r, left);
        }
        Ok(())
    }

    /// The first resource whose summed demand exceeds the stock.
    fn shortfall(&self, cost: &[(Resource, u32)]) -> Option<(Resource, u64)> {
        totals(cost)
            .into_iter()
            .find(|&(r, need)| need > u64::from(self.get(r)))
    }

    /// The ledger as offered item stacks (raw stock is tier 1, quality 1).
    pub fn as_item_stacks(&self) -> Vec<ItemStack> {
        self.counts
            .iter()
            .filter(|(_, &qty)| qty > 0)
            .map(|(r, &qty)| ItemStack {
                key: ItemKey::raw(r.item_id()),
                qty,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        self.counts.iter().map(|(&r, &qty)| (r, qty))
    }
}

/// Cost lines summed per resource.
fn totals(cost: &[(Resource, u32)]) -> BTreeMap<Resource, u64> {
    let mut totals = BTreeMap::new();
    for &(r, qty) in cost {
        *totals.entry(r).or_insert(0u64) += u64::from(qty);
    }
    totals
}

// ── Policies ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyId {
    Fortify,
    HarvestRush,
    Recovery,
}

impl PolicyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyId::Fortify     => "FORTIFY",
            PolicyId::HarvestRush => "HARVEST_RUSH",
            PolicyId::Recovery    => "RECOVERY",
        }
    }

    /// Accepts `Fortify`, `HarvestRush`, `harvest_rush`, `RECOVERY`, ...
    pub fn parse(raw: &str) -> Option<PolicyId> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FORTIFY" => Some(PolicyId::Fortify),
            "HARVESTRUSH" | "HARVEST_RUSH" => Some(PolicyId::HarvestRush),
            "RECOVERY" => Some(PolicyId::Recovery),
            _ => None,
        }
    }
}

/// Multipliers applied to task base priority, per task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyWeights {
    weights: BTreeMap<TaskType, f64>,
}

impl Default for PolicyWeights {
    /// Every weight 1.0.
    fn default() -> Self {
        Self {
            weights: TaskType::ALL.into_iter().map(|t| (t, 1.0)).collect(),
        }
    }
}

impl PolicyWeights {
    pub fn for_policy(policy: PolicyId) -> Self {
        use TaskType::*;
        let table: [(TaskType, f64); 7] = match policy {
            PolicyId::Fortify => [
                (Build, 0.8), (Farm, 0.9), (Gather, 0.8), (Haul, 1.0),
                (Defend, 1.5), (Repair, 1.5), (Emergency, 2.0),
            ],
            PolicyId::HarvestRush => [
                (Build, 0.9), (Farm, 1.5), (Gather, 1.5), (Haul, 1.4),
                (Defend, 0.8), (Repair, 0.8), (Emergency, 2.0),
            ],
            PolicyId::Recovery => [
                (Build, 0.9), (Farm, 1.4), (Gather, 1.1), (Haul, 1.3),
                (Defend, 0.8), (Repair, 1.2), (Emergency, 2.0),
            ],
        };
        let mut weights = Self::default();
        for (task_type, w) in table {
            weights.set(task_type, w);
        }
        weights
    }

    pub fn weight_for(&self, task_type: TaskType) -> f64 {
        self.weights.get(&task_type).copied().unwrap_or(1.0)
    }

    /// Negative weights clamp to 0.
    pub fn set(&mut self, task_type: TaskType, weight: f64) {
        self.weights.insert(task_type, weight.max(0.0));
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskType, f64)> + '_ {
        self.weights.iter().map(|(&t, &w)| (t, w))
    }
}

// ── Raid and insurance ledgers ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RaidState {
    /// 0 until the director schedules the first raid.
    pub next_raid_at_sec: WorldSec,
    pub threat_score:     u32,
    pub active_enemies:   u32,
    pub raids_survived:   u32,
    pub last_raid_at_sec: WorldSec,
    pub threat_at_last_raid: u32,
    /// Tier of the most recent raid, 0 before the first.
    pub tier:             u32,
}

pub const CLAIM_COST: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsuranceState {
    pub reserve_points: i64,
    /// Ids of citizens a claim was paid for, oldest first.
    pub claims: Vec<String>,
}

impl Default for InsuranceState {
    fn default() -> Self {
        Self { reserve_points: 100, claims: Vec::new() }
    }
}

impl InsuranceState {
    pub fn apply_claim(&mut self, citizen_id: &str) {
        self.reserve_points -= CLAIM_COST;
        self.claims.push(citizen_id.to_string());
    }
}

// ── Id counters ───────────────────────────────────

/// Monotonic counters behind `task-N`, `hotspot-N`, ... ids.
/// Persisted with the save so ids never repeat across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdCounters {
    pub task:      u64,
    pub hotspot:   u64,
    pub zone:      u64,
    pub structure: u64,
    pub citizen:   u64,
}

impl IdCounters {
    pub fn next_task(&mut self) -> (String, u64) {
        self.task += 1;
        (format!("task-{}", self.task), self.task)
    }

    pub fn next_hotspot(&mut self) -> String {
        self.hotspot += 1;
        format!("hotspot-{}", self.hotspot)
    }

    pub fn next_zone(&mut self) -> String {
        self.zone += 1;
        format!("zone-{}", self.zone)
    }

    pub fn next_structure(&mut self) -> String {
        self.structure += 1;
        format!("structure-{}", self.structure)
    }

    pub fn next_citizen(&mut self) -> String {
        self.citizen += 1;
        format!("citizen-{}", self.citizen)
    }
}

// ── Aggregate ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ColonyState {
    pub world_time_sec: WorldSec,
    pub citizens:       Arena<CitizenState>,
    pub hotspots:       Arena<HotspotState>,
    pub tasks:          Arena<ColonyTask>,
    pub zones:          Arena<ZoneState>,
    pub structures:     Arena<PlacedStructure>,
    pub raid:           RaidState,
    pub insurance:      InsuranceState,
    pub stock:          StockLedger,
    pub active_policy:  PolicyId,
    pub task_weights:   PolicyWeights,
    pub population_cap: u32,
    pub counters:       IdCounters,
}

impl Default for ColonyState {
    fn default() -> Self {
        Self::new()
    }
}

impl ColonyState {
    /// An empty colony: no entities, starting stock, RECOVERY policy.
    pub fn new() -> Self {
        Self {
            world_time_sec: 0,
            citizens:       Arena::new(),
            hotspots:       Arena::new(),
            tasks:          Arena::new(),
            zones:          Arena::new(),
            structures:     Arena::new(),
            raid:           RaidState::default(),
            insurance:      InsuranceState::default(),
            stock:          StockLedger::starting(),
            active_policy:  PolicyId::Recovery,
            task_weights:   PolicyWeights::for_policy(PolicyId::Recovery),
            population_cap: 2,
            counters:       IdCounters::default(),
        }
    }

    pub fn population(&self) -> u32 {
        self.citizens.len() as u32
    }

    /// Base priority scaled by the active weight for the task's type.
    pub fn effective_priority(&self, task: &ColonyTask) -> f64 {
        task.priority * self.task_weights.weight_for(task.task_type)
    }

    pub fn citizen_mut(&mut self, id: &str) -> SimResult<&mut CitizenState> {
        self.citizens
            .get_mut(id)
            .ok_or_else(|| SimError::not_found("citizen", id))
    }

    /// Raise every id counter to the highest `<prefix>-N` id in use, and
    /// the task counter to the highest creation sequence. Returns true
    /// when any counter moved.
    pub fn repair_counters(&mut self) -> bool {
        let before = self.counters.clone();
        let c = &mut self.counters;
        c.task = c
            .task
            .max(highest_suffix(self.tasks.iter().map(|t| t.id.as_str()), "task"))
            .max(self.tasks.iter().map(|t| t.created_seq).max().unwrap_or(0));
        c.hotspot = c.hotspot.max(highest_suffix(self.hotspots.iter().map(|h| h.id.as_str()), "hotspot"));
        c.zone = c.zone.max(highest_suffix(self.zones.iter().map(|z| z.id.as_str()), "zone"));
        c.structure = c
            .structure
            .max(highest_suffix(self.structures.iter().map(|s| s.id.as_str()), "structure"));
        c.citizen = c.citizen.max(highest_suffix(self.citizens.iter().map(|p| p.id.as_str()), "citizen"));
        self.counters != before
    }
}

/// Largest N among ids of the form `<prefix>-N`. Other ids are ignored.
fn highest_suffix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citizen::Role;

    #[test]
    fn consume_is_all_or_nothing() {
        let mut stock = StockLedger::starting();
        let err = stock
            .consume(&[(Resource::Wood, 10), (Resource::Crystal, 1)])
            .unwrap_err();
        assert!(matches!(err, SimError::Rejected(_)));
        assert_eq!(stock.get(Resource::Wood), 100);

        stock.consume(&[(Resource::Wood, 10), (Resource::Stone, 5)]).unwrap();
        assert_eq!(stock.get(Resource::Wood), 90);
        assert_eq!(stock.get(Resource::Stone), 65);
    }

    #[test]
    fn repeated_cost_lines_are_summed() {
        let mut stock = StockLedger::default();
        stock.add(Resource::Wood, 5);
        let cost = [(Resource::Wood, 5), (Resource::Wood, 5)];

        assert!(!stock.can_afford(&cost));
        let err = stock.consume(&cost).unwrap_err();
        assert!(matches!(err, SimError::Rejected(msg) if msg == "Insufficient stock: need 10 wood, have 5"));
        assert_eq!(stock.get(Resource::Wood), 5);

        stock.add(Resource::Wood, 5);
        stock.consume(&cost).unwrap();
        assert_eq!(stock.get(Resource::Wood), 0);
    }

    #[test]
    fn policy_weights_clamp_negative() {
        let mut w = PolicyWeights::default();
        w.set(TaskType::Haul, -3.0);
        assert_eq!(w.weight_for(TaskType::Haul), 0.0);
    }

    #[test]
    fn counters_are_raised_past_ids_in_use() {
        let mut state = ColonyState::new();
        state.citizens.insert(CitizenState::new("citizen-7", Role::Farmer)).unwrap();
        state.citizens.insert(CitizenState::new("citizen-4f1c2a", Role::Guard)).unwrap();
        state.counters.citizen = 2;

        assert!(state.repair_counters());
        assert_eq!(state.counters.citizen, 7);
        assert_eq!(state.counters.task, 0);
        assert!(!state.repair_counters());
    }

    #[test]
    fn policy_parse_accepts_camel_and_snake() {
        assert_eq!(PolicyId::parse("HarvestRush"), Some(PolicyId::HarvestRush));
        assert_eq!(PolicyId::parse("harvest_rush"), Some(PolicyId::HarvestRush));
        assert_eq!(PolicyId::parse("nope"), None);
    }
}
