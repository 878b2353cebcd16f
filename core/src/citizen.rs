//! Citizens: identity, role, preempt lock, needs and progression ledgers.

use crate::{
    arena::Keyed,
    task_broker::TaskType,
    types::{EntityId, WorldSec},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative XP needed to reach levels 2..=10.
pub const XP_THRESHOLDS: [u32; 9] = [100, 250, 450, 700, 1000, 1350, 1750, 2200, 2700];

pub const MAX_LEVEL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Builder,
    Farmer,
    Gatherer,
    Hauler,
    Guard,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Builder,
        Role::Farmer,
        Role::Gatherer,
        Role::Hauler,
        Role::Guard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Builder  => "BUILDER",
            Role::Farmer   => "FARMER",
            Role::Gatherer => "GATHERER",
            Role::Hauler   => "HAULER",
            Role::Guard    => "GUARD",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        let wanted = raw.trim().to_ascii_uppercase();
        Role::ALL.into_iter().find(|role| role.as_str() == wanted)
    }
}

pub const NEED_MAX: f64 = 100.0;

/// Food, rest and safety, each held in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNeeds")]
pub struct CitizenNeeds {
    food:   f64,
    rest:   f64,
    safety: f64,
}

#[derive(Deserialize)]
struct RawNeeds {
    food:   f64,
    rest:   f64,
    safety: f64,
}

impl From<RawNeeds> for CitizenNeeds {
    fn from(raw: RawNeeds) -> Self {
        CitizenNeeds::new(raw.food, raw.rest, raw.safety)
    }
}

impl Default for CitizenNeeds {
    /// Fully satisfied.
    fn default() -> Self {
        Self { food: NEED_MAX, rest: NEED_MAX, safety: NEED_MAX }
    }
}

fn clamp_need(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, NEED_MAX)
}

impl CitizenNeeds {
    pub fn new(food: f64, rest: f64, safety: f64) -> Self {
        Self { food: clamp_need(food), rest: clamp_need(rest), safety: clamp_need(safety) }
    }

    pub fn food(&self) -> f64 {
        self.food
    }

    pub fn rest(&self) -> f64 {
        self.rest
    }

    pub fn safety(&self) -> f64 {
        self.safety
    }

    pub fn set_food(&mut self, value: f64) {
        self.food = clamp_need(value);
    }

    pub fn set_rest(&mut self, value: f64) {
        self.rest = clamp_need(value);
    }

    pub fn set_safety(&mut self, value: f64) {
        self.safety = clamp_need(value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenState {
    pub id:   EntityId,
    pub role: Role,
    /// World-time deadline. Until it passes, this citizen's running task
    /// cannot be taken away by a preemption.
    #[serde(default)]
    pub preempt_lock_until_sec: WorldSec,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub xp: BTreeMap<Role, u32>,
    #[serde(default)]
    pub needs: CitizenNeeds,
}

impl Keyed for CitizenState {
    fn key(&self) -> &str {
        &self.id
    }
}

impl CitizenState {
    pub fn new(id: impl Into<EntityId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            preempt_lock_until_sec: 0,
            points: 0,
            xp: BTreeMap::new(),
            needs: CitizenNeeds::default(),
        }
    }

    pub fn is_locked(&self, now: WorldSec) -> bool {
        now < self.preempt_lock_until_sec
    }

    /// Add (or with a negative delta, remove) points. Returns the new balance.
    pub fn award_points(&mut self, delta: i64) -> i64 {
        self.points = self.points.saturating_add(delta);
        self.points
    }

    pub fn xp_for(&self, role: Role) -> u32 {
        self.xp.get(&role).copied().unwrap_or(0)
    }

    /// Grant XP in `role`. Returns true when the grant crossed a level.
    pub fn grant_xp(&mut self, role: Role, amount: u32) -> bool {
        let before = self.level(role);
        let entry = self.xp.entry(role).or_insert(0);
        *entry = entry.saturating_add(amount);
        self.level(role) > before
    }

    pub fn level(&self, role: Role) -> u32 {
        level_for_xp(self.xp_for(role))
    }

    /// Work speed multiplier at this citizen's level in its own role.
    pub fn speed_bonus(&self) -> f64 {
        speed_bonus_for(self.role, self.level(self.role))
    }
}

/// 3% per level above 1, 2.5% for guards.
pub fn speed_bonus_for(role: Role, level: u32) -> f64 {
    let above_one = f64::from(level.clamp(1, MAX_LEVEL) - 1);
    match role {
        Role::Guard => 1.0 + above_one * 0.025,
        _ => 1.0 + above_one * 0.03,
    }
}

/// 2% extra guard damage per guard level above 1.
pub fn guard_damage_bonus_multiplier(level: u32) -> f64 {
    1.0 + f64::from(level.clamp(1, MAX_LEVEL) - 1) * 0.02
}

pub fn level_for_xp(xp: u32) -> u32 {
    let crossed = XP_THRESHOLDS.iter().filter(|&&t| xp >= t).count() as u32;
    (1 + crossed).min(MAX_LEVEL)
}

/// XP granted for finishing one task of the given type.
pub fn xp_for_task(task_type: TaskType) -> u32 {
    match task_type {
        TaskType::Build | TaskType::Repair       => 8,
        TaskType::Farm                           => 6,
        TaskType::Gather                         => 5,
        TaskType::Haul                           => 4,
        TaskType::Defend | TaskType::Emergency   => 10,
    }
}

/// XP for a single harvest swing.
pub const XP_PER_HARVEST: u32 = 5;
