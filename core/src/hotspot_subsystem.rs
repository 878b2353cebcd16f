//! Hotspots: finite resource nodes that deplete and regenerate.
//!
//! STATES:
//!   RESTORED   capacityNow == capacityMax, degradation == 1.0, no timers
//!   HARVESTING both cycle timers set, capacity being drawn down
//!
//! RULES:
//!   - cycle_started_at_sec and reset_at_sec are set together and
//!     cleared together.
//!   - Degradation only falls during a cycle. Only a reset raises it.
//!   - Harvesting an empty node yields 0, never an error.
//!   - Placement is gated by HOTSPOT zone containment.
//!   - Upgrading a RESTORED hotspot leaves it RESTORED at the new maximum.

use crate::{
    arena::Keyed,
    callbacks::ColonyCallbacks,
    citizen::Role,
    config::LimitsConfig,
    content::ContentCatalog,
    error::{SimError, SimResult},
    state::{ColonyState, Resource},
    subsystem::ColonySubsystem,
    types::{EntityId, WorldSec},
    zone_subsystem::{self, ZoneType},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_HOTSPOT_TIER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotspotFamily {
    Wood,
    Stone,
    Fiber,
    Ore,
    Crystal,
    Herbs,
}

impl HotspotFamily {
    pub const ALL: [HotspotFamily; 6] = [
        HotspotFamily::Wood,
        HotspotFamily::Stone,
        HotspotFamily::Fiber,
        HotspotFamily::Ore,
        HotspotFamily::Crystal,
        HotspotFamily::Herbs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HotspotFamily::Wood    => "WOOD",
            HotspotFamily::Stone   => "STONE",
            HotspotFamily::Fiber   => "FIBER",
            HotspotFamily::Ore     => "ORE",
            HotspotFamily::Crystal => "CRYSTAL",
            HotspotFamily::Herbs   => "HERBS",
        }
    }

    pub fn parse(raw: &str) -> Option<HotspotFamily> {
        let wanted = raw.trim().to_ascii_uppercase();
        HotspotFamily::ALL.into_iter().find(|f| f.as_str() == wanted)
    }

    /// The stock counter a harvest of this family feeds.
    pub fn resource(&self) -> Resource {
        match self {
            HotspotFamily::Wood    => Resource::Wood,
            HotspotFamily::Stone   => Resource::Stone,
            HotspotFamily::Fiber   => Resource::Fiber,
            HotspotFamily::Ore     => Resource::Ore,
            HotspotFamily::Crystal => Resource::Crystal,
            HotspotFamily::Herbs   => Resource::Herbs,
        }
    }
}

/// Maps the remaining capacity ratio (1.0 full, 0.0 empty) to a
/// degradation factor in `[floor, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradationCurve {
    Linear { floor: f64 },
    Power { exponent: f64, floor: f64 },
}

impl DegradationCurve {
    pub fn degradation_at(&self, remaining_ratio: f64) -> f64 {
        let ratio = remaining_ratio.clamp(0.0, 1.0);
        let (shape, floor) = match *self {
            DegradationCurve::Linear { floor } => (ratio, floor),
            DegradationCurve::Power { exponent, floor } => (ratio.powf(exponent.max(0.0)), floor),
        };
        let floor = floor.clamp(0.0, 1.0);
        floor + (1.0 - floor) * shape
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotFamilyProfile {
    #[serde(rename = "id")]
    pub family:        HotspotFamily,
    /// Tier 1 capacity. Higher tiers scale it.
    pub base_capacity: u32,
    /// Tier 1 time from first harvest to automatic restore.
    pub regen_seconds: WorldSec,
    pub curve:         DegradationCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotTierProfile {
    pub tier:           u8,
    pub capacity_scale: f64,
    pub reset_scale:    f64,
    /// Bounds on the quality of what this tier yields.
    pub min_quality:    u8,
    pub max_quality:    u8,
    /// Paid from stock to reach this tier.
    pub upgrade_cost:   Vec<(Resource, u32)>,
}

pub fn builtin_family_profiles() -> Vec<HotspotFamilyProfile> {
    let linear = DegradationCurve::Linear { floor: 0.40 };
    HotspotFamily::ALL
        .into_iter()
        .map(|family| HotspotFamilyProfile {
            family,
            base_capacity: 120,
            regen_seconds: 600,
            curve: match family {
                HotspotFamily::Ore     => DegradationCurve::Power { exponent: 1.5, floor: 0.40 },
                HotspotFamily::Crystal => DegradationCurve::Power { exponent: 2.0, floor: 0.40 },
                _ => linear,
            },
        })
        .collect()
}

pub fn builtin_tier_profiles() -> Vec<HotspotTierProfile> {
    vec![
        HotspotTierProfile {
            tier: 1,
            capacity_scale: 1.0,
            reset_scale: 1.0,
            min_quality: 1,
            max_quality: 2,
            upgrade_cost: Vec::new(),
        },
        HotspotTierProfile {
            tier: 2,
            capacity_scale: 1.5,
            reset_scale: 0.8,
            min_quality: 2,
            max_quality: 3,
            upgrade_cost: vec![(Resource::Wood, 30), (Resource::Stone, 20), (Resource::Fiber, 10)],
        },
        HotspotTierProfile {
            tier: 3,
            capacity_scale: 2.17,
            reset_scale: 0.6,
            min_quality: 3,
            max_quality: 5,
            upgrade_cost: vec![
                (Resource::Wood, 50),
                (Resource::Stone, 35),
                (Resource::Ore, 20),
                (Resource::Crystal, 10),
            ],
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotState {
    pub id:           EntityId,
    pub family:       HotspotFamily,
    pub tier:         u8,
    pub x:            f64,
    pub y:            f64,
    pub zone_id:      EntityId,
    pub capacity_max: u32,
    pub capacity_now: u32,
    /// 1.0 fully restored.
    pub degradation:  f64,
    pub cycle_started_at_sec: Option<WorldSec>,
    pub reset_at_sec:         Option<WorldSec>,
}

impl Keyed for HotspotState {
    fn key(&self) -> &str {
        &self.id
    }
}

impl HotspotState {
    pub fn is_restored(&self) -> bool {
        self.cycle_started_at_sec.is_none() && self.reset_at_sec.is_none()
    }

    fn start_cycle(&mut self, now: WorldSec, reset_at: WorldSec) {
        self.cycle_started_at_sec = Some(now);
        self.reset_at_sec = Some(reset_at);
    }

    fn restore(&mut self) {
        self.capacity_now = self.capacity_max;
        self.degradation = 1.0;
        self.cycle_started_at_sec = None;
        self.reset_at_sec = None;
    }

    fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestResult {
    pub quantity: u32,
    pub quality:  u8,
}

/// The tier's minimum quality plus one step per four gatherer levels
/// above 1, kept within the tier's bounds.
pub fn harvest_quality(gather_level: u32, min_quality: u8, max_quality: u8) -> u8 {
    let steps = (gather_level.max(1) - 1) / 4;
    let quality = u32::from(min_quality).saturating_add(steps);
    quality.clamp(u32::from(min_quality), u32::from(max_quality.max(min_quality))) as u8
}

pub struct HotspotSubsystem {
    families:         BTreeMap<HotspotFamily, HotspotFamilyProfile>,
    tiers:            Vec<HotspotTierProfile>,
    max_per_family:   u32,
    per_zone_cap:     u32,
    spacing:          f64,
}

impl HotspotSubsystem {
    pub fn new(catalog: &ContentCatalog, limits: &LimitsConfig) -> Self {
        Self {
            families:       catalog.hotspot_families.clone(),
            tiers:          catalog.hotspot_tiers.clone(),
            max_per_family: limits.max_hotspots_per_family,
            per_zone_cap:   limits.hotspot_per_zone_cap,
            spacing:        limits.hotspot_spacing,
        }
    }

    fn profile(&self, family: HotspotFamily) -> SimResult<&HotspotFamilyProfile> {
        self.families
            .get(&family)
            .ok_or_else(|| SimError::not_found("hotspot family profile", family.as_str()))
    }

    fn tier(&self, tier: u8) -> SimResult<&HotspotTierProfile> {
        self.tiers
            .iter()
            .find(|t| t.tier == tier)
            .ok_or_else(|| SimError::not_found("hotspot tier profile", tier.to_string()))
    }

    pub fn capacity_for(&self, family: HotspotFamily, tier: u8) -> SimResult<u32> {
        let base = f64::from(self.profile(family)?.base_capacity);
        let scaled = (base * self.tier(tier)?.capacity_scale).round();
        Ok((scaled as u32).max(1))
    }

    pub fn reset_seconds_for(&self, family: HotspotFamily, tier: u8) -> SimResult<WorldSec> {
        let regen = self.profile(family)?.regen_seconds as f64;
        Ok((regen * self.tier(tier)?.reset_scale).round() as WorldSec)
    }

    /// Create a RESTORED tier 1 hotspot at (x, y).
    /// Fails with a placement error and no mutation when the point is
    /// outside every HOTSPOT zone or a cap or spacing rule is violated.
    pub fn place_hotspot(
        &self,
        state: &mut ColonyState,
        family: HotspotFamily,
        x: f64,
        y: f64,
        _callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<HotspotState> {
        let zone_id = zone_subsystem::zone_at(state, ZoneType::Hotspot, x, y)
            .map(|z| z.id.clone())
            .ok_or_else(|| SimError::placement("Hotspot placement requires a HOTSPOT zone"))?;

        let same_family = state.hotspots.iter().filter(|h| h.family == family).count() as u32;
        if same_family >= self.max_per_family {
            return Err(SimError::placement(format!("Family cap reached for {}", family.as_str())));
        }
        let in_zone = state.hotspots.iter().filter(|h| h.zone_id == zone_id).count() as u32;
        if in_zone >= self.per_zone_cap {
            return Err(SimError::placement(format!(
                "Per-zone hotspot cap reached for zone {zone_id}"
            )));
        }
        if let Some(near) = state.hotspots.iter().find(|h| h.distance_to(x, y) < self.spacing) {
            return Err(SimError::placement(format!(
                "Hotspot too close to existing site: {}",
                near.id
            )));
        }

        let capacity = self.capacity_for(family, 1)?;
        let hotspot = HotspotState {
            id: state.counters.next_hotspot(),
            family,
            tier: 1,
            x,
            y,
            zone_id,
            capacity_max: capacity,
            capacity_now: capacity,
            degradation: 1.0,
            cycle_started_at_sec: None,
            reset_at_sec: None,
        };
        log::info!(
            "t={} hotspot placed id={} family={} zone={} capacity={capacity}",
            state.world_time_sec, hotspot.id, family.as_str(), hotspot.zone_id,
        );
        state.hotspots.insert(hotspot.clone())?;
        Ok(hotspot)
    }

    /// Draw up to `amount_requested` from a hotspot into colony stock.
    pub fn harvest(
        &self,
        state: &mut ColonyState,
        hotspot_id: &str,
        citizen_id: &str,
        amount_requested: u32,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<HarvestResult> {
        let gather_level = state
            .citizens
            .get(citizen_id)
            .ok_or_else(|| SimError::not_found("citizen", citizen_id))?
            .level(Role::Gatherer);
        let now = state.world_time_sec;
        let hotspot = state
            .hotspots
            .get_mut(hotspot_id)
            .ok_or_else(|| SimError::not_found("hotspot", hotspot_id))?;
        let profile = self.profile(hotspot.family)?;
        let tier = self.tier(hotspot.tier)?;
        let quality = harvest_quality(gather_level, tier.min_quality, tier.max_quality);

        if hotspot.cycle_started_at_sec.is_none() {
            let reset_at = now + self.reset_seconds_for(hotspot.family, hotspot.tier)?;
            hotspot.start_cycle(now, reset_at);
            log::debug!("t={now} hotspot={hotspot_id} cycle started, resets at t={reset_at}");
            callbacks.on_hotspot_cycle_started(hotspot_id, reset_at);
        }

        let quantity = amount_requested.min(hotspot.capacity_now);
        hotspot.capacity_now -= quantity;
        if hotspot.capacity_max > 0 {
            let ratio = f64::from(hotspot.capacity_now) / f64::from(hotspot.capacity_max);
            hotspot.degradation = hotspot.degradation.min(profile.curve.degradation_at(ratio));
        }
        let resource = hotspot.family.resource();
        state.stock.add(resource, quantity);

        log::debug!(
            "t={now} citizen={citizen_id} harvested {quantity} {} q{quality} from hotspot={hotspot_id}",
            resource.item_id(),
        );
        callbacks.on_hotspot_harvested(hotspot_id, citizen_id, quantity);
        Ok(HarvestResult { quantity, quality })
    }

    /// Restore every hotspot whose reset time has come. Idempotent.
    pub fn tick(&self, state: &mut ColonyState, callbacks: &mut dyn ColonyCallbacks) {
        let now = state.world_time_sec;
        for hotspot in state.hotspots.iter_mut() {
            if hotspot.reset_at_sec.is_some_and(|at| at <= now) {
                hotspot.restore();
                log::debug!("t={now} hotspot={} reset", hotspot.id);
                callbacks.on_hotspot_reset(&hotspot.id);
            }
        }
    }

    /// Raise a hotspot one tier, paying the tier's cost from stock.
    pub fn upgrade_hotspot(
        &self,
        state: &mut ColonyState,
        hotspot_id: &str,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<HotspotState> {
        let hotspot = state
            .hotspots
            .get(hotspot_id)
            .ok_or_else(|| SimError::not_found("hotspot", hotspot_id))?;
        if hotspot.tier >= MAX_HOTSPOT_TIER {
            return Err(SimError::rejected("Hotspot already at max tier"));
        }
        let from_tier = hotspot.tier;
        let to_tier = from_tier + 1;
        let new_max = self.capacity_for(hotspot.family, to_tier)?;
        let cost = self.tier(to_tier)?.upgrade_cost.clone();

        state.stock.consume(&cost)?;

        let hotspot = state
            .hotspots
            .get_mut(hotspot_id)
            .ok_or_else(|| SimError::not_found("hotspot", hotspot_id))?;
        hotspot.tier = to_tier;
        hotspot.capacity_max = new_max;
        if hotspot.is_restored() {
            hotspot.capacity_now = new_max;
        } else {
            hotspot.capacity_now = new_max.min(hotspot.capacity_now + new_max / 5);
        }
        let upgraded = hotspot.clone();

        log::info!(
            "t={} hotspot={hotspot_id} upgraded tier {from_tier} -> {to_tier}",
            state.world_time_sec,
        );
        callbacks.on_hotspot_upgraded(hotspot_id, from_tier, to_tier);
        Ok(upgraded)
    }

    pub fn remove_hotspot(state: &mut ColonyState, hotspot_id: &str) -> SimResult<HotspotState> {
        state
            .hotspots
            .remove(hotspot_id)
            .ok_or_else(|| SimError::not_found("hotspot", hotspot_id))
    }
}

impl ColonySubsystem for HotspotSubsystem {
    fn name(&self) -> &'static str {
        "hotspots"
    }

    fn update(
        &self,
        state: &mut ColonyState,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<()> {
        self.tick(state, callbacks);
        Ok(())
    }
}

/// Hotspots above tier 1.
pub fn upgraded_count(state: &ColonyState) -> u32 {
    state.hotspots.iter().filter(|h| h.tier > 1).count() as u32
}
