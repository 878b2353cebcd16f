//! Typed axis-aligned zones.
//!
//! RULE: Zone containment is the only spatial check in the simulation.
//! Overlapping zones are allowed; whether overlaps make sense is a
//! content decision.

use crate::{
    arena::Keyed,
    error::{SimError, SimResult},
    state::ColonyState,
    types::EntityId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Home,
    Farm,
    Defense,
    Hotspot,
    Storage,
}

impl ZoneType {
    pub const ALL: [ZoneType; 5] = [
        ZoneType::Home,
        ZoneType::Farm,
        ZoneType::Defense,
        ZoneType::Hotspot,
        ZoneType::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Home    => "HOME",
            ZoneType::Farm    => "FARM",
            ZoneType::Defense => "DEFENSE",
            ZoneType::Hotspot => "HOTSPOT",
            ZoneType::Storage => "STORAGE",
        }
    }

    pub fn parse(raw: &str) -> Option<ZoneType> {
        let wanted = raw.trim().to_ascii_uppercase();
        ZoneType::ALL.into_iter().find(|t| t.as_str() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Keyed for ZoneState {
    fn key(&self) -> &str {
        &self.id
    }
}

impl ZoneState {
    /// Corners may be given in any order; bounds are stored min ≤ max.
    pub fn new(
        id: impl Into<EntityId>,
        zone_type: ZoneType,
        (x1, y1): (f64, f64),
        (x2, y2): (f64, f64),
    ) -> Self {
        Self {
            id: id.into(),
            zone_type,
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

pub fn create_zone(
    state: &mut ColonyState,
    zone_type: ZoneType,
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
) -> SimResult<ZoneState> {
    let id = state.counters.next_zone();
    let zone = ZoneState::new(id, zone_type, (x_min, y_min), (x_max, y_max));
    log::debug!(
        "t={} zone created id={} type={} [{},{}]..[{},{}]",
        state.world_time_sec, zone.id, zone.zone_type.as_str(),
        zone.x_min, zone.y_min, zone.x_max, zone.y_max,
    );
    state.zones.insert(zone.clone())?;
    Ok(zone)
}

/// True iff any zone of `zone_type` contains the point.
pub fn contains(state: &ColonyState, zone_type: ZoneType, x: f64, y: f64) -> bool {
    zone_at(state, zone_type, x, y).is_some()
}

/// The first zone (in creation order) of `zone_type` containing the point.
pub fn zone_at(state: &ColonyState, zone_type: ZoneType, x: f64, y: f64) -> Option<&ZoneState> {
    state
        .zones
        .iter()
        .find(|z| z.zone_type == zone_type && z.contains_point(x, y))
}

pub fn clear_zone(state: &mut ColonyState, zone_id: &str) -> SimResult<ZoneState> {
    state
        .zones
        .remove(zone_id)
        .ok_or_else(|| SimError::not_found("zone", zone_id))
}

/// Zones that count toward raid threat.
pub fn non_home_zone_count(state: &ColonyState) -> u32 {
    state
        .zones
        .iter()
        .filter(|z| z.zone_type != ZoneType::Home)
        .count() as u32
}
