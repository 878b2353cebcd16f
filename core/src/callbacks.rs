//! Notification hooks the simulation calls out to.
//!
//! RULE: The core consumes this capability but never depends on what an
//! implementation does. Every hook defaults to a no-op, so a host only
//! overrides the notifications it cares about.

use crate::{
    event::SimEvent,
    types::{EntityId, Tick, WorldSec},
};

/// Where the clock stands when a tick hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    /// The tick being run. While paused, the last completed tick.
    pub tick:           Tick,
    pub world_time_sec: WorldSec,
    pub paused:         bool,
}

#[allow(unused_variables)]
pub trait ColonyCallbacks {
    // ── Tick boundaries ───────────────────────────
    /// Called by the engine directly, paused or not. Never recorded.
    fn on_pre_tick(&mut self, context: &TickContext) {}
    fn on_post_tick(&mut self, context: &TickContext) {}

    // ── Hotspots ──────────────────────────────────
    fn on_hotspot_cycle_started(&mut self, hotspot_id: &str, reset_at_sec: WorldSec) {}
    fn on_hotspot_harvested(&mut self, hotspot_id: &str, citizen_id: &str, quantity: u32) {}
    fn on_hotspot_reset(&mut self, hotspot_id: &str) {}
    fn on_hotspot_upgraded(&mut self, hotspot_id: &str, from_tier: u8, to_tier: u8) {}

    // ── Tasks ─────────────────────────────────────
    fn on_task_created(&mut self, task_id: &str) {}
    fn on_task_assigned(&mut self, task_id: &str, citizen_id: &str) {}
    fn on_task_preempted(&mut self, task_id: &str, from_citizen_id: &str, reason: &str) {}
    fn on_task_completed(&mut self, task_id: &str, citizen_id: &str) {}
    fn on_task_quarantined(&mut self, task_id: &str, until_sec: WorldSec) {}

    // ── Raids, citizens, insurance ────────────────
    fn on_raid_scheduled(&mut self, raid_id: &str, eta_sec: WorldSec) {}
    fn on_raid_started(&mut self, raid_id: &str) {}
    fn on_raid_ended(&mut self, raid_id: &str, success: bool) {}
    fn on_crisis_started(&mut self, crisis_id: &str) {}
    fn on_crisis_ended(&mut self, crisis_id: &str) {}
    fn on_citizen_death(&mut self, citizen_id: &str, cause: &str) {}
    fn on_insurance_claim_paid(&mut self, claim_id: &str, citizen_id: &str) {}
    fn on_replacement_spawned(&mut self, claim_id: &str, new_citizen_id: &str) {}

    // ── Colony ────────────────────────────────────
    fn on_structure_completed(&mut self, structure_id: &str) {}
    fn on_policy_changed(&mut self, policy_id: &str) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl ColonyCallbacks for NoopCallbacks {}

/// Turns every notification into a [`SimEvent`], in call order.
///
/// The engine runs systems against a recorder, then forwards the
/// recorded events to the host and the telemetry store.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<SimEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }
}

fn id(raw: &str) -> EntityId {
    raw.to_string()
}

impl ColonyCallbacks for EventRecorder {
    fn on_hotspot_cycle_started(&mut self, hotspot_id: &str, reset_at_sec: WorldSec) {
        self.push(SimEvent::HotspotCycleStarted { hotspot_id: id(hotspot_id), reset_at_sec });
    }

    fn on_hotspot_harvested(&mut self, hotspot_id: &str, citizen_id: &str, quantity: u32) {
        self.push(SimEvent::HotspotHarvested {
            hotspot_id: id(hotspot_id),
            citizen_id: id(citizen_id),
            quantity,
        });
    }

    fn on_hotspot_reset(&mut self, hotspot_id: &str) {
        self.push(SimEvent::HotspotReset { hotspot_id: id(hotspot_id) });
    }

    fn on_hotspot_upgraded(&mut self, hotspot_id: &str, from_tier: u8, to_tier: u8) {
        self.push(SimEvent::HotspotUpgraded { hotspot_id: id(hotspot_id), from_tier, to_tier });
    }

    fn on_task_created(&mut self, task_id: &str) {
        self.push(SimEvent::TaskCreated { task_id: id(task_id) });
    }

    fn on_task_assigned(&mut self, task_id: &str, citizen_id: &str) {
        self.push(SimEvent::TaskAssigned { task_id: id(task_id), citizen_id: id(citizen_id) });
    }

    fn on_task_preempted(&mut self, task_id: &str, from_citizen_id: &str, reason: &str) {
        self.push(SimEvent::TaskPreempted {
            task_id: id(task_id),
            citizen_id: id(from_citizen_id),
            reason: reason.to_string(),
        });
    }

    fn on_task_completed(&mut self, task_id: &str, citizen_id: &str) {
        self.push(SimEvent::TaskCompleted { task_id: id(task_id), citizen_id: id(citizen_id) });
    }

    fn on_task_quarantined(&mut self, task_id: &str, until_sec: WorldSec) {
        self.push(SimEvent::TaskQuarantined { task_id: id(task_id), until_sec });
    }

    fn on_raid_scheduled(&mut self, raid_id: &str, eta_sec: WorldSec) {
        self.push(SimEvent::RaidScheduled { raid_id: id(raid_id), eta_sec });
    }

    fn on_raid_started(&mut self, raid_id: &str) {
        self.push(SimEvent::RaidStarted { raid_id: id(raid_id) });
    }

    fn on_raid_ended(&mut self, raid_id: &str, success: bool) {
        self.push(SimEvent::RaidEnded { raid_id: id(raid_id), success });
    }

    fn on_crisis_started(&mut self, crisis_id: &str) {
        self.push(SimEvent::CrisisStarted { crisis_id: id(crisis_id) });
    }

    fn on_crisis_ended(&mut self, crisis_id: &str) {
        self.push(SimEvent::CrisisEnded { crisis_id: id(crisis_id) });
    }

    fn on_citizen_death(&mut self, citizen_id: &str, cause: &str) {
        self.push(SimEvent::CitizenDied { citizen_id: id(citizen_id), cause: cause.to_string() });
    }

    fn on_insurance_claim_paid(&mut self, claim_id: &str, citizen_id: &str) {
        self.push(SimEvent::InsuranceClaimPaid { claim_id: id(claim_id), citizen_id: id(citizen_id) });
    }

    fn on_replacement_spawned(&mut self, claim_id: &str, new_citizen_id: &str) {
        self.push(SimEvent::ReplacementSpawned {
            claim_id: id(claim_id),
            citizen_id: id(new_citizen_id),
        });
    }

    fn on_structure_completed(&mut self, structure_id: &str) {
        self.push(SimEvent::StructureCompleted { structure_id: id(structure_id) });
    }

    fn on_policy_changed(&mut self, policy_id: &str) {
        self.push(SimEvent::PolicyChanged { policy: policy_id.to_string() });
    }
}
