//! Simulation events: the record of everything the callbacks were told.
//!
//! RULE: Every callback notification has exactly one SimEvent variant,
//! except the tick-boundary hooks, which the engine calls directly.
//! Variants are only ever added; existing names are what the event log
//! stores, so they are never renamed or removed.

use crate::{
    callbacks::ColonyCallbacks,
    types::{EntityId, RunId, Tick, WorldSec},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Hotspot events ─────────────────────────────
    HotspotCycleStarted {
        hotspot_id: EntityId,
        reset_at_sec: WorldSec,
    },
    HotspotHarvested {
        hotspot_id: EntityId,
        citizen_id: EntityId,
        quantity: u32,
    },
    HotspotReset {
        hotspot_id: EntityId,
    },
    HotspotUpgraded {
        hotspot_id: EntityId,
        from_tier: u8,
        to_tier: u8,
    },

    // ── Task events ────────────────────────────────
    TaskCreated {
        task_id: EntityId,
    },
    TaskAssigned {
        task_id: EntityId,
        citizen_id: EntityId,
    },
    TaskPreempted {
        task_id: EntityId,
        citizen_id: EntityId,
        reason: String,
    },
    TaskCompleted {
        task_id: EntityId,
        citizen_id: EntityId,
    },
    TaskQuarantined {
        task_id: EntityId,
        until_sec: WorldSec,
    },

    // ── Raid and insurance events ──────────────────
    RaidScheduled {
        raid_id: EntityId,
        eta_sec: WorldSec,
    },
    RaidStarted {
        raid_id: EntityId,
    },
    RaidEnded {
        raid_id: EntityId,
        success: bool,
    },
    CrisisStarted {
        crisis_id: EntityId,
    },
    CrisisEnded {
        crisis_id: EntityId,
    },
    CitizenDied {
        citizen_id: EntityId,
        cause: String,
    },
    InsuranceClaimPaid {
        claim_id: EntityId,
        citizen_id: EntityId,
    },
    ReplacementSpawned {
        claim_id: EntityId,
        citizen_id: EntityId,
    },

    // ── Colony events ──────────────────────────────
    StructureCompleted {
        structure_id: EntityId,
    },
    PolicyChanged {
        policy: String,
    },
}

impl SimEvent {
    /// Replay this event into a callback implementation.
    pub fn dispatch(&self, callbacks: &mut dyn ColonyCallbacks) {
        match self {
            SimEvent::HotspotCycleStarted { hotspot_id, reset_at_sec } =>
                callbacks.on_hotspot_cycle_started(hotspot_id, *reset_at_sec),
            SimEvent::HotspotHarvested { hotspot_id, citizen_id, quantity } =>
                callbacks.on_hotspot_harvested(hotspot_id, citizen_id, *quantity),
            SimEvent::HotspotReset { hotspot_id } =>
                callbacks.on_hotspot_reset(hotspot_id),
            SimEvent::HotspotUpgraded { hotspot_id, from_tier, to_tier } =>
                callbacks.on_hotspot_upgraded(hotspot_id, *from_tier, *to_tier),
            SimEvent::TaskCreated { task_id } =>
                callbacks.on_task_created(task_id),
            SimEvent::TaskAssigned { task_id, citizen_id } =>
                callbacks.on_task_assigned(task_id, citizen_id),
            SimEvent::TaskPreempted { task_id, citizen_id, reason } =>
                callbacks.on_task_preempted(task_id, citizen_id, reason),
            SimEvent::TaskCompleted { task_id, citizen_id } =>
                callbacks.on_task_completed(task_id, citizen_id),
            SimEvent::TaskQuarantined { task_id, until_sec } =>
                callbacks.on_task_quarantined(task_id, *until_sec),
            SimEvent::RaidScheduled { raid_id, eta_sec } =>
                callbacks.on_raid_scheduled(raid_id, *eta_sec),
            SimEvent::RaidStarted { raid_id } =>
                callbacks.on_raid_started(raid_id),
            SimEvent::RaidEnded { raid_id, success } =>
                callbacks.on_raid_ended(raid_id, *success),
            SimEvent::CrisisStarted { crisis_id } =>
                callbacks.on_crisis_started(crisis_id),
            SimEvent::CrisisEnded { crisis_id } =>
                callbacks.on_crisis_ended(crisis_id),
            SimEvent::CitizenDied { citizen_id, cause } =>
                callbacks.on_citizen_death(citizen_id, cause),
            SimEvent::InsuranceClaimPaid { claim_id, citizen_id } =>
                callbacks.on_insurance_claim_paid(claim_id, citizen_id),
            SimEvent::ReplacementSpawned { claim_id, citizen_id } =>
                callbacks.on_replacement_spawned(claim_id, citizen_id),
            SimEvent::StructureCompleted { structure_id } =>
                callbacks.on_structure_completed(structure_id),
            SimEvent::PolicyChanged { policy } =>
                callbacks.on_policy_changed(policy),
        }
    }
}

/// Stable name of a SimEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::HotspotCycleStarted { .. } => "hotspot_cycle_started",
        SimEvent::HotspotHarvested { .. }    => "hotspot_harvested",
        SimEvent::HotspotReset { .. }        => "hotspot_reset",
        SimEvent::HotspotUpgraded { .. }     => "hotspot_upgraded",
        SimEvent::TaskCreated { .. }         => "task_created",
        SimEvent::TaskAssigned { .. }        => "task_assigned",
        SimEvent::TaskPreempted { .. }       => "task_preempted",
        SimEvent::TaskCompleted { .. }       => "task_completed",
        SimEvent::TaskQuarantined { .. }     => "task_quarantined",
        SimEvent::RaidScheduled { .. }       => "raid_scheduled",
        SimEvent::RaidStarted { .. }         => "raid_started",
        SimEvent::RaidEnded { .. }           => "raid_ended",
        SimEvent::CrisisStarted { .. }       => "crisis_started",
        SimEvent::CrisisEnded { .. }         => "crisis_ended",
        SimEvent::CitizenDied { .. }         => "citizen_died",
        SimEvent::InsuranceClaimPaid { .. }  => "insurance_claim_paid",
        SimEvent::ReplacementSpawned { .. }  => "replacement_spawned",
        SimEvent::StructureCompleted { .. }  => "structure_completed",
        SimEvent::PolicyChanged { .. }       => "policy_changed",
    }
}

/// One row of the telemetry event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:             Option<i64>,
    pub run_id:         RunId,
    pub tick:           Tick,
    pub world_time_sec: WorldSec,
    pub event_type:     String,
    pub payload:        String, // JSON-serialized SimEvent
}
