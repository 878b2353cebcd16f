//! Raid director: threat scoring and raid pacing.
//!
//! Threat = population × 4 + non-HOME zones × 6.
//! The first tick schedules the first raid after the grace period.
//! After that a raid starts when the schedule is due, or early when
//! threat has grown enough since the last raid and the cooldown passed.
//!
//! Each raid is fixed to a tier when it starts: 1 + threat / 18, capped
//! at 5. The tier scales enemy health and damage.

use crate::{
    callbacks::ColonyCallbacks,
    config::ThreatConfig,
    error::SimResult,
    state::ColonyState,
    subsystem::ColonySubsystem,
    task_broker::{TaskBroker, TaskType},
    types::WorldSec,
    zone_subsystem,
};

/// Base priority of the DEFEND task queued for every raid.
pub const RAID_DEFEND_PRIORITY: f64 = 2.0;

pub const MAX_RAID_TIER: u32 = 5;
const THREAT_PER_TIER: u32 = 18;

pub fn raid_tier(threat: u32) -> u32 {
    (1 + threat / THREAT_PER_TIER).min(MAX_RAID_TIER)
}

/// Enemy health scale: +25% per tier above 1.
pub fn health_multiplier(tier: u32) -> f64 {
    1.0 + 0.25 * f64::from(tier.clamp(1, MAX_RAID_TIER) - 1)
}

/// Enemy damage scale: +15% per tier above 1.
pub fn damage_multiplier(tier: u32) -> f64 {
    1.0 + 0.15 * f64::from(tier.clamp(1, MAX_RAID_TIER) - 1)
}

pub struct RaidDirector {
    grace_seconds:            WorldSec,
    base_interval_seconds:    WorldSec,
    trigger_cooldown_seconds: WorldSec,
    trigger_delta:            u32,
    max_active_enemies:       u32,
}

impl RaidDirector {
    pub fn new(threat: &ThreatConfig) -> Self {
        Self {
            grace_seconds:            threat.grace_seconds,
            base_interval_seconds:    threat.base_interval_seconds,
            trigger_cooldown_seconds: threat.trigger_cooldown_seconds,
            trigger_delta:            threat.trigger_delta,
            max_active_enemies:       threat.max_active_enemies,
        }
    }

    pub fn threat_score(state: &ColonyState) -> u32 {
        state.population() * 4 + zone_subsystem::non_home_zone_count(state) * 6
    }

    pub fn tick(&self, state: &mut ColonyState, callbacks: &mut dyn ColonyCallbacks) -> SimResult<()> {
        let now = state.world_time_sec;
        let threat = Self::threat_score(state);
        state.raid.threat_score = threat;

        if state.raid.next_raid_at_sec == 0 {
            let scheduled = (now + self.grace_seconds).max(1);
            state.raid.next_raid_at_sec = scheduled;
            log::info!("t={now} first raid scheduled for t={scheduled}");
            callbacks.on_raid_scheduled("raid-initial", scheduled);
            return Ok(());
        }

        let raid = &state.raid;
        let scheduled_due = now >= raid.next_raid_at_sec;
        let triggered_due = threat.saturating_sub(raid.threat_at_last_raid) >= self.trigger_delta
            && now.saturating_sub(raid.last_raid_at_sec) >= self.trigger_cooldown_seconds
            && now >= self.grace_seconds;

        if (scheduled_due || triggered_due) && raid.active_enemies < self.max_active_enemies {
            self.start_raid(state, callbacks)?;
        }
        Ok(())
    }

    fn start_raid(&self, state: &mut ColonyState, callbacks: &mut dyn ColonyCallbacks) -> SimResult<()> {
        let now = state.world_time_sec;
        let raid = &mut state.raid;
        raid.active_enemies = self.max_active_enemies;
        raid.tier = raid_tier(raid.threat_score);
        raid.last_raid_at_sec = now;
        raid.threat_at_last_raid = raid.threat_score;
        raid.next_raid_at_sec = now + self.base_interval_seconds;
        let next = raid.next_raid_at_sec;

        let raid_id = current_raid_id(state);
        log::info!(
            "t={now} raid started id={raid_id} threat={} tier={} next=t={next}",
            state.raid.threat_score,
            state.raid.tier,
        );
        callbacks.on_raid_started(&raid_id);
        callbacks.on_raid_scheduled("raid-next", next);
        TaskBroker::create_task(state, TaskType::Defend, raid_id, RAID_DEFEND_PRIORITY, true, callbacks)?;
        Ok(())
    }

    /// End the active raid. Returns false when no raid was active.
    pub fn resolve_raid(
        state: &mut ColonyState,
        success: bool,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> bool {
        if state.raid.active_enemies == 0 {
            return false;
        }
        state.raid.active_enemies = 0;
        if success {
            state.raid.raids_survived += 1;
        }

        let raid_id = current_raid_id(state);
        let defend: Vec<String> = state
            .tasks
            .iter()
            .filter(|t| t.task_type == TaskType::Defend && t.target_ref == raid_id)
            .map(|t| t.id.clone())
            .collect();
        for task_id in defend {
            // Ids come from the collection just scanned.
            let _ = TaskBroker::cancel_task(state, &task_id);
        }

        log::info!("t={} raid ended id={raid_id} success={success}", state.world_time_sec);
        callbacks.on_raid_ended(&raid_id, success);
        true
    }
}

impl ColonySubsystem for RaidDirector {
    fn name(&self) -> &'static str {
        "raids"
    }

    fn update(
        &self,
        state: &mut ColonyState,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<()> {
        self.tick(state, callbacks)
    }
}

/// `raid-<start second>` of the most recent raid.
pub fn current_raid_id(state: &ColonyState) -> String {
    format!("raid-{}", state.raid.last_raid_at_sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_grows_every_eighteen_threat_and_caps_at_five() {
        assert_eq!(raid_tier(0), 1);
        assert_eq!(raid_tier(17), 1);
        assert_eq!(raid_tier(18), 2);
        assert_eq!(raid_tier(72), 5);
        assert_eq!(raid_tier(500), 5);
    }

    #[test]
    fn multipliers_clamp_the_tier() {
        assert_eq!(health_multiplier(1), 1.0);
        assert_eq!(health_multiplier(3), 1.5);
        assert_eq!(health_multiplier(9), 2.0);
        assert_eq!(health_multiplier(0), 1.0);
        assert!((damage_multiplier(5) - 1.6).abs() < 1e-9);
        assert_eq!(damage_multiplier(1), 1.0);
    }
}
