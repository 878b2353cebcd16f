//! Citizen death handling: claim payout and replacement.

use crate::{
    callbacks::ColonyCallbacks,
    citizen::CitizenState,
    error::{SimError, SimResult},
    rng::IdGenerator,
    state::ColonyState,
    task_broker::TaskBroker,
};

pub struct InsuranceSystem;

impl InsuranceSystem {
    /// Remove a dead citizen and spawn a replacement with the same role and
    /// experience. The dead citizen's tasks go back to the queue and the
    /// reserve pays one claim.
    pub fn handle_citizen_death(
        state: &mut ColonyState,
        citizen_id: &str,
        cause: &str,
        ids: &mut IdGenerator,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<CitizenState> {
        let dead = state
            .citizens
            .remove(citizen_id)
            .ok_or_else(|| SimError::not_found("citizen", citizen_id))?;
        callbacks.on_citizen_death(citizen_id, cause);

        let released = TaskBroker::release_citizen(state, citizen_id);
        if !released.is_empty() {
            log::debug!("citizen={citizen_id} released tasks {released:?}");
        }

        let claim_id = ids.prefixed("claim");
        state.insurance.apply_claim(citizen_id);
        callbacks.on_insurance_claim_paid(&claim_id, citizen_id);

        let mut replacement = CitizenState::new(ids.prefixed("citizen"), dead.role);
        replacement.xp = dead.xp;
        state.citizens.insert(replacement.clone())?;

        log::warn!(
            "t={} citizen={citizen_id} died ({cause}); claim={claim_id} replacement={} reserve={}",
            state.world_time_sec, replacement.id, state.insurance.reserve_points,
        );
        callbacks.on_replacement_spawned(&claim_id, &replacement.id);
        Ok(replacement)
    }
}
