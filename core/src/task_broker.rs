//! Task creation, assignment and preemption.
//!
//! RULES:
//!   - A task is reserved by at most one citizen.
//!   - A citizen holds at most one RUNNING task.
//!   - Only emergency tasks preempt, and only work held by an unlocked
//!     citizen whose effective priority is strictly lower.
//!   - A citizen whose preempt lock has not expired is never preempted.
//!   - "Nothing to assign" is not an error; unmatched tasks stay QUEUED.

use crate::{
    arena::Keyed,
    callbacks::ColonyCallbacks,
    citizen::{xp_for_task, Role},
    config::LimitsConfig,
    error::{SimError, SimResult},
    state::{ColonyState, PolicyId, PolicyWeights},
    subsystem::ColonySubsystem,
    types::{EntityId, WorldSec},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Build,
    Farm,
    Gather,
    Haul,
    Defend,
    Repair,
    Emergency,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Build,
        TaskType::Farm,
        TaskType::Gather,
        TaskType::Haul,
        TaskType::Defend,
        TaskType::Repair,
        TaskType::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Build     => "BUILD",
            TaskType::Farm      => "FARM",
            TaskType::Gather    => "GATHER",
            TaskType::Haul      => "HAUL",
            TaskType::Defend    => "DEFEND",
            TaskType::Repair    => "REPAIR",
            TaskType::Emergency => "EMERGENCY",
        }
    }

    pub fn parse(raw: &str) -> Option<TaskType> {
        let wanted = raw.trim().to_ascii_uppercase();
        TaskType::ALL.into_iter().find(|t| t.as_str() == wanted)
    }

    /// Whether a citizen of `role` may work this type of task.
    pub fn accepts_role(&self, role: Role) -> bool {
        match self {
            TaskType::Build | TaskType::Repair => role == Role::Builder,
            TaskType::Farm                     => role == Role::Farmer,
            TaskType::Gather                   => role == Role::Gatherer,
            TaskType::Defend                   => role == Role::Guard,
            TaskType::Haul | TaskType::Emergency => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColonyTask {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Id of whatever the task is about: a structure, a raid, a hotspot.
    pub target_ref: String,
    /// Base priority. Higher is more urgent. Never negative.
    pub priority: f64,
    pub emergency: bool,
    pub status: TaskStatus,
    #[serde(default)]
    pub reserved_by: Option<EntityId>,
    /// Creation order; the tie-break between equal priorities.
    pub created_seq: u64,
    #[serde(default)]
    pub path_retry_count: u32,
    #[serde(default)]
    pub quarantine_until_sec: WorldSec,
}

impl Keyed for ColonyTask {
    fn key(&self) -> &str {
        &self.id
    }
}

impl ColonyTask {
    pub fn is_quarantined(&self, now: WorldSec) -> bool {
        self.quarantine_until_sec > now
    }

    pub fn accepts_role(&self, role: Role) -> bool {
        self.emergency || self.task_type.accepts_role(role)
    }

    pub fn is_held_by(&self, citizen_id: &str) -> bool {
        self.status == TaskStatus::Running && self.reserved_by.as_deref() == Some(citizen_id)
    }

    fn requeue(&mut self) {
        self.status = TaskStatus::Queued;
        self.reserved_by = None;
    }
}

pub struct TaskBroker {
    preempt_lock_seconds: WorldSec,
    path_retries:         u32,
    quarantine_seconds:   WorldSec,
}

impl TaskBroker {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            preempt_lock_seconds: limits.preempt_lock_seconds,
            path_retries:         limits.path_retries,
            quarantine_seconds:   limits.quarantine_seconds,
        }
    }

    /// Enqueue a new QUEUED task.
    pub fn create_task(
        state: &mut ColonyState,
        task_type: TaskType,
        target_ref: impl Into<String>,
        priority: f64,
        emergency: bool,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<ColonyTask> {
        let (id, created_seq) = state.counters.next_task();
        let task = ColonyTask {
            id,
            task_type,
            target_ref: target_ref.into(),
            priority: priority.max(0.0),
            emergency,
            status: TaskStatus::Queued,
            reserved_by: None,
            created_seq,
            path_retry_count: 0,
            quarantine_until_sec: 0,
        };
        log::debug!(
            "t={} task created id={} type={} priority={:.2} emergency={}",
            state.world_time_sec, task.id, task.task_type.as_str(), task.priority, task.emergency,
        );
        state.tasks.insert(task.clone())?;
        callbacks.on_task_created(&task.id);
        Ok(task)
    }

    /// The scheduling pass. See the module rules.
    pub fn assign_tasks(&self, state: &mut ColonyState, callbacks: &mut dyn ColonyCallbacks) {
        let now = state.world_time_sec;
        let mut busy = release_orphaned(state);

        // Highest effective priority first; equal priorities by creation order.
        let mut queue: Vec<(EntityId, f64, u64)> = state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Queued && !t.is_quarantined(now))
            .map(|t| (t.id.clone(), state.effective_priority(t), t.created_seq))
            .collect();
        queue.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));

        for (task_id, priority, _) in queue {
            let Some(task) = state.tasks.get(&task_id) else { continue };
            let emergency = task.emergency;

            let idle = state
                .citizens
                .iter()
                .find(|c| !busy.contains(&c.id) && !c.is_locked(now) && task.accepts_role(c.role))
                .map(|c| c.id.clone());

            if let Some(citizen_id) = idle {
                reserve(state, &task_id, &citizen_id, callbacks);
                busy.insert(citizen_id);
                continue;
            }
            if !emergency {
                continue;
            }

            let Some((victim_id, citizen_id)) = pick_victim(state, &task_id, priority, now) else {
                log::debug!("t={now} emergency task={task_id} waiting: no preemptable citizen");
                continue;
            };

            if let Some(victim) = state.tasks.get_mut(&victim_id) {
                victim.requeue();
            }
            callbacks.on_task_preempted(&victim_id, &citizen_id, "emergency");
            if let Some(citizen) = state.citizens.get_mut(&citizen_id) {
                citizen.preempt_lock_until_sec = now + self.preempt_lock_seconds;
            }
            log::info!(
                "t={now} task={victim_id} preempted from citizen={citizen_id} by emergency task={task_id}"
            );
            reserve(state, &task_id, &citizen_id, callbacks);
        }
    }

    /// Finish a RUNNING task held by `citizen_id`, remove it, and credit XP.
    pub fn complete_task(
        &self,
        state: &mut ColonyState,
        task_id: &str,
        citizen_id: &str,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<ColonyTask> {
        let task = state
            .tasks
            .get(task_id)
            .ok_or_else(|| SimError::not_found("task", task_id))?;
        if !task.is_held_by(citizen_id) {
            return Err(SimError::rejected(format!(
                "Task {task_id} is not running for citizen {citizen_id}"
            )));
        }

        let mut task = state
            .tasks
            .remove(task_id)
            .ok_or_else(|| SimError::not_found("task", task_id))?;
        task.status = TaskStatus::Complete;

        if let Some(citizen) = state.citizens.get_mut(citizen_id) {
            let role = citizen.role;
            if citizen.grant_xp(role, xp_for_task(task.task_type)) {
                log::info!(
                    "t={} citizen={citizen_id} reached {} level {}",
                    state.world_time_sec, role.as_str(), citizen.level(role),
                );
            }
        }
        callbacks.on_task_completed(task_id, citizen_id);
        Ok(task)
    }

    /// Drop a task whatever its status.
    pub fn cancel_task(state: &mut ColonyState, task_id: &str) -> SimResult<ColonyTask> {
        let task = state
            .tasks
            .remove(task_id)
            .ok_or_else(|| SimError::not_found("task", task_id))?;
        log::debug!("t={} task cancelled id={task_id}", state.world_time_sec);
        Ok(task)
    }

    /// Record that the holder could not path to the task's target.
    /// Returns true when the failure pushed the task into quarantine.
    pub fn mark_path_failure(
        &self,
        state: &mut ColonyState,
        task_id: &str,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<bool> {
        let until = state.world_time_sec + self.quarantine_seconds;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| SimError::not_found("task", task_id))?;

        task.path_retry_count += 1;
        if task.path_retry_count <= self.path_retries {
            return Ok(false);
        }

        task.path_retry_count = 0;
        task.quarantine_until_sec = until;
        task.requeue();
        log::warn!("task={task_id} quarantined until t={until} after repeated path failures");
        callbacks.on_task_quarantined(task_id, until);
        Ok(true)
    }

    /// Put every task held by `citizen_id` back in the queue.
    pub fn release_citizen(state: &mut ColonyState, citizen_id: &str) -> Vec<EntityId> {
        let mut released = Vec::new();
        for task in state.tasks.iter_mut() {
            if task.reserved_by.as_deref() == Some(citizen_id) {
                task.requeue();
                released.push(task.id.clone());
            }
        }
        released
    }

    pub fn set_policy(
        state: &mut ColonyState,
        policy: PolicyId,
        callbacks: &mut dyn ColonyCallbacks,
    ) {
        state.active_policy = policy;
        state.task_weights = PolicyWeights::for_policy(policy);
        log::info!("t={} policy set to {}", state.world_time_sec, policy.as_str());
        callbacks.on_policy_changed(policy.as_str());
    }

    /// Override one weight of the active policy. Negative values clamp to 0.
    pub fn set_priority_weight(
        state: &mut ColonyState,
        task_type: TaskType,
        weight: f64,
        callbacks: &mut dyn ColonyCallbacks,
    ) {
        state.task_weights.set(task_type, weight);
        log::info!(
            "t={} priority weight {}={:.2}",
            state.world_time_sec, task_type.as_str(), state.task_weights.weight_for(task_type),
        );
        callbacks.on_policy_changed(state.active_policy.as_str());
    }
}

impl ColonySubsystem for TaskBroker {
    fn name(&self) -> &'static str {
        "task_broker"
    }

    fn update(
        &self,
        state: &mut ColonyState,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<()> {
        self.assign_tasks(state, callbacks);
        Ok(())
    }
}

/// Re-queue RUNNING tasks whose holder is gone or already holds another
/// running task. Returns the citizens that keep a running task.
fn release_orphaned(state: &mut ColonyState) -> HashSet<EntityId> {
    let mut busy = HashSet::new();
    let citizens = &state.citizens;
    for task in state.tasks.iter_mut() {
        if task.status != TaskStatus::Running {
            continue;
        }
        let keep = match &task.reserved_by {
            Some(holder) => citizens.contains(holder) && busy.insert(holder.clone()),
            None => false,
        };
        if !keep {
            log::warn!("task={} lost its holder; re-queued", task.id);
            task.requeue();
        }
    }
    busy
}

/// The running task to give up for `emergency_id`: held by an unlocked
/// citizen, strictly below `priority`, lowest first, newest on ties.
fn pick_victim(
    state: &ColonyState,
    emergency_id: &str,
    priority: f64,
    now: WorldSec,
) -> Option<(EntityId, EntityId)> {
    let emergency = state.tasks.get(emergency_id)?;
    state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Running)
        .filter_map(|t| {
            let holder = state.citizens.get(t.reserved_by.as_deref()?)?;
            if holder.is_locked(now) || !emergency.accepts_role(holder.role) {
                return None;
            }
            let p = state.effective_priority(t);
            (p < priority).then(|| (t, holder, p))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2).then(b.0.created_seq.cmp(&a.0.created_seq)))
        .map(|(t, holder, _)| (t.id.clone(), holder.id.clone()))
}

fn reserve(
    state: &mut ColonyState,
    task_id: &str,
    citizen_id: &str,
    callbacks: &mut dyn ColonyCallbacks,
) {
    if let Some(task) = state.tasks.get_mut(task_id) {
        task.status = TaskStatus::Running;
        task.reserved_by = Some(citizen_id.to_string());
        log::debug!("t={} task={task_id} assigned to citizen={citizen_id}", state.world_time_sec);
        callbacks.on_task_assigned(task_id, citizen_id);
    }
}
