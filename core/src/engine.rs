//! The colony engine: clock, aggregate state and the systems that mutate it.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   0. Pre-tick hook
//!   1. Actions queued while paused
//!   2. Population cap refresh
//!   3. Hotspot resets
//!   4. Raid director
//!   5. Task broker assignment
//!   6. Event publication (host callbacks, event log)
//!   7. Autosave
//!   8. Post-tick hook
//!
//! RULES:
//!   - A paused engine neither advances the clock nor runs systems. It
//!     still calls the pre- and post-tick hooks.
//!   - Queued actions run in order at the start of the first unpaused
//!     tick. A failing action is logged and the rest still run.
//!   - Systems record into the engine's EventRecorder; the engine alone
//!     forwards events to the host and the store.
//!   - Operations issued between ticks publish their events immediately,
//!     stamped with the current tick.
//!   - Autosave failures are logged and never abort a tick.

use crate::{
    callbacks::{ColonyCallbacks, EventRecorder, NoopCallbacks, TickContext},
    citizen::{CitizenState, Role, XP_PER_HARVEST},
    clock::SimClock,
    config::ColonyConfig,
    content::ContentCatalog,
    error::{SimError, SimResult},
    event::{event_type_name, EventLogEntry, SimEvent},
    hotspot_subsystem::{HarvestResult, HotspotFamily, HotspotState, HotspotSubsystem},
    insurance_subsystem::InsuranceSystem,
    raid_subsystem::{RaidDirector, RAID_DEFEND_PRIORITY},
    rng::IdGenerator,
    save_service::ColonySaveService,
    state::{ColonyState, PolicyId},
    store::SimStore,
    structure_subsystem::{self, BlueprintId, PlacedStructure},
    subsystem::ColonySubsystem,
    task_broker::{ColonyTask, TaskBroker, TaskType},
    telemetry::{self, TelemetryMode},
    types::{RunId, Tick, WorldSec},
    zone_subsystem::{self, ZoneState, ZoneType},
};
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

/// The only crisis the command surface can start.
pub const BANDIT_ASSAULT: &str = "bandit_assault";
const BANDIT_ASSAULT_TARGET: &str = "crisis-bandit-assault";

/// Deferred work handed to [`ColonyEngine::queue_while_paused`].
pub type PausedAction = Box<dyn FnOnce(&mut ColonyEngine) -> SimResult<()>>;

pub struct ColonyEngine {
    pub run_id:        RunId,
    pub clock:         SimClock,
    pub state:         ColonyState,
    config:            ColonyConfig,
    catalog:           ContentCatalog,
    hotspots:          HotspotSubsystem,
    raids:             RaidDirector,
    broker:            TaskBroker,
    save_service:      ColonySaveService,
    save_dir:          Option<PathBuf>,
    ids:               IdGenerator,
    recorder:          EventRecorder,
    callbacks:         Box<dyn ColonyCallbacks>,
    store:             Option<SimStore>,
    telemetry_mode:    TelemetryMode,
    last_autosave_sec: WorldSec,
    paused_queue:      VecDeque<PausedAction>,
}

impl ColonyEngine {
    /// An engine over an empty colony: starting stock, no citizens.
    pub fn new(run_id: RunId, config: ColonyConfig, catalog: ContentCatalog) -> Self {
        Self {
            clock:             SimClock::new(config.sim.tick_hz),
            state:             ColonyState::new(),
            hotspots:          HotspotSubsystem::new(&catalog, &config.limits),
            raids:             RaidDirector::new(&config.threat),
            broker:            TaskBroker::new(&config.limits),
            save_service:      ColonySaveService::new(&config.save),
            save_dir:          None,
            ids:               IdGenerator::new(config.sim.seed),
            recorder:          EventRecorder::new(),
            callbacks:         Box::new(NoopCallbacks),
            store:             None,
            telemetry_mode:    TelemetryMode::default(),
            last_autosave_sec: 0,
            paused_queue:      VecDeque::new(),
            run_id,
            config,
            catalog,
        }
    }

    /// A new colony ready to play: two citizens, a town core and a house.
    pub fn build(run_id: RunId, config: ColonyConfig, catalog: ContentCatalog) -> SimResult<Self> {
        let mut engine = Self::new(run_id, config, catalog);
        engine.bootstrap()?;
        Ok(engine)
    }

    fn bootstrap(&mut self) -> SimResult<()> {
        for role in [Role::Builder, Role::Gatherer] {
            let id = self.state.counters.next_citizen();
            self.state.citizens.insert(CitizenState::new(id, role))?;
        }
        for (blueprint, x) in [(BlueprintId::TownCore, 0.0), (BlueprintId::House, 6.0)] {
            let structure = PlacedStructure::new(
                self.state.counters.next_structure(),
                blueprint,
                (x, 0.0),
                0,
                self.state.world_time_sec,
                0,
            );
            self.state.structures.insert(structure)?;
        }
        structure_subsystem::refresh_population_cap(&mut self.state, self.config.limits.max_citizens);
        log::info!(
            "run={} bootstrapped colony: {} citizens, cap {}",
            self.run_id,
            self.state.population(),
            self.state.population_cap,
        );
        Ok(())
    }

    // ── Wiring ─────────────────────────────────────────────────

    pub fn with_callbacks(mut self, callbacks: Box<dyn ColonyCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(save_dir.into());
        self
    }

    /// Attach an event log. Migrates the schema and registers this run.
    pub fn with_store(mut self, store: SimStore) -> SimResult<Self> {
        store.migrate()?;
        store.insert_run(&self.run_id, self.config.sim.seed, env!("CARGO_PKG_VERSION"))?;
        self.store = Some(store);
        Ok(self)
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn store(&self) -> Option<&SimStore> {
        self.store.as_ref()
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    pub fn world_time_sec(&self) -> WorldSec {
        self.state.world_time_sec
    }

    // ── Clock ──────────────────────────────────────────────────

    /// Advance one tick and return the events it produced.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.clock.paused {
            let context = self.tick_context(self.clock.current_tick);
            self.callbacks.on_pre_tick(&context);
            self.callbacks.on_post_tick(&context);
            return Ok(Vec::new());
        }
        let before = self.tick_context(self.clock.current_tick + 1);
        self.callbacks.on_pre_tick(&before);

        let tick = self.clock.advance();
        self.state.world_time_sec = self.state.world_time_sec.max(self.clock.world_time_sec());
        self.run_paused_queue();

        structure_subsystem::refresh_population_cap(&mut self.state, self.config.limits.max_citizens);

        let systems: [&dyn ColonySubsystem; 3] = [&self.hotspots, &self.raids, &self.broker];
        for system in systems {
            system.update(&mut self.state, &mut self.recorder)?;
        }

        let events = self.publish(tick)?;
        self.autosave_if_due();
        let after = self.tick_context(tick);
        self.callbacks.on_post_tick(&after);
        Ok(events)
    }

    fn tick_context(&self, tick: Tick) -> TickContext {
        TickContext {
            tick,
            world_time_sec: self.state.world_time_sec,
            paused: self.clock.paused,
        }
    }

    /// Defer `action` to the start of the next unpaused tick.
    pub fn queue_while_paused(&mut self, action: PausedAction) {
        self.paused_queue.push_back(action);
    }

    pub fn queued_while_paused(&self) -> usize {
        self.paused_queue.len()
    }

    fn run_paused_queue(&mut self) {
        while let Some(action) = self.paused_queue.pop_front() {
            if let Err(e) = action(self) {
                log::warn!("t={} queued action failed: {e}", self.state.world_time_sec);
            }
        }
    }

    /// Run `n` ticks. Ticks while paused are no-ops.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        for _ in 0..n {
            events.extend(self.tick()?);
        }
        Ok(events)
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        log::info!("t={} simulation paused", self.state.world_time_sec);
    }

    pub fn resume(&mut self) {
        self.clock.resume();
        log::info!("t={} simulation resumed", self.state.world_time_sec);
    }

    pub fn is_paused(&self) -> bool {
        self.clock.paused
    }

    // ── Event publication ──────────────────────────────────────

    fn publish(&mut self, tick: Tick) -> SimResult<Vec<SimEvent>> {
        let events = self.recorder.drain();
        for event in &events {
            event.dispatch(self.callbacks.as_mut());
        }
        if let Some(store) = &self.store {
            if self.telemetry_mode != TelemetryMode::Off {
                for event in &events {
                    let entry = EventLogEntry {
                        id:             None,
                        run_id:         self.run_id.clone(),
                        tick,
                        world_time_sec: self.state.world_time_sec,
                        event_type:     event_type_name(event).to_string(),
                        payload:        serde_json::to_string(event)?,
                    };
                    store.append_event(&entry)?;
                }
            }
        }
        Ok(events)
    }

    /// Publish whatever an out-of-tick operation recorded, then hand back
    /// its result.
    fn settle<T>(&mut self, result: SimResult<T>) -> SimResult<T> {
        self.publish(self.clock.current_tick)?;
        result
    }

    // ── Persistence ────────────────────────────────────────────

    fn autosave_if_due(&mut self) {
        let interval = self.config.save.autosave_seconds;
        if interval == 0 || self.save_dir.is_none() {
            return;
        }
        let now = self.state.world_time_sec;
        if now.saturating_sub(self.last_autosave_sec) < interval {
            return;
        }
        self.last_autosave_sec = now;
        match self.save_now() {
            Ok(path) => log::debug!("t={now} autosaved to {}", path.display()),
            Err(e) => log::warn!("t={now} autosave failed: {e}"),
        }
    }

    /// Write the colony to the configured save directory.
    pub fn save_now(&mut self) -> SimResult<PathBuf> {
        let dir = self
            .save_dir
            .clone()
            .ok_or_else(|| SimError::rejected("No save directory configured"))?;
        self.save_service.save(&self.state, &dir)
    }

    /// Replace the colony with the active save. On failure the running
    /// colony is left as it was.
    pub fn load(&mut self) -> SimResult<()> {
        let dir = self
            .save_dir
            .clone()
            .ok_or_else(|| SimError::rejected("No save directory configured"))?;
        self.save_service.load_into(&mut self.state, &dir)?;
        self.clock.sync_to(self.state.world_time_sec);
        self.last_autosave_sec = self.state.world_time_sec;
        Ok(())
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub fn create_task(
        &mut self,
        task_type: TaskType,
        target_ref: &str,
        priority: f64,
        emergency: bool,
    ) -> SimResult<ColonyTask> {
        let result = TaskBroker::create_task(
            &mut self.state,
            task_type,
            target_ref,
            priority,
            emergency,
            &mut self.recorder,
        );
        self.settle(result)
    }

    /// Run one scheduling pass outside the tick loop.
    pub fn assign_tasks(&mut self) -> SimResult<()> {
        self.broker.assign_tasks(&mut self.state, &mut self.recorder);
        self.settle(Ok(()))
    }

    /// Complete a running task. A finished BUILD task completes the
    /// structure it targets; finishing the last crisis DEFEND task ends
    /// the crisis.
    pub fn complete_task(&mut self, task_id: &str, citizen_id: &str) -> SimResult<ColonyTask> {
        let result = self
            .broker
            .complete_task(&mut self.state, task_id, citizen_id, &mut self.recorder)
            .and_then(|task| {
                if task.task_type == TaskType::Build && self.state.structures.contains(&task.target_ref) {
                    structure_subsystem::complete_structure(
                        &mut self.state,
                        &task.target_ref,
                        &mut self.recorder,
                    )?;
                }
                if task.target_ref == BANDIT_ASSAULT_TARGET && !self.crisis_active() {
                    log::info!("t={} crisis ended: {BANDIT_ASSAULT}", self.state.world_time_sec);
                    self.recorder.on_crisis_ended(BANDIT_ASSAULT);
                }
                Ok(task)
            });
        self.settle(result)
    }

    pub fn cancel_task(&mut self, task_id: &str) -> SimResult<ColonyTask> {
        TaskBroker::cancel_task(&mut self.state, task_id)
    }

    pub fn mark_path_failure(&mut self, task_id: &str) -> SimResult<bool> {
        let result = self.broker.mark_path_failure(&mut self.state, task_id, &mut self.recorder);
        self.settle(result)
    }

    pub fn set_policy(&mut self, policy: PolicyId) -> SimResult<()> {
        TaskBroker::set_policy(&mut self.state, policy, &mut self.recorder);
        self.settle(Ok(()))
    }

    pub fn set_priority_weight(&mut self, task_type: TaskType, weight: f64) -> SimResult<()> {
        TaskBroker::set_priority_weight(&mut self.state, task_type, weight, &mut self.recorder);
        self.settle(Ok(()))
    }

    /// Queue the emergency DEFEND task of a named crisis.
    pub fn start_crisis(&mut self, crisis: &str) -> SimResult<ColonyTask> {
        check_crisis(crisis)?;
        if self.crisis_active() {
            return Err(SimError::rejected(format!("Crisis already active: {crisis}")));
        }
        log::info!("t={} crisis started: {crisis}", self.state.world_time_sec);
        let result = TaskBroker::create_task(
            &mut self.state,
            TaskType::Defend,
            BANDIT_ASSAULT_TARGET,
            RAID_DEFEND_PRIORITY,
            true,
            &mut self.recorder,
        );
        if result.is_ok() {
            self.recorder.on_crisis_started(crisis);
        }
        self.settle(result)
    }

    /// Call off a crisis, dropping its DEFEND tasks. Returns false when
    /// it was not active.
    pub fn end_crisis(&mut self, crisis: &str) -> SimResult<bool> {
        check_crisis(crisis)?;
        let defend: Vec<String> = self
            .state
            .tasks
            .iter()
            .filter(|t| t.target_ref == BANDIT_ASSAULT_TARGET)
            .map(|t| t.id.clone())
            .collect();
        if defend.is_empty() {
            return Ok(false);
        }
        for task_id in defend {
            TaskBroker::cancel_task(&mut self.state, &task_id)?;
        }
        log::info!("t={} crisis ended: {crisis}", self.state.world_time_sec);
        self.recorder.on_crisis_ended(crisis);
        self.settle(Ok(true))
    }

    /// A crisis is active while any task still targets it.
    pub fn crisis_active(&self) -> bool {
        self.state.tasks.iter().any(|t| t.target_ref == BANDIT_ASSAULT_TARGET)
    }

    // ── Hotspots ───────────────────────────────────────────────

    pub fn place_hotspot(&mut self, family: HotspotFamily, x: f64, y: f64) -> SimResult<HotspotState> {
        let result = self.hotspots.place_hotspot(&mut self.state, family, x, y, &mut self.recorder);
        self.settle(result)
    }

    /// Harvest on behalf of a citizen, crediting gatherer experience for
    /// any yield.
    pub fn harvest(
        &mut self,
        hotspot_id: &str,
        citizen_id: &str,
        amount_requested: u32,
    ) -> SimResult<HarvestResult> {
        let result = self
            .hotspots
            .harvest(&mut self.state, hotspot_id, citizen_id, amount_requested, &mut self.recorder)
            .and_then(|harvest| {
                if harvest.quantity > 0 {
                    self.state.citizen_mut(citizen_id)?.grant_xp(Role::Gatherer, XP_PER_HARVEST);
                }
                Ok(harvest)
            });
        self.settle(result)
    }

    pub fn upgrade_hotspot(&mut self, hotspot_id: &str) -> SimResult<HotspotState> {
        let result = self.hotspots.upgrade_hotspot(&mut self.state, hotspot_id, &mut self.recorder);
        self.settle(result)
    }

    pub fn remove_hotspot(&mut self, hotspot_id: &str) -> SimResult<HotspotState> {
        HotspotSubsystem::remove_hotspot(&mut self.state, hotspot_id)
    }

    // ── Zones ──────────────────────────────────────────────────

    pub fn create_zone(
        &mut self,
        zone_type: ZoneType,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    ) -> SimResult<ZoneState> {
        zone_subsystem::create_zone(&mut self.state, zone_type, x_min, y_min, x_max, y_max)
    }

    pub fn clear_zone(&mut self, zone_id: &str) -> SimResult<ZoneState> {
        zone_subsystem::clear_zone(&mut self.state, zone_id)
    }

    // ── Structures ─────────────────────────────────────────────

    pub fn place_blueprint(
        &mut self,
        blueprint: BlueprintId,
        x: f64,
        y: f64,
        rotation: i32,
    ) -> SimResult<PlacedStructure> {
        let result = self.catalog.blueprint(blueprint).cloned().and_then(|definition| {
            structure_subsystem::place_blueprint(
                &mut self.state,
                &definition,
                x,
                y,
                rotation,
                &mut self.recorder,
            )
        });
        self.settle(result)
    }

    pub fn complete_structure(&mut self, structure_id: &str) -> SimResult<()> {
        let result =
            structure_subsystem::complete_structure(&mut self.state, structure_id, &mut self.recorder);
        self.settle(result)
    }

    /// True when colony stock satisfies every input of the recipe.
    pub fn can_craft(&self, recipe_id: &str) -> SimResult<bool> {
        let recipe = self.catalog.recipe(recipe_id)?;
        Ok(recipe.is_satisfied_by(&self.state.stock.as_item_stacks()))
    }

    // ── Citizens, raids, insurance ─────────────────────────────

    /// Recruit a citizen. Rejected at the population cap.
    pub fn add_citizen(&mut self, role: Role) -> SimResult<CitizenState> {
        if self.state.population() >= self.state.population_cap {
            return Err(SimError::rejected(format!(
                "Population cap reached ({})",
                self.state.population_cap
            )));
        }
        let citizen = CitizenState::new(self.state.counters.next_citizen(), role);
        log::info!(
            "t={} citizen joined id={} role={}",
            self.state.world_time_sec, citizen.id, role.as_str(),
        );
        self.state.citizens.insert(citizen.clone())?;
        Ok(citizen)
    }

    /// Add `delta` to a citizen's points. Returns the new balance.
    pub fn award_points(&mut self, citizen_id: &str, delta: i64) -> SimResult<i64> {
        Ok(self.state.citizen_mut(citizen_id)?.award_points(delta))
    }

    pub fn handle_citizen_death(&mut self, citizen_id: &str, cause: &str) -> SimResult<CitizenState> {
        let result = InsuranceSystem::handle_citizen_death(
            &mut self.state,
            citizen_id,
            cause,
            &mut self.ids,
            &mut self.recorder,
        );
        self.settle(result)
    }

    /// End the active raid. Returns false when none was active.
    pub fn resolve_raid(&mut self, success: bool) -> SimResult<bool> {
        let ended = RaidDirector::resolve_raid(&mut self.state, success, &mut self.recorder);
        self.settle(Ok(ended))
    }

    // ── Telemetry ──────────────────────────────────────────────

    pub fn telemetry_mode(&self) -> TelemetryMode {
        self.telemetry_mode
    }

    /// Also gates event-log writes: `Off` stops them.
    pub fn set_telemetry_mode(&mut self, mode: TelemetryMode) {
        self.telemetry_mode = mode;
        log::info!("t={} telemetry mode {}", self.state.world_time_sec, mode.as_str());
    }

    /// Status line in the engine's current telemetry mode.
    pub fn status(&self) -> String {
        telemetry::status_report(&self.state, self.telemetry_mode)
    }
}

fn check_crisis(crisis: &str) -> SimResult<()> {
    if crisis == BANDIT_ASSAULT {
        Ok(())
    } else {
        Err(SimError::InvalidCommand(format!("Only {BANDIT_ASSAULT} is supported in v1")))
    }
}
