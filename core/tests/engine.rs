//! Engine: bootstrap, tick order, raids, structures, deaths, persistence
//! and event publication.

use colony_core::{
    callbacks::{ColonyCallbacks, TickContext},
    citizen::Role,
    config::ColonyConfig,
    content::ContentCatalog,
    engine::ColonyEngine,
    error::SimError,
    event::SimEvent,
    hotspot_subsystem::HotspotFamily,
    raid_subsystem::raid_tier,
    save_service::ColonySaveService,
    state::Resource,
    store::SimStore,
    structure_subsystem::BlueprintId,
    task_broker::{TaskStatus, TaskType},
    telemetry::TelemetryMode,
    types::WorldSec,
    zone_subsystem::ZoneType,
};
use std::{cell::RefCell, rc::Rc};

/// One tick per second and a short raid grace period.
fn config() -> ColonyConfig {
    let mut config = ColonyConfig::default();
    config.sim.tick_hz = 1;
    config.threat.grace_seconds = 10;
    config.save.autosave_seconds = 0;
    config
}

fn engine(run_id: &str) -> ColonyEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    ColonyEngine::build(run_id.into(), config(), ContentCatalog::builtin()).unwrap()
}

#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl ColonyCallbacks for Journal {
    fn on_task_assigned(&mut self, task_id: &str, citizen_id: &str) {
        self.0.borrow_mut().push(format!("assigned {task_id} {citizen_id}"));
    }

    fn on_raid_scheduled(&mut self, raid_id: &str, eta_sec: WorldSec) {
        self.0.borrow_mut().push(format!("scheduled {raid_id} {eta_sec}"));
    }

    fn on_crisis_started(&mut self, crisis_id: &str) {
        self.0.borrow_mut().push(format!("crisis started {crisis_id}"));
    }

    fn on_crisis_ended(&mut self, crisis_id: &str) {
        self.0.borrow_mut().push(format!("crisis ended {crisis_id}"));
    }
}

#[derive(Clone, Default)]
struct TickLog(Rc<RefCell<Vec<(&'static str, TickContext)>>>);

impl ColonyCallbacks for TickLog {
    fn on_pre_tick(&mut self, context: &TickContext) {
        self.0.borrow_mut().push(("pre", *context));
    }

    fn on_post_tick(&mut self, context: &TickContext) {
        self.0.borrow_mut().push(("post", *context));
    }
}

#[test]
fn build_bootstraps_two_citizens_and_a_house() {
    let engine = engine("bootstrap");
    let state = &engine.state;

    assert_eq!(state.population(), 2);
    assert_eq!(state.citizens.get("citizen-1").unwrap().role, Role::Builder);
    assert_eq!(state.citizens.get("citizen-2").unwrap().role, Role::Gatherer);
    assert_eq!(state.structures.len(), 2);
    assert!(state.structures.iter().all(|s| s.complete));
    assert_eq!(state.population_cap, 4);
}

#[test]
fn world_time_follows_tick_rate() {
    let mut engine = ColonyEngine::build("hz".into(), ColonyConfig::default(), ContentCatalog::builtin()).unwrap();
    engine.run_ticks(4).unwrap();
    assert_eq!(engine.world_time_sec(), 0);
    engine.tick().unwrap();
    assert_eq!(engine.world_time_sec(), 1);
    assert_eq!(engine.clock.current_tick, 5);
}

#[test]
fn paused_engine_does_nothing() {
    let mut engine = engine("paused");
    engine.pause();
    let events = engine.run_ticks(20).unwrap();

    assert!(events.is_empty());
    assert_eq!(engine.clock.current_tick, 0);
    assert_eq!(engine.state.raid.next_raid_at_sec, 0);

    engine.resume();
    assert!(!engine.tick().unwrap().is_empty());
}

#[test]
fn raid_runs_from_schedule_to_resolution() {
    let mut engine = engine("raid");

    let first = engine.tick().unwrap();
    assert!(first.contains(&SimEvent::RaidScheduled { raid_id: "raid-initial".into(), eta_sec: 11 }));

    let events = engine.run_ticks(10).unwrap();
    assert!(events.contains(&SimEvent::RaidStarted { raid_id: "raid-11".into() }));
    assert_eq!(engine.state.raid.active_enemies, 1);

    let defend = engine
        .state
        .tasks
        .iter()
        .find(|t| t.task_type == TaskType::Defend)
        .unwrap()
        .clone();
    assert!(defend.emergency);
    assert_eq!(defend.target_ref, "raid-11");
    assert_eq!(defend.status, TaskStatus::Running);

    assert!(engine.resolve_raid(true).unwrap());
    assert_eq!(engine.state.raid.active_enemies, 0);
    assert_eq!(engine.state.raid.raids_survived, 1);
    assert!(engine.state.tasks.is_empty());
    assert!(!engine.resolve_raid(true).unwrap());
}

#[test]
fn blueprint_is_paid_built_and_raises_population_cap() {
    let mut engine = engine("house");
    let wood = engine.state.stock.get(Resource::Wood);

    let house = engine.place_blueprint(BlueprintId::House, 12.0, 0.0, 90).unwrap();
    assert!(!house.complete);
    assert_eq!(engine.state.stock.get(Resource::Wood), wood - 35);

    engine.tick().unwrap();
    let build = engine
        .state
        .tasks
        .iter()
        .find(|t| t.target_ref == house.id)
        .unwrap()
        .clone();
    assert_eq!(build.task_type, TaskType::Build);
    assert_eq!(build.reserved_by.as_deref(), Some("citizen-1"));

    engine.complete_task(&build.id, "citizen-1").unwrap();
    assert!(engine.state.structures.get(&house.id).unwrap().complete);

    engine.tick().unwrap();
    assert_eq!(engine.state.population_cap, 5);
}

#[test]
fn unaffordable_blueprint_is_rejected_without_spending() {
    let mut engine = engine("workshop");
    let stock = engine.state.stock.clone();

    let result = engine.place_blueprint(BlueprintId::Workshop, 0.0, 20.0, 0);

    assert!(matches!(result, Err(SimError::Rejected(_))));
    assert_eq!(engine.state.stock, stock);
    assert_eq!(engine.state.structures.len(), 2);
}

#[test]
fn engine_harvest_credits_gatherer_experience() {
    let mut engine = engine("harvest");
    engine.create_zone(ZoneType::Hotspot, -50.0, -50.0, 50.0, 50.0).unwrap();
    let hotspot = engine.place_hotspot(HotspotFamily::Wood, 20.0, 20.0).unwrap();

    let result = engine.harvest(&hotspot.id, "citizen-2", 10).unwrap();

    assert_eq!(result.quantity, 10);
    assert_eq!(engine.state.citizens.get("citizen-2").unwrap().xp_for(Role::Gatherer), 5);
}

#[test]
fn citizen_death_pays_a_claim_and_spawns_a_replacement() {
    let mut engine = engine("death");
    let task = engine.create_task(TaskType::Build, "repairs", 1.0, false).unwrap();
    engine.tick().unwrap();
    assert_eq!(
        engine.state.tasks.get(&task.id).unwrap().reserved_by.as_deref(),
        Some("citizen-1")
    );

    let replacement = engine.handle_citizen_death("citizen-1", "raid").unwrap();

    assert_eq!(replacement.role, Role::Builder);
    assert!(replacement.id.starts_with("citizen-"));
    assert!(!engine.state.citizens.contains("citizen-1"));
    assert_eq!(engine.state.population(), 2);
    assert_eq!(engine.state.insurance.reserve_points, 90);
    assert_eq!(engine.state.insurance.claims, vec!["citizen-1".to_string()]);
    assert_eq!(engine.state.tasks.get(&task.id).unwrap().status, TaskStatus::Queued);

    engine.tick().unwrap();
    assert_eq!(
        engine.state.tasks.get(&task.id).unwrap().reserved_by.as_deref(),
        Some(replacement.id.as_str())
    );
}

#[test]
fn recruitment_stops_at_population_cap() {
    let mut engine = engine("recruit");
    engine.add_citizen(Role::Farmer).unwrap();
    engine.add_citizen(Role::Guard).unwrap();

    assert!(matches!(engine.add_citizen(Role::Hauler), Err(SimError::Rejected(_))));
    assert_eq!(engine.state.population(), 4);
}

#[test]
fn crafting_checks_colony_stock() {
    let engine = engine("craft");
    assert!(engine.can_craft("rope").unwrap());
    assert!(!engine.can_craft("reinforced_beam").unwrap());
    assert!(engine.can_craft("unknown").is_err());
}

#[test]
fn unsupported_crisis_is_refused() {
    let mut engine = engine("crisis");
    assert!(matches!(engine.start_crisis("dragons"), Err(SimError::InvalidCommand(_))));

    let task = engine.start_crisis("bandit_assault").unwrap();
    assert!(task.emergency);
    assert_eq!(task.task_type, TaskType::Defend);
}

#[test]
fn save_and_load_restore_points_and_clock() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine("persist").with_save_dir(dir.path());
    engine.run_ticks(30).unwrap();
    engine.award_points("citizen-2", 42).unwrap();
    engine.save_now().unwrap();

    engine.award_points("citizen-2", -40).unwrap();
    engine.run_ticks(5).unwrap();
    engine.load().unwrap();

    assert_eq!(engine.state.citizens.get("citizen-2").unwrap().points, 42);
    assert_eq!(engine.world_time_sec(), 30);
    assert_eq!(engine.clock.current_tick, 30);
}

#[test]
fn save_without_directory_is_rejected() {
    let mut engine = engine("nodir");
    assert!(matches!(engine.save_now(), Err(SimError::Rejected(_))));
    assert!(matches!(engine.load(), Err(SimError::Rejected(_))));
}

#[test]
fn autosave_writes_the_active_slot() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.save.autosave_seconds = 5;
    let mut engine = ColonyEngine::build("autosave".into(), config, ContentCatalog::builtin())
        .unwrap()
        .with_save_dir(dir.path());

    engine.run_ticks(4).unwrap();
    assert!(!ColonySaveService::active_path(dir.path()).exists());
    engine.run_ticks(1).unwrap();
    assert!(ColonySaveService::active_path(dir.path()).exists());
}

#[test]
fn host_callbacks_receive_published_events() {
    let journal = Journal::default();
    let mut engine = engine("callbacks").with_callbacks(Box::new(journal.clone()));

    engine.create_task(TaskType::Haul, "pile", 1.0, false).unwrap();
    engine.tick().unwrap();

    let lines = journal.0.borrow();
    assert_eq!(lines.as_slice(), ["scheduled raid-initial 11", "assigned task-1 citizen-1"]);
}

#[test]
fn events_are_logged_unless_telemetry_is_off() {
    let store = SimStore::in_memory().unwrap();
    let mut engine = engine("logged").with_store(store).unwrap();

    engine.tick().unwrap();
    let scheduled = engine.store().unwrap().events_of_type("logged", "raid_scheduled").unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].tick, 1);
    assert!(scheduled[0].payload.contains("raid-initial"));

    engine.set_telemetry_mode(TelemetryMode::Off);
    engine.create_task(TaskType::Haul, "pile", 1.0, false).unwrap();
    engine.run_ticks(3).unwrap();
    assert_eq!(engine.store().unwrap().event_count("logged").unwrap(), 1);
}

/// Same seed, same operations: identical events and replacement ids.
#[test]
fn same_seed_produces_identical_runs() {
    let run = |seed: u64| -> (Vec<SimEvent>, Vec<String>) {
        let mut config = config();
        config.sim.seed = seed;
        let mut engine = ColonyEngine::build("det".into(), config, ContentCatalog::builtin()).unwrap();
        let mut events = engine.run_ticks(12).unwrap();
        engine.handle_citizen_death("citizen-2", "raid").unwrap();
        engine.handle_citizen_death("citizen-1", "raid").unwrap();
        events.extend(engine.run_ticks(12).unwrap());
        let ids = engine.state.citizens.iter().map(|c| c.id.clone()).collect();
        (events, ids)
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7).1, run(8).1);
}

#[test]
fn tick_hooks_fire_around_every_tick_even_when_paused() {
    let log = TickLog::default();
    let mut engine = engine("hooks").with_callbacks(Box::new(log.clone()));

    engine.tick().unwrap();
    engine.pause();
    engine.tick().unwrap();

    let entries = log.0.borrow();
    let running = TickContext { tick: 1, world_time_sec: 0, paused: false };
    assert_eq!(entries[0], ("pre", running));
    assert_eq!(entries[1], ("post", TickContext { world_time_sec: 1, ..running }));
    let paused = TickContext { tick: 1, world_time_sec: 1, paused: true };
    assert_eq!(&entries[2..], [("pre", paused), ("post", paused)]);
}

#[test]
fn actions_queued_while_paused_run_on_the_next_live_tick() {
    let mut engine = engine("queue");
    engine.pause();
    engine.queue_while_paused(Box::new(|engine: &mut ColonyEngine| {
        engine.create_zone(ZoneType::Farm, 0.0, 0.0, 5.0, 5.0).map(|_| ())
    }));
    engine.queue_while_paused(Box::new(|engine: &mut ColonyEngine| {
        engine.clear_zone("zone-9").map(|_| ())
    }));
    engine.queue_while_paused(Box::new(|engine: &mut ColonyEngine| {
        engine.create_task(TaskType::Haul, "pile", 1.0, false).map(|_| ())
    }));

    engine.run_ticks(3).unwrap();
    assert_eq!(engine.queued_while_paused(), 3);
    assert!(engine.state.zones.is_empty());

    engine.resume();
    engine.tick().unwrap();

    assert_eq!(engine.queued_while_paused(), 0);
    assert!(engine.state.zones.contains("zone-1"));
    let task = engine.state.tasks.get("task-1").unwrap();
    assert_eq!(task.status, TaskStatus::Running);
}

#[test]
fn crisis_runs_from_start_to_end() {
    let mut engine = engine("crisis-cycle");
    let task = engine.start_crisis("bandit_assault").unwrap();
    assert!(engine.crisis_active());
    assert!(matches!(engine.start_crisis("bandit_assault"), Err(SimError::Rejected(_))));

    let events = engine.run_ticks(1).unwrap();
    assert!(!events.contains(&SimEvent::CrisisEnded { crisis_id: "bandit_assault".into() }));
    assert!(engine.end_crisis("bandit_assault").unwrap());
    assert!(!engine.crisis_active());
    assert!(!engine.state.tasks.contains(&task.id));
    assert!(!engine.end_crisis("bandit_assault").unwrap());
    assert!(matches!(engine.end_crisis("dragons"), Err(SimError::InvalidCommand(_))));
}

#[test]
fn crisis_events_reach_the_event_log() {
    let store = SimStore::in_memory().unwrap();
    let mut engine = engine("crisis-log").with_store(store).unwrap();
    engine.add_citizen(Role::Guard).unwrap();

    let task = engine.start_crisis("bandit_assault").unwrap();
    engine.tick().unwrap();
    let guard = engine.state.tasks.get(&task.id).unwrap().reserved_by.clone().unwrap();
    engine.complete_task(&task.id, &guard).unwrap();

    let store = engine.store().unwrap();
    assert_eq!(store.events_of_type("crisis-log", "crisis_started").unwrap().len(), 1);
    let ended = store.events_of_type("crisis-log", "crisis_ended").unwrap();
    assert_eq!(ended.len(), 1);
    assert!(ended[0].payload.contains("bandit_assault"));
}

#[test]
fn crisis_hooks_reach_the_host() {
    let journal = Journal::default();
    let mut engine = engine("crisis-host").with_callbacks(Box::new(journal.clone()));
    engine.start_crisis("bandit_assault").unwrap();
    engine.end_crisis("bandit_assault").unwrap();

    let lines = journal.0.borrow();
    assert_eq!(lines.as_slice(), ["crisis started bandit_assault", "crisis ended bandit_assault"]);
}

#[test]
fn raid_tier_follows_threat_at_start() {
    let mut engine = engine("tier");
    for i in 0..3 {
        let x = f64::from(i) * 20.0;
        engine.create_zone(ZoneType::Defense, x, 0.0, x + 10.0, 10.0).unwrap();
    }
    engine.run_ticks(11).unwrap();

    // 2 citizens * 4 + 3 zones * 6
    assert_eq!(engine.state.raid.threat_score, 26);
    assert_eq!(engine.state.raid.active_enemies, 1);
    assert_eq!(engine.state.raid.tier, raid_tier(26));
    assert_eq!(engine.state.raid.tier, 2);
}

#[test]
fn harvest_quality_rises_with_gatherer_level() {
    let mut engine = engine("quality");
    engine.create_zone(ZoneType::Hotspot, -50.0, -50.0, 50.0, 50.0).unwrap();
    let hotspot = engine.place_hotspot(HotspotFamily::Stone, 20.0, 20.0).unwrap();

    assert_eq!(engine.harvest(&hotspot.id, "citizen-2", 5).unwrap().quality, 1);

    engine.state.citizen_mut("citizen-2").unwrap().grant_xp(Role::Gatherer, 700);
    assert_eq!(engine.harvest(&hotspot.id, "citizen-2", 5).unwrap().quality, 2);
}
