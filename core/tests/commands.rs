//! The `/colony` command surface end to end through CommandRouter.

use colony_core::{
    command::{CommandResult, CommandRouter},
    config::ColonyConfig,
    content::ContentCatalog,
    engine::ColonyEngine,
    state::PolicyId,
    task_broker::TaskType,
    telemetry::TelemetryMode,
};

fn router() -> CommandRouter {
    let mut config = ColonyConfig::default();
    config.save.autosave_seconds = 0;
    CommandRouter::new(ColonyEngine::build("cmd".into(), config, ContentCatalog::builtin()).unwrap())
}

fn ok(result: CommandResult) -> String {
    assert!(result.success, "command failed: {}", result.message);
    result.message
}

fn err(result: CommandResult) -> String {
    assert!(!result.success, "command unexpectedly succeeded: {}", result.message);
    result.message
}

#[test]
fn bare_namespace_prints_brief_status() {
    let mut router = router();
    let message = ok(router.execute("/colony"));
    assert!(message.starts_with("status t=0s pop=2/4 "), "{message}");
    assert!(message.ends_with("policy=RECOVERY"), "{message}");
}

#[test]
fn full_status_lists_population_and_stock() {
    let mut router = router();
    let message = ok(router.execute("/colony status --full"));
    assert!(message.contains("population=2/4"));
    assert!(message.contains("wood=100"));
}

#[test]
fn reports_honour_the_off_mode() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony tasks off")), "Telemetry is off.");
    assert!(ok(router.execute("/colony tasks")).starts_with("tasks total=0"));
    assert!(!ok(router.execute("/colony raid full")).is_empty());
}

#[test]
fn pause_and_resume_toggle_the_clock() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony pause")), "Simulation paused.");
    assert!(router.engine().is_paused());
    router.engine_mut().run_ticks(10).unwrap();
    assert_eq!(router.engine().clock.current_tick, 0);

    assert_eq!(ok(router.execute("/colony resume")), "Simulation resumed.");
    assert!(!router.engine().is_paused());
}

#[test]
fn priority_weights_are_validated_and_applied() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony priority set farm 1.5")), "Priority updated: FARM=1.50");
    assert_eq!(router.engine().state.task_weights.weight_for(TaskType::Farm), 1.5);

    assert_eq!(
        err(router.execute("/colony priority set farm 0.1")),
        "Priority value must be between 0.50 and 2.00"
    );
    assert_eq!(err(router.execute("/colony priority set farm lots")), "Invalid number: lots");
    assert_eq!(err(router.execute("/colony priority set cook 1.0")), "Unknown task type: cook");
    assert!(err(router.execute("/colony priority farm")).starts_with("Usage: /colony priority set"));
}

#[test]
fn policy_switch_replaces_weights() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony policy set HarvestRush")), "Policy updated: HARVEST_RUSH");
    assert_eq!(router.engine().state.active_policy, PolicyId::HarvestRush);
    assert_eq!(router.engine().state.task_weights.weight_for(TaskType::Farm), 1.5);
    assert_eq!(err(router.execute("/colony policy set Panic")), "Unknown policy: Panic");
}

#[test]
fn zones_need_both_marks() {
    let mut router = router();
    assert_eq!(err(router.execute("/colony zone create hotspot")), "Set mark1 and mark2 first");

    assert_eq!(ok(router.execute("/colony zone mark1 40 40")), "mark1 set");
    assert_eq!(err(router.execute("/colony zone create hotspot")), "Set mark1 and mark2 first");
    assert_eq!(ok(router.execute("/colony zone mark2 -40 -40")), "mark2 set");
    assert_eq!(ok(router.execute("/colony zone create hotspot")), "Zone created: zone-1 type=HOTSPOT");

    let zone = router.engine().state.zones.get("zone-1").unwrap();
    assert_eq!((zone.x_min, zone.x_max), (-40.0, 40.0));
}

#[test]
fn zone_clear_reports_unknown_ids() {
    let mut router = router();
    router.execute("/colony zone mark1 0 0");
    router.execute("/colony zone mark2 5 5");
    ok(router.execute("/colony zone create farm"));

    assert_eq!(ok(router.execute("/colony zone clear zone-1")), "Zone cleared: zone-1");
    assert_eq!(err(router.execute("/colony zone clear zone-9")), "Zone not found: zone-9");
}

#[test]
fn hotspots_are_placed_and_upgraded_through_commands() {
    let mut router = router();
    assert_eq!(
        err(router.execute("/colony hotspot place wood 10 10")),
        "Placement rejected: Hotspot placement requires a HOTSPOT zone"
    );

    router.execute("/colony zone mark1 0 0");
    router.execute("/colony zone mark2 50 50");
    ok(router.execute("/colony zone create hotspot"));

    assert_eq!(ok(router.execute("/colony hotspot place wood 10 10")), "Hotspot placed: hotspot-1");
    assert_eq!(
        ok(router.execute("/colony hotspot upgrade hotspot-1")),
        "Hotspot upgraded: hotspot-1 tier=2"
    );
    assert!(!err(router.execute("/colony hotspot upgrade hotspot-7")).is_empty());
    assert_eq!(err(router.execute("/colony hotspot place lava 1 1")), "Unknown hotspot family: lava");
}

#[test]
fn blueprints_are_queued_as_build_tasks() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony build place House 12 0 0")), "Blueprint queued: structure-3");
    assert!(router
        .engine()
        .state
        .tasks
        .iter()
        .any(|t| t.task_type == TaskType::Build && t.target_ref == "structure-3"));

    assert!(err(router.execute("/colony build place Workshop 0 30 0")).starts_with("Missing stock"));
    assert!(err(router.execute("/colony build place House 1 2")).starts_with("Usage: /colony build place"));
}

#[test]
fn only_bandit_assault_crisis_is_supported() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony crisis start bandit_assault")), "Bandit assault crisis started.");
    let task = router.engine().state.tasks.iter().next().unwrap();
    assert!(task.emergency);
    assert_eq!(task.task_type, TaskType::Defend);

    assert_eq!(
        err(router.execute("/colony crisis start plague")),
        "Only bandit_assault is supported in v1"
    );
}

#[test]
fn crisis_can_be_called_off_once() {
    let mut router = router();
    ok(router.execute("/colony crisis start bandit_assault"));
    assert_eq!(
        err(router.execute("/colony crisis start bandit_assault")),
        "Crisis already active: bandit_assault"
    );
    assert_eq!(ok(router.execute("/colony crisis end bandit_assault")), "Bandit assault crisis ended.");
    assert!(router.engine().state.tasks.is_empty());
    assert_eq!(
        err(router.execute("/colony crisis end bandit_assault")),
        "No active crisis: bandit_assault"
    );
    assert_eq!(
        err(router.execute("/colony crisis stop bandit_assault")),
        "Usage: /colony crisis <start|end> bandit_assault"
    );
}

#[test]
fn full_raid_report_shows_tier_scaling() {
    let mut router = router();
    let report = ok(router.execute("/colony raid full"));
    assert!(report.contains("tier=0 health=x1.00 damage=x1.00"), "{report}");
}

#[test]
fn telemetry_mode_is_stored_on_the_engine() {
    let mut router = router();
    assert_eq!(ok(router.execute("/colony telemetry off")), "Telemetry mode set to OFF");
    assert_eq!(router.engine().telemetry_mode(), TelemetryMode::Off);
    assert_eq!(err(router.execute("/colony telemetry loud")), "Unknown telemetry mode: loud");
}

#[test]
fn save_needs_a_directory() {
    let mut router = router();
    assert!(!err(router.execute("/colony save")).is_empty());

    let dir = tempfile::tempdir().unwrap();
    let engine = router.into_engine().with_save_dir(dir.path());
    let mut router = CommandRouter::new(engine);
    assert_eq!(ok(router.execute("/colony save")), "Save completed.");
}

#[test]
fn malformed_lines_are_rejected() {
    let mut router = router();
    assert_eq!(err(router.execute("")), "Empty command");
    assert_eq!(err(router.execute("/town status")), "Unsupported namespace. Use /colony");
    assert_eq!(err(router.execute("/colony dance")), "Unknown /colony subcommand: dance");
    assert_eq!(err(router.execute("/colony zone")), "Usage: /colony zone <mark1|mark2|create|clear> ...");
}
