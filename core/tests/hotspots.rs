//! Hotspot placement rules and the harvest / degrade / reset cycle.

use colony_core::{
    callbacks::EventRecorder,
    citizen::{CitizenState, Role},
    config::LimitsConfig,
    content::ContentCatalog,
    error::SimError,
    event::SimEvent,
    hotspot_subsystem::{HotspotFamily, HotspotSubsystem},
    state::{ColonyState, Resource},
    zone_subsystem::{self, ZoneType},
};

fn system() -> HotspotSubsystem {
    HotspotSubsystem::new(&ContentCatalog::builtin(), &LimitsConfig::default())
}

/// One gatherer and a 100x100 HOTSPOT zone at the origin.
fn colony() -> ColonyState {
    let mut state = ColonyState::new();
    state.world_time_sec = 1_000;
    state.citizens.insert(CitizenState::new("citizen-1", Role::Gatherer)).unwrap();
    zone_subsystem::create_zone(&mut state, ZoneType::Hotspot, 0.0, 0.0, 100.0, 100.0).unwrap();
    state
}

#[test]
fn placement_outside_any_hotspot_zone_fails_without_mutation() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let before = state.clone();

    let result = system().place_hotspot(&mut state, HotspotFamily::Wood, 150.0, 10.0, &mut cb);

    assert!(matches!(result, Err(SimError::Placement { .. })));
    assert_eq!(state, before);
}

#[test]
fn zones_of_other_types_do_not_admit_hotspots() {
    let mut state = ColonyState::new();
    let mut cb = EventRecorder::new();
    zone_subsystem::create_zone(&mut state, ZoneType::Farm, 0.0, 0.0, 50.0, 50.0).unwrap();

    let result = system().place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb);
    assert!(matches!(result, Err(SimError::Placement { .. })));
}

#[test]
fn placed_hotspot_starts_restored_at_tier_one() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let hotspot = system()
        .place_hotspot(&mut state, HotspotFamily::Wood, 100.0, 100.0, &mut cb)
        .unwrap();

    assert!(hotspot.is_restored());
    assert_eq!(hotspot.tier, 1);
    assert_eq!(hotspot.capacity_max, 120);
    assert_eq!(hotspot.capacity_now, 120);
    assert_eq!(hotspot.degradation, 1.0);
    assert_eq!(hotspot.zone_id, "zone-1");
    assert!(state.hotspots.contains(&hotspot.id));
}

#[test]
fn placement_enforces_family_cap_spacing_and_zone_cap() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();

    system.place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb).unwrap();

    let same_family = system.place_hotspot(&mut state, HotspotFamily::Wood, 80.0, 80.0, &mut cb);
    assert!(matches!(same_family, Err(SimError::Placement { .. })));

    let too_close = system.place_hotspot(&mut state, HotspotFamily::Stone, 15.0, 10.0, &mut cb);
    assert!(matches!(too_close, Err(SimError::Placement { .. })));

    system.place_hotspot(&mut state, HotspotFamily::Stone, 50.0, 50.0, &mut cb).unwrap();
    let zone_full = system.place_hotspot(&mut state, HotspotFamily::Fiber, 90.0, 90.0, &mut cb);
    assert!(matches!(zone_full, Err(SimError::Placement { .. })));
    assert_eq!(state.hotspots.len(), 2);
}

#[test]
fn first_harvest_starts_the_cycle_and_deposits_stock() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();
    let wood_before = state.stock.get(Resource::Wood);

    let result = system.harvest(&mut state, &hotspot.id, "citizen-1", 30, &mut cb).unwrap();

    assert_eq!(result.quantity, 30);
    let after = state.hotspots.get(&hotspot.id).unwrap();
    assert_eq!(after.cycle_started_at_sec, Some(1_000));
    assert_eq!(after.reset_at_sec, Some(1_600));
    assert_eq!(after.capacity_now, 90);
    assert!(after.degradation < 1.0);
    assert_eq!(state.stock.get(Resource::Wood), wood_before + 30);
    assert!(matches!(cb.events()[0], SimEvent::HotspotCycleStarted { reset_at_sec: 1_600, .. }));
    assert!(matches!(cb.events()[1], SimEvent::HotspotHarvested { quantity: 30, .. }));
}

#[test]
fn degradation_never_rises_within_a_cycle() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Ore, 10.0, 10.0, &mut cb)
        .unwrap();

    let mut last = 1.0;
    for _ in 0..6 {
        system.harvest(&mut state, &hotspot.id, "citizen-1", 25, &mut cb).unwrap();
        let degradation = state.hotspots.get(&hotspot.id).unwrap().degradation;
        assert!(degradation <= last, "degradation rose from {last} to {degradation}");
        last = degradation;
    }
    assert!(last >= 0.4 - 1e-9);
}

#[test]
fn harvesting_an_exhausted_hotspot_yields_nothing() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Stone, 10.0, 10.0, &mut cb)
        .unwrap();

    let first = system.harvest(&mut state, &hotspot.id, "citizen-1", 500, &mut cb).unwrap();
    assert_eq!(first.quantity, 120);
    let second = system.harvest(&mut state, &hotspot.id, "citizen-1", 10, &mut cb).unwrap();
    assert_eq!(second.quantity, 0);
    assert_eq!(state.hotspots.get(&hotspot.id).unwrap().capacity_now, 0);
}

#[test]
fn harvest_with_unknown_ids_is_not_found() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();

    assert!(matches!(
        system.harvest(&mut state, "hotspot-99", "citizen-1", 5, &mut cb),
        Err(SimError::NotFound { kind: "hotspot", .. })
    ));
    assert!(matches!(
        system.harvest(&mut state, &hotspot.id, "citizen-99", 5, &mut cb),
        Err(SimError::NotFound { kind: "citizen", .. })
    ));
    assert!(state.hotspots.get(&hotspot.id).unwrap().is_restored());
}

#[test]
fn tick_restores_at_reset_time_and_is_idempotent() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();
    system.harvest(&mut state, &hotspot.id, "citizen-1", 60, &mut cb).unwrap();

    state.world_time_sec = 1_599;
    system.tick(&mut state, &mut cb);
    assert!(!state.hotspots.get(&hotspot.id).unwrap().is_restored());

    state.world_time_sec = 1_600;
    system.tick(&mut state, &mut cb);
    let restored = state.hotspots.get(&hotspot.id).unwrap().clone();
    assert!(restored.is_restored());
    assert_eq!(restored.capacity_now, restored.capacity_max);
    assert_eq!(restored.degradation, 1.0);

    let resets_before = cb
        .events()
        .iter()
        .filter(|e| matches!(e, SimEvent::HotspotReset { .. }))
        .count();
    system.tick(&mut state, &mut cb);
    let resets_after = cb
        .events()
        .iter()
        .filter(|e| matches!(e, SimEvent::HotspotReset { .. }))
        .count();
    assert_eq!(resets_before, 1);
    assert_eq!(resets_after, 1);
    assert_eq!(state.hotspots.get(&hotspot.id).unwrap(), &restored);
}

#[test]
fn upgrade_pays_from_stock_and_rescales_capacity() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Fiber, 10.0, 10.0, &mut cb)
        .unwrap();
    system.harvest(&mut state, &hotspot.id, "citizen-1", 100, &mut cb).unwrap();
    let wood = state.stock.get(Resource::Wood);

    let upgraded = system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb).unwrap();

    assert_eq!(upgraded.tier, 2);
    assert_eq!(upgraded.capacity_max, 180);
    // 20 left plus a fifth of the new maximum.
    assert_eq!(upgraded.capacity_now, 56);
    assert_eq!(state.stock.get(Resource::Wood), wood - 30);
    assert!(matches!(
        cb.events().last(),
        Some(SimEvent::HotspotUpgraded { from_tier: 1, to_tier: 2, .. })
    ));
}

/// An untouched hotspot stays RESTORED: full at the new maximum.
#[test]
fn upgrading_a_restored_hotspot_keeps_it_full() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();

    let upgraded = system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb).unwrap();

    assert!(upgraded.is_restored());
    assert_eq!(upgraded.capacity_max, 180);
    assert_eq!(upgraded.capacity_now, 180);
    assert_eq!(upgraded.degradation, 1.0);
}

#[test]
fn harvest_quality_is_bounded_by_tier() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();
    system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb).unwrap();

    let novice = system.harvest(&mut state, &hotspot.id, "citizen-1", 5, &mut cb).unwrap();
    assert_eq!(novice.quality, 2);

    state.citizens.get_mut("citizen-1").unwrap().grant_xp(Role::Gatherer, 2_700);
    let master = system.harvest(&mut state, &hotspot.id, "citizen-1", 5, &mut cb).unwrap();
    assert_eq!(master.quality, 3);
}

#[test]
fn upgrade_is_rejected_without_stock_and_at_max_tier() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let system = system();
    let hotspot = system
        .place_hotspot(&mut state, HotspotFamily::Wood, 10.0, 10.0, &mut cb)
        .unwrap();
    system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb).unwrap();

    // Tier 3 needs ore and crystal; the starting stock has none.
    let stock_before = state.stock.clone();
    let short = system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb);
    assert!(matches!(short, Err(SimError::Rejected(_))));
    assert_eq!(state.stock, stock_before);
    assert_eq!(state.hotspots.get(&hotspot.id).unwrap().tier, 2);

    state.stock.add(Resource::Ore, 20);
    state.stock.add(Resource::Crystal, 10);
    let top = system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb).unwrap();
    assert_eq!(top.tier, 3);
    assert_eq!(top.capacity_max, 260);

    state.stock.add(Resource::Ore, 100);
    state.stock.add(Resource::Crystal, 100);
    let maxed = system.upgrade_hotspot(&mut state, &hotspot.id, &mut cb);
    assert!(matches!(maxed, Err(SimError::Rejected(msg)) if msg == "Hotspot already at max tier"));
}

#[test]
fn upgraded_hotspot_resets_faster() {
    let system = system();
    assert_eq!(system.reset_seconds_for(HotspotFamily::Wood, 1).unwrap(), 600);
    assert_eq!(system.reset_seconds_for(HotspotFamily::Wood, 2).unwrap(), 480);
    assert_eq!(system.reset_seconds_for(HotspotFamily::Wood, 3).unwrap(), 360);
}

#[test]
fn removed_hotspot_is_gone() {
    let mut state = colony();
    let mut cb = EventRecorder::new();
    let hotspot = system()
        .place_hotspot(&mut state, HotspotFamily::Herbs, 10.0, 10.0, &mut cb)
        .unwrap();

    HotspotSubsystem::remove_hotspot(&mut state, &hotspot.id).unwrap();
    assert!(state.hotspots.is_empty());
    assert!(matches!(
        HotspotSubsystem::remove_hotspot(&mut state, &hotspot.id),
        Err(SimError::NotFound { .. })
    ));
}
