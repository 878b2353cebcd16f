//! Human-readable colony reports for the command surface.

use crate::{
    raid_subsystem::{self, damage_multiplier, health_multiplier},
    state::ColonyState,
    structure_subsystem,
    task_broker::TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryMode {
    #[default]
    Brief,
    Full,
    Off,
}

impl TelemetryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryMode::Brief => "BRIEF",
            TelemetryMode::Full  => "FULL",
            TelemetryMode::Off   => "OFF",
        }
    }

    /// Accepts `brief`, `--full`, `OFF`, ...
    pub fn parse(raw: &str) -> Option<TelemetryMode> {
        match raw.trim().trim_start_matches("--").to_ascii_uppercase().as_str() {
            "BRIEF" => Some(TelemetryMode::Brief),
            "FULL"  => Some(TelemetryMode::Full),
            "OFF"   => Some(TelemetryMode::Off),
            _ => None,
        }
    }
}

const OFF_MESSAGE: &str = "Telemetry is off.";

pub fn status_report(state: &ColonyState, mode: TelemetryMode) -> String {
    match mode {
        TelemetryMode::Off => OFF_MESSAGE.to_string(),
        TelemetryMode::Brief => format!(
            "status t={}s pop={}/{} hotspots={} tasks={} raidEnemies={} policy={}",
            state.world_time_sec,
            state.population(),
            state.population_cap,
            state.hotspots.len(),
            state.tasks.len(),
            state.raid.active_enemies,
            state.active_policy.as_str(),
        ),
        TelemetryMode::Full => {
            let mut out = String::from("status\n");
            let _ = writeln!(out, " timeSec={}", state.world_time_sec);
            let _ = writeln!(out, " population={}/{}", state.population(), state.population_cap);
            let _ = writeln!(out, " policy={}", state.active_policy.as_str());
            let _ = writeln!(out, " stage={:?}", structure_subsystem::current_stage(state));
            let _ = writeln!(out, " hotspots={}", state.hotspots.len());
            let _ = writeln!(out, " tasks={}", state.tasks.len());
            let _ = writeln!(out, " raid.activeEnemies={}", state.raid.active_enemies);
            let _ = writeln!(out, " raid.nextRaidAtSec={}", state.raid.next_raid_at_sec);
            let stock: Vec<String> = state
                .stock
                .iter()
                .map(|(r, qty)| format!("{}={qty}", r.item_id()))
                .collect();
            let _ = write!(out, " stock=[{}]", stock.join(", "));
            out
        }
    }
}

pub fn tasks_report(state: &ColonyState, mode: TelemetryMode) -> String {
    if mode == TelemetryMode::Off {
        return OFF_MESSAGE.to_string();
    }
    let running = state.tasks.iter().filter(|t| t.status == TaskStatus::Running).count();
    let mut out = format!("tasks total={} running={running}", state.tasks.len());
    if mode == TelemetryMode::Full {
        for task in &state.tasks {
            let _ = write!(
                out,
                "\n {} type={} status={:?} priority={:.2} effective={:.2} emergency={} holder={}",
                task.id,
                task.task_type.as_str(),
                task.status,
                task.priority,
                state.effective_priority(task),
                task.emergency,
                task.reserved_by.as_deref().unwrap_or("-"),
            );
        }
    }
    out
}

pub fn hotspots_report(state: &ColonyState, mode: TelemetryMode) -> String {
    if mode == TelemetryMode::Off {
        return OFF_MESSAGE.to_string();
    }
    let harvesting = state.hotspots.iter().filter(|h| !h.is_restored()).count();
    let mut out = format!("hotspots total={} harvesting={harvesting}", state.hotspots.len());
    if mode == TelemetryMode::Full {
        for h in &state.hotspots {
            let _ = write!(
                out,
                "\n {} family={} tier={} capacity={}/{} degradation={:.2} resetAt={}",
                h.id,
                h.family.as_str(),
                h.tier,
                h.capacity_now,
                h.capacity_max,
                h.degradation,
                h.reset_at_sec.map_or_else(|| "-".to_string(), |t| t.to_string()),
            );
        }
    }
    out
}

pub fn raid_report(state: &ColonyState, mode: TelemetryMode) -> String {
    if mode == TelemetryMode::Off {
        return OFF_MESSAGE.to_string();
    }
    let raid = &state.raid;
    let mut out = format!(
        "raid threat={} activeEnemies={} nextRaidAt={}s",
        raid.threat_score, raid.active_enemies, raid.next_raid_at_sec,
    );
    if mode == TelemetryMode::Full {
        let _ = write!(
            out,
            "\n current={} tier={} health=x{:.2} damage=x{:.2} lastRaidAt={}s threatAtLastRaid={} survived={}",
            raid_subsystem::current_raid_id(state),
            raid.tier,
            health_multiplier(raid.tier),
            damage_multiplier(raid.tier),
            raid.last_raid_at_sec,
            raid.threat_at_last_raid,
            raid.raids_survived,
        );
    }
    out
}
