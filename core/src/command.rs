//! The `/colony ...` command surface.
//!
//! RULE: Commands are the only way a host changes the colony from outside
//! the tick loop. Every command yields a CommandResult; errors become
//! unsuccessful results, never panics.

use crate::{
    engine::ColonyEngine,
    error::{SimError, SimResult},
    hotspot_subsystem::HotspotFamily,
    state::PolicyId,
    structure_subsystem::BlueprintId,
    task_broker::TaskType,
    telemetry::{self, TelemetryMode},
    zone_subsystem::ZoneType,
};
use serde::{Deserialize, Serialize};

pub const NAMESPACE: &str = "/colony";

const MIN_PRIORITY_WEIGHT: f64 = 0.5;
const MAX_PRIORITY_WEIGHT: f64 = 2.0;

/// All host-issued commands, parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ColonyCommand {
    // ── Reports ───────────────────────────────────
    Status   { mode: Option<TelemetryMode> },
    Tasks    { mode: Option<TelemetryMode> },
    Hotspots { mode: Option<TelemetryMode> },
    Raid     { mode: Option<TelemetryMode> },

    // ── Clock and persistence ─────────────────────
    Pause,
    Resume,
    Save,

    // ── Economy ───────────────────────────────────
    SetPriority { task_type: TaskType, weight: f64 },
    SetPolicy   { policy: PolicyId },

    // ── World edits ───────────────────────────────
    PlaceBlueprint { blueprint: BlueprintId, x: f64, z: f64, rotation: i32 },
    PlaceHotspot   { family: HotspotFamily, x: f64, z: f64 },
    UpgradeHotspot { hotspot_id: String },
    ZoneMark       { second: bool, x: f64, z: f64 },
    ZoneCreate     { zone_type: ZoneType },
    ZoneClear      { zone_id: String },

    // ── Events and telemetry ──────────────────────
    StartCrisis  { crisis: String },
    EndCrisis    { crisis: String },
    SetTelemetry { mode: TelemetryMode },
}

const USAGE_PRIORITY: &str =
    "Usage: /colony priority set <build|farm|gather|haul|defend|repair> <0.50-2.00>";
const USAGE_POLICY: &str = "Usage: /colony policy set <Fortify|HarvestRush|Recovery>";
const USAGE_BUILD: &str = "Usage: /colony build place <TownCore|House|Stockpile|Watchtower|TrapPost|FarmShed|Workshop|Infirmary> <x> <z> <rotation>";
const USAGE_HOTSPOT: &str = "Usage: /colony hotspot <place|upgrade> ...";
const USAGE_HOTSPOT_PLACE: &str = "Usage: /colony hotspot place <family> <x> <z>";
const USAGE_HOTSPOT_UPGRADE: &str = "Usage: /colony hotspot upgrade <hotspotId>";
const USAGE_ZONE: &str = "Usage: /colony zone <mark1|mark2|create|clear> ...";
const USAGE_ZONE_MARK: &str = "Usage: /colony zone mark1 <x> <z> OR /colony zone mark2 <x> <z>";
const USAGE_ZONE_CREATE: &str = "Usage: /colony zone create <Home|Farm|Defense|Hotspot|Storage>";
const USAGE_ZONE_CLEAR: &str = "Usage: /colony zone clear <zoneId>";
const USAGE_CRISIS: &str = "Usage: /colony crisis <start|end> bandit_assault";
const USAGE_TELEMETRY: &str = "Usage: /colony telemetry <brief|full|off>";

impl ColonyCommand {
    /// Parse a normalized `/colony ...` line. The error is the message to
    /// show the player.
    pub fn parse(raw: &str) -> Result<ColonyCommand, String> {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let Some(&namespace) = parts.first() else {
            return Err("Empty command".to_string());
        };
        if !namespace.eq_ignore_ascii_case(NAMESPACE) {
            return Err("Unsupported namespace. Use /colony".to_string());
        }
        let Some(sub) = parts.get(1) else {
            return Ok(ColonyCommand::Status { mode: Some(TelemetryMode::Brief) });
        };
        let arg = |i: usize| parts.get(i).copied();

        match sub.to_ascii_lowercase().as_str() {
            "status"   => Ok(ColonyCommand::Status { mode: mode_arg(arg(2))? }),
            "tasks"    => Ok(ColonyCommand::Tasks { mode: mode_arg(arg(2))? }),
            "hotspots" => Ok(ColonyCommand::Hotspots { mode: mode_arg(arg(2))? }),
            "raid"     => Ok(ColonyCommand::Raid { mode: mode_arg(arg(2))? }),
            "pause"    => Ok(ColonyCommand::Pause),
            "resume"   => Ok(ColonyCommand::Resume),
            "save"     => Ok(ColonyCommand::Save),
            "priority" => {
                let (Some(set), Some(t), Some(w)) = (arg(2), arg(3), arg(4)) else {
                    return Err(USAGE_PRIORITY.to_string());
                };
                if !set.eq_ignore_ascii_case("set") {
                    return Err(USAGE_PRIORITY.to_string());
                }
                let task_type = TaskType::parse(t).ok_or_else(|| format!("Unknown task type: {t}"))?;
                let weight = number::<f64>(w)?;
                if !(MIN_PRIORITY_WEIGHT..=MAX_PRIORITY_WEIGHT).contains(&weight) {
                    return Err("Priority value must be between 0.50 and 2.00".to_string());
                }
                Ok(ColonyCommand::SetPriority { task_type, weight })
            }
            "policy" => {
                let (Some(set), Some(p)) = (arg(2), arg(3)) else {
                    return Err(USAGE_POLICY.to_string());
                };
                if !set.eq_ignore_ascii_case("set") {
                    return Err(USAGE_POLICY.to_string());
                }
                let policy = PolicyId::parse(p).ok_or_else(|| format!("Unknown policy: {p}"))?;
                Ok(ColonyCommand::SetPolicy { policy })
            }
            "build" => {
                let (Some(place), Some(bp), Some(x), Some(z), Some(rot)) =
                    (arg(2), arg(3), arg(4), arg(5), arg(6))
                else {
                    return Err(USAGE_BUILD.to_string());
                };
                if !place.eq_ignore_ascii_case("place") {
                    return Err(USAGE_BUILD.to_string());
                }
                let blueprint =
                    BlueprintId::parse(bp).ok_or_else(|| format!("Unknown blueprint: {bp}"))?;
                Ok(ColonyCommand::PlaceBlueprint {
                    blueprint,
                    x: number(x)?,
                    z: number(z)?,
                    rotation: number(rot)?,
                })
            }
            "hotspot" => {
                let Some(action) = arg(2) else {
                    return Err(USAGE_HOTSPOT.to_string());
                };
                match action.to_ascii_lowercase().as_str() {
                    "place" => {
                        let (Some(f), Some(x), Some(z)) = (arg(3), arg(4), arg(5)) else {
                            return Err(USAGE_HOTSPOT_PLACE.to_string());
                        };
                        let family = HotspotFamily::parse(f)
                            .ok_or_else(|| format!("Unknown hotspot family: {f}"))?;
                        Ok(ColonyCommand::PlaceHotspot { family, x: number(x)?, z: number(z)? })
                    }
                    "upgrade" => {
                        let Some(id) = arg(3) else {
                            return Err(USAGE_HOTSPOT_UPGRADE.to_string());
                        };
                        Ok(ColonyCommand::UpgradeHotspot { hotspot_id: id.to_string() })
                    }
                    other => Err(format!("Unknown hotspot action: {other}")),
                }
            }
            "zone" => {
                let Some(action) = arg(2) else {
                    return Err(USAGE_ZONE.to_string());
                };
                match action.to_ascii_lowercase().as_str() {
                    "mark1" | "mark2" => {
                        let (Some(x), Some(z)) = (arg(3), arg(4)) else {
                            return Err(USAGE_ZONE_MARK.to_string());
                        };
                        Ok(ColonyCommand::ZoneMark {
                            second: action.eq_ignore_ascii_case("mark2"),
                            x: number(x)?,
                            z: number(z)?,
                        })
                    }
                    "create" => {
                        let Some(t) = arg(3) else {
                            return Err(USAGE_ZONE_CREATE.to_string());
                        };
                        let zone_type =
                            ZoneType::parse(t).ok_or_else(|| format!("Unknown zone type: {t}"))?;
                        Ok(ColonyCommand::ZoneCreate { zone_type })
                    }
                    "clear" => {
                        let Some(id) = arg(3) else {
                            return Err(USAGE_ZONE_CLEAR.to_string());
                        };
                        Ok(ColonyCommand::ZoneClear { zone_id: id.to_string() })
                    }
                    other => Err(format!("Unknown zone action: {other}")),
                }
            }
            "crisis" => {
                let (Some(action), Some(kind)) = (arg(2), arg(3)) else {
                    return Err(USAGE_CRISIS.to_string());
                };
                let crisis = kind.to_ascii_lowercase();
                match action.to_ascii_lowercase().as_str() {
                    "start" => Ok(ColonyCommand::StartCrisis { crisis }),
                    "end" => Ok(ColonyCommand::EndCrisis { crisis }),
                    _ => Err(USAGE_CRISIS.to_string()),
                }
            }
            "telemetry" => {
                let Some(m) = arg(2) else {
                    return Err(USAGE_TELEMETRY.to_string());
                };
                let mode = TelemetryMode::parse(m)
                    .ok_or_else(|| format!("Unknown telemetry mode: {m}"))?;
                Ok(ColonyCommand::SetTelemetry { mode })
            }
            other => Err(format!("Unknown /colony subcommand: {other}")),
        }
    }
}

fn mode_arg(raw: Option<&str>) -> Result<Option<TelemetryMode>, String> {
    match raw {
        None => Ok(None),
        Some(m) => TelemetryMode::parse(m)
            .map(Some)
            .ok_or_else(|| format!("Unknown telemetry mode: {m}")),
    }
}

fn number<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("Invalid number: {raw}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

impl From<SimResult<String>> for CommandResult {
    fn from(result: SimResult<String>) -> Self {
        match result {
            Ok(message) => CommandResult::ok(message),
            Err(e) => CommandResult::error(e.to_string()),
        }
    }
}

/// Owns the engine and the zone corner marks between commands.
pub struct CommandRouter {
    engine: ColonyEngine,
    mark1:  Option<(f64, f64)>,
    mark2:  Option<(f64, f64)>,
}

impl CommandRouter {
    pub fn new(engine: ColonyEngine) -> Self {
        Self { engine, mark1: None, mark2: None }
    }

    pub fn engine(&self) -> &ColonyEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ColonyEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> ColonyEngine {
        self.engine
    }

    /// The single entry point for a raw command line.
    pub fn execute(&mut self, raw: &str) -> CommandResult {
        match ColonyCommand::parse(raw) {
            Ok(command) => self.apply(command),
            Err(message) => CommandResult::error(message),
        }
    }

    pub fn apply(&mut self, command: ColonyCommand) -> CommandResult {
        log::debug!("command {command:?}");
        let engine = &mut self.engine;
        match command {
            ColonyCommand::Status { mode } => {
                CommandResult::ok(telemetry::status_report(&engine.state, report_mode(mode)))
            }
            ColonyCommand::Tasks { mode } => {
                CommandResult::ok(telemetry::tasks_report(&engine.state, report_mode(mode)))
            }
            ColonyCommand::Hotspots { mode } => {
                CommandResult::ok(telemetry::hotspots_report(&engine.state, report_mode(mode)))
            }
            ColonyCommand::Raid { mode } => {
                CommandResult::ok(telemetry::raid_report(&engine.state, report_mode(mode)))
            }
            ColonyCommand::Pause => {
                engine.pause();
                CommandResult::ok("Simulation paused.")
            }
            ColonyCommand::Resume => {
                engine.resume();
                CommandResult::ok("Simulation resumed.")
            }
            ColonyCommand::Save => engine.save_now().map(|_| "Save completed.".to_string()).into(),
            ColonyCommand::SetPriority { task_type, weight } => engine
                .set_priority_weight(task_type, weight)
                .map(|_| format!("Priority updated: {}={weight:.2}", task_type.as_str()))
                .into(),
            ColonyCommand::SetPolicy { policy } => engine
                .set_policy(policy)
                .map(|_| format!("Policy updated: {}", policy.as_str()))
                .into(),
            ColonyCommand::PlaceBlueprint { blueprint, x, z, rotation } => engine
                .place_blueprint(blueprint, x, z, rotation)
                .map(|s| format!("Blueprint queued: {}", s.id))
                .into(),
            ColonyCommand::PlaceHotspot { family, x, z } => engine
                .place_hotspot(family, x, z)
                .map(|h| format!("Hotspot placed: {}", h.id))
                .into(),
            ColonyCommand::UpgradeHotspot { hotspot_id } => engine
                .upgrade_hotspot(&hotspot_id)
                .map(|h| format!("Hotspot upgraded: {} tier={}", h.id, h.tier))
                .into(),
            ColonyCommand::ZoneMark { second, x, z } => {
                if second {
                    self.mark2 = Some((x, z));
                    CommandResult::ok("mark2 set")
                } else {
                    self.mark1 = Some((x, z));
                    CommandResult::ok("mark1 set")
                }
            }
            ColonyCommand::ZoneCreate { zone_type } => {
                let (Some((x1, z1)), Some((x2, z2))) = (self.mark1, self.mark2) else {
                    return CommandResult::error("Set mark1 and mark2 first");
                };
                engine
                    .create_zone(zone_type, x1, z1, x2, z2)
                    .map(|zone| format!("Zone created: {} type={}", zone.id, zone.zone_type.as_str()))
                    .into()
            }
            ColonyCommand::ZoneClear { zone_id } => match engine.clear_zone(&zone_id) {
                Ok(zone) => CommandResult::ok(format!("Zone cleared: {}", zone.id)),
                Err(SimError::NotFound { .. }) => {
                    CommandResult::error(format!("Zone not found: {zone_id}"))
                }
                Err(e) => CommandResult::error(e.to_string()),
            },
            ColonyCommand::StartCrisis { crisis } => engine
                .start_crisis(&crisis)
                .map(|_| "Bandit assault crisis started.".to_string())
                .into(),
            ColonyCommand::EndCrisis { crisis } => match engine.end_crisis(&crisis) {
                Ok(true) => CommandResult::ok("Bandit assault crisis ended."),
                Ok(false) => CommandResult::error(format!("No active crisis: {crisis}")),
                Err(e) => CommandResult::error(e.to_string()),
            },
            ColonyCommand::SetTelemetry { mode } => {
                engine.set_telemetry_mode(mode);
                CommandResult::ok(format!("Telemetry mode set to {}", mode.as_str()))
            }
        }
    }
}

fn report_mode(mode: Option<TelemetryMode>) -> TelemetryMode {
    mode.unwrap_or(TelemetryMode::Brief)
}
