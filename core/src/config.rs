//! Colony configuration: tick rate, placement limits, save cadence
//! and raid pacing.
//!
//! Loaded once at startup from a JSON file. Every section and every field
//! has a default, so a partial file only overrides what it names.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColonyConfig {
    pub schema_version: u32,
    pub sim:            SimSection,
    pub limits:         LimitsConfig,
    pub save:           SaveConfig,
    pub threat:         ThreatConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimSection {
    pub tick_hz: u32,
    /// Master seed for generated ids.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitsConfig {
    pub max_citizens: u32,
    pub max_hotspots_per_family: u32,
    pub hotspot_per_zone_cap: u32,
    /// Minimum distance between two hotspots, in world units.
    pub hotspot_spacing: f64,
    /// Protection window granted to a citizen after it is handed an
    /// emergency task through preemption.
    pub preempt_lock_seconds: u64,
    /// Path failures tolerated before a task is quarantined.
    pub path_retries: u32,
    pub quarantine_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveConfig {
    /// 0 disables autosave.
    pub autosave_seconds: u64,
    pub backup_rotations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatConfig {
    pub grace_seconds: u64,
    pub base_interval_seconds: u64,
    pub trigger_cooldown_seconds: u64,
    /// Threat growth since the last raid that triggers an early raid.
    pub trigger_delta: u32,
    pub max_active_enemies: u32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            sim:            SimSection::default(),
            limits:         LimitsConfig::default(),
            save:           SaveConfig::default(),
            threat:         ThreatConfig::default(),
        }
    }
}

impl Default for SimSection {
    fn default() -> Self {
        Self { tick_hz: 5, seed: 0x00C0_10A1 }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_citizens: 5,
            max_hotspots_per_family: 1,
            hotspot_per_zone_cap: 2,
            hotspot_spacing: 12.0,
            preempt_lock_seconds: 10,
            path_retries: 2,
            quarantine_seconds: 60,
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { autosave_seconds: 300, backup_rotations: 5 }
    }
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            grace_seconds: 30 * 60,
            base_interval_seconds: 15 * 60,
            trigger_cooldown_seconds: 8 * 60,
            trigger_delta: 12,
            max_active_enemies: 1,
        }
    }
}

impl ColonyConfig {
    /// Load from a JSON file.
    /// In tests, use ColonyConfig::default() and override fields.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: ColonyConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid colony config in {}", path.display()))?;
        log::debug!("Loaded colony config from {}", path.display());
        Ok(config)
    }

    /// Write the default config to `path` unless a file already exists there.
    pub fn write_default(path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&ColonyConfig::default())?;
        std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(())
    }
}
