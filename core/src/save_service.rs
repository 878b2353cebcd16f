//! Versioned save slots on disk.
//!
//! Layout of a save directory:
//!   active-save.json    the current save
//!   backup-1.json       the previous active save
//!   backup-N.json       older saves, N ≤ backup_rotations
//!
//! RULES:
//!   - A document whose schemaVersion differs from SCHEMA_VERSION is
//!     rejected before anything else in it is read.
//!   - A failed load leaves the caller's state untouched.
//!   - A save never mutates in-memory state. The new document lands via
//!     write-to-temp then rename, so a crash mid-write keeps the old one.
//!   - A failed write or rename removes the temp file.

use crate::{
    config::SaveConfig,
    error::{SimError, SimResult},
    snapshot::{ColonySave, SCHEMA_VERSION},
    state::ColonyState,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

pub const ACTIVE_SAVE_FILE: &str = "active-save.json";

pub struct ColonySaveService {
    backup_rotations: u32,
}

impl ColonySaveService {
    pub fn new(config: &SaveConfig) -> Self {
        Self { backup_rotations: config.backup_rotations }
    }

    pub fn active_path(save_dir: &Path) -> PathBuf {
        save_dir.join(ACTIVE_SAVE_FILE)
    }

    pub fn backup_path(save_dir: &Path, index: u32) -> PathBuf {
        save_dir.join(format!("backup-{index}.json"))
    }

    /// Write the full aggregate to the active slot. Returns its path.
    pub fn save(&self, state: &ColonyState, save_dir: &Path) -> SimResult<PathBuf> {
        let document = serde_json::to_string_pretty(&ColonySave::from_state(state))?;

        fs::create_dir_all(save_dir)?;
        let active = Self::active_path(save_dir);
        self.rotate_backups(save_dir)?;

        let tmp = save_dir.join(format!("{ACTIVE_SAVE_FILE}.tmp"));
        let written = Self::write_file(&tmp, &document)
            .and_then(|()| fs::rename(&tmp, &active).map_err(SimError::from));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::debug!("could not remove {}: {cleanup}", tmp.display());
            }
            return Err(e);
        }

        log::info!(
            "t={} saved colony to {} ({} bytes)",
            state.world_time_sec,
            active.display(),
            document.len(),
        );
        Ok(active)
    }

    fn write_file(path: &Path, document: &str) -> SimResult<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(document.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Read the active slot into a fresh aggregate.
    pub fn load(&self, save_dir: &Path) -> SimResult<ColonyState> {
        let active = Self::active_path(save_dir);
        if !active.exists() {
            return Err(SimError::SaveMissing(active));
        }
        let raw = fs::read_to_string(&active)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;

        let found = value
            .get("schemaVersion")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);
        if found != i64::from(SCHEMA_VERSION) {
            log::warn!(
                "refusing save {}: schemaVersion {found}, expected {SCHEMA_VERSION}; restore from a backup in {}",
                active.display(),
                save_dir.display(),
            );
            return Err(SimError::SchemaMismatch { expected: SCHEMA_VERSION, found });
        }

        let save: ColonySave = serde_json::from_value(value)?;
        let state = save.into_state()?;
        log::info!(
            "loaded colony from {} at t={} citizens={} hotspots={} tasks={}",
            active.display(),
            state.world_time_sec,
            state.citizens.len(),
            state.hotspots.len(),
            state.tasks.len(),
        );
        Ok(state)
    }

    /// Replace `state` with the saved aggregate, only if the load succeeds.
    pub fn load_into(&self, state: &mut ColonyState, save_dir: &Path) -> SimResult<()> {
        *state = self.load(save_dir)?;
        Ok(())
    }

    fn rotate_backups(&self, save_dir: &Path) -> SimResult<()> {
        for index in (1..=self.backup_rotations).rev() {
            let source = if index == 1 {
                Self::active_path(save_dir)
            } else {
                Self::backup_path(save_dir, index - 1)
            };
            if source.exists() {
                fs::copy(&source, Self::backup_path(save_dir, index))?;
            }
        }
        Ok(())
    }
}
