//! SQLite telemetry store.
//!
//! RULE: Only store.rs talks to the database.
//! The engine hands it finished EventLogEntry rows; nothing else runs SQL.
//! The store is an observer: simulation state is never read back from it.

use crate::{
    error::SimResult,
    event::EventLogEntry,
    types::Tick,
};
use rusqlite::{params, Connection, Row};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the telemetry database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_event_log.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Register a run. Re-registering an existing run id is a no-op.
    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, version, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, world_time_sec, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.world_time_sec as i64,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, world_time_sec, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, tick as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn events_of_type(&self, run_id: &str, event_type: &str) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, world_time_sec, event_type, payload
             FROM event_log WHERE run_id = ?1 AND event_type = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, event_type], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str) -> SimResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<EventLogEntry> {
    Ok(EventLogEntry {
        id:             Some(row.get(0)?),
        run_id:         row.get(1)?,
        tick:           row.get::<_, i64>(2)? as u64,
        world_time_sec: row.get::<_, i64>(3)? as u64,
        event_type:     row.get(4)?,
        payload:        row.get(5)?,
    })
}
