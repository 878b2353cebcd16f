//! Shared primitive types used across the entire colony simulation.

/// An engine tick. `tick_hz` ticks make one second of world time.
pub type Tick = u64;

/// World time in whole seconds. Owned by the simulation, never wall-clock.
pub type WorldSec = u64;

/// A stable, unique identifier for any entity in the colony.
pub type EntityId = String;

/// Identifier of one engine session, used to partition the event log.
pub type RunId = String;
