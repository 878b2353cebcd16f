//! Simulation clock: tick counter, tick rate and pause flag.

use crate::types::{Tick, WorldSec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    pub tick_hz:      u32,
    pub paused:       bool,
}

impl SimClock {
    pub fn new(tick_hz: u32) -> Self {
        Self {
            current_tick: 0,
            tick_hz: tick_hz.max(1),
            paused: false,
        }
    }

    /// Advance one tick. Returns the new tick number.
    /// Panics if called while paused; callers check first.
    pub fn advance(&mut self) -> Tick {
        assert!(!self.paused, "advance() called on paused clock");
        self.current_tick += 1;
        self.current_tick
    }

    /// Whole seconds of world time elapsed at the current tick.
    pub fn world_time_sec(&self) -> WorldSec {
        self.current_tick / Tick::from(self.tick_hz)
    }

    /// Re-align the tick counter with a world time restored from a save.
    pub fn sync_to(&mut self, world_time_sec: WorldSec) {
        self.current_tick = world_time_sec.saturating_mul(Tick::from(self.tick_hz));
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}
