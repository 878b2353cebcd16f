//! Subsystem trait.
//!
//! RULE: Every per-tick system implements ColonySubsystem.
//! The engine calls update() on each system in a fixed order,
//! every unpaused tick. The order is documented in engine.rs.

use crate::{
    callbacks::ColonyCallbacks,
    error::SimResult,
    state::ColonyState,
};

/// The contract every per-tick system must fulfill.
pub trait ColonySubsystem {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per tick by the engine, after world time advanced.
    ///
    /// Must not perform I/O. Notifications go to `callbacks`.
    fn update(
        &self,
        state: &mut ColonyState,
        callbacks: &mut dyn ColonyCallbacks,
    ) -> SimResult<()>;
}
