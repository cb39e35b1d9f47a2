//! The [`Tickable`] trait implemented by every steppable engine.

use crate::id::TickId;
use crate::log::EventLog;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TickOutcome {
    /// The tick ran and the engine can keep going.
    Advanced,
    /// The tick ran and every entity has reached a terminal state
    /// (e.g. all processes terminated). Further ticks are no-ops that
    /// still advance the clock.
    Completed,
    /// The engine is frozen in a detected deadlock and made no
    /// transitions. Only an explicit recovery or reset unfreezes it.
    Deadlocked,
}

impl TickOutcome {
    /// Whether a driver should keep ticking automatically.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Advanced)
    }
}

/// A discrete-time simulation engine.
///
/// # Contract
///
/// - [`tick()`](Tickable::tick) processes the whole entity set atomically:
///   callers never observe a partially-updated tick.
/// - [`snapshot()`](Tickable::snapshot) returns an owned copy; mutating the
///   engine afterwards does not affect snapshots already taken.
/// - Each tick completes in time bounded by the entity count.
pub trait Tickable {
    /// Owned, read-only view of engine state.
    type Snapshot: Clone;

    /// Advance one time unit.
    fn tick(&mut self) -> TickOutcome;

    /// The next tick to be processed (0 before the first tick).
    fn current_tick(&self) -> TickId;

    /// Copy out the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// The engine's bounded event log.
    fn events(&self) -> &EventLog;

    /// Rebuild state from the engine's original configuration.
    fn reset(&mut self);
}
