//! Strongly-typed identifiers and the simulation [`Clock`].

use std::fmt;

/// Identifies a simulated process.
///
/// Process IDs are assigned sequentially by the owning registry, so the
/// numeric order doubles as creation order. Engines break every scheduling
/// tie on this ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a resource type in a resource-allocation graph or a
/// Banker's matrix column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl From<u32> for ResourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a thread inside a synchronization simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented each time a simulation advances one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// The discrete simulation clock.
///
/// Starts at tick 0 and only moves forward, one unit per [`advance`].
/// Engines read [`now`] while processing a tick and advance once the
/// whole entity set has been updated.
///
/// [`advance`]: Clock::advance
/// [`now`]: Clock::now
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clock {
    now: TickId,
}

impl Clock {
    /// A clock reading tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tick currently being processed.
    pub fn now(&self) -> TickId {
        self.now
    }

    /// Advance by one tick and return the new reading.
    pub fn advance(&mut self) -> TickId {
        self.now = TickId(self.now.0 + 1);
        self.now
    }

    /// Rewind to tick 0. Only used by full resets.
    pub fn reset(&mut self) {
        self.now = TickId(0);
    }
}
