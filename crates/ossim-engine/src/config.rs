//! Simulation selection and driver configuration.

use std::fmt;

use ossim_core::ConfigError;
use ossim_sched::SchedulerConfig;
use ossim_sync::{MutexConfig, PhilosophersConfig, ReadersWritersConfig, SemaphoreConfig};

// ── SimulationKind ─────────────────────────────────────────────────

/// Which engine a [`SimulationConfig`] builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimulationKind {
    /// SRTF process lifecycle.
    Cpu,
    /// Mutex contention.
    Mutex,
    /// Bounded-buffer semaphores.
    Semaphore,
    /// Readers-writers.
    ReadersWriters,
    /// Dining philosophers.
    Philosophers,
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "cpu",
            Self::Mutex => "mutex",
            Self::Semaphore => "semaphore",
            Self::ReadersWriters => "readers-writers",
            Self::Philosophers => "dining-philosophers",
        })
    }
}

// ── SimulationConfig ───────────────────────────────────────────────

/// Engine selection plus that engine's configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimulationConfig {
    /// SRTF process lifecycle.
    Cpu(SchedulerConfig),
    /// Mutex contention.
    Mutex(MutexConfig),
    /// Bounded-buffer semaphores.
    Semaphore(SemaphoreConfig),
    /// Readers-writers.
    ReadersWriters(ReadersWritersConfig),
    /// Dining philosophers.
    Philosophers(PhilosophersConfig),
}

impl SimulationConfig {
    /// The engine this config builds.
    pub fn kind(&self) -> SimulationKind {
        match self {
            Self::Cpu(_) => SimulationKind::Cpu,
            Self::Mutex(_) => SimulationKind::Mutex,
            Self::Semaphore(_) => SimulationKind::Semaphore,
            Self::ReadersWriters(_) => SimulationKind::ReadersWriters,
            Self::Philosophers(_) => SimulationKind::Philosophers,
        }
    }

    /// Default configuration for `kind`.
    pub fn default_for(kind: SimulationKind) -> Self {
        match kind {
            SimulationKind::Cpu => Self::Cpu(SchedulerConfig::default()),
            SimulationKind::Mutex => Self::Mutex(MutexConfig::default()),
            SimulationKind::Semaphore => Self::Semaphore(SemaphoreConfig::default()),
            SimulationKind::ReadersWriters => {
                Self::ReadersWriters(ReadersWritersConfig::default())
            }
            SimulationKind::Philosophers => Self::Philosophers(PhilosophersConfig::default()),
        }
    }

    /// Validate the wrapped configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Cpu(c) => c.validate(),
            Self::Mutex(c) => c.validate(),
            Self::Semaphore(c) => c.validate(),
            Self::ReadersWriters(c) => c.validate(),
            Self::Philosophers(c) => c.validate(),
        }
    }
}

// ── DriverConfig ───────────────────────────────────────────────────

/// Configuration for [`RealtimeSimulation`](crate::RealtimeSimulation).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    /// Ticks per second while running. Default: 10.
    pub tick_rate_hz: f64,
    /// Capacity of the command channel. Default: 64.
    pub command_capacity: usize,
    /// Whether the tick thread starts running immediately. Default: false.
    pub autostart: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 10.0,
            command_capacity: 64,
            autostart: false,
        }
    }
}

impl DriverConfig {
    /// Check the tick rate and channel capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidTickRate {
                value: self.tick_rate_hz,
            });
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "command_capacity",
            });
        }
        Ok(())
    }
}
