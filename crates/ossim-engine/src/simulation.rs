//! One type over every tick-driven engine.

use tracing::info;

use ossim_core::{ConfigError, EventLog, LogEntry, TickId, TickOutcome, Tickable};
use ossim_sched::{CpuScheduler, CpuSnapshot};
use ossim_sync::{
    MutexSim, MutexSnapshot, PhilosophersSim, PhilosophersSnapshot, ReadersWritersSim,
    RwSnapshot, SemaphoreSim, SemaphoreSnapshot, SyncMetrics, SyncMode, SyncSnapshot,
};

use crate::config::{SimulationConfig, SimulationKind};
use crate::result::{MetricsSummary, SimulationResult};

/// Apply the same expression to whichever engine `$sim` holds.
macro_rules! dispatch {
    ($sim:expr, $engine:ident => $body:expr) => {
        match $sim {
            Simulation::Cpu($engine) => $body,
            Simulation::Mutex($engine) => $body,
            Simulation::Semaphore($engine) => $body,
            Simulation::ReadersWriters($engine) => $body,
            Simulation::Philosophers($engine) => $body,
        }
    };
}

/// A running simulation of any kind.
#[derive(Debug)]
pub enum Simulation {
    /// SRTF process lifecycle.
    Cpu(CpuScheduler),
    /// Mutex contention.
    Mutex(MutexSim),
    /// Bounded-buffer semaphores.
    Semaphore(SemaphoreSim),
    /// Readers-writers.
    ReadersWriters(ReadersWritersSim),
    /// Dining philosophers.
    Philosophers(PhilosophersSim),
}

/// Owned view of a [`Simulation`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimulationSnapshot {
    /// SRTF process lifecycle.
    Cpu(CpuSnapshot),
    /// Mutex contention.
    Mutex(SyncSnapshot<MutexSnapshot>),
    /// Bounded-buffer semaphores.
    Semaphore(SyncSnapshot<SemaphoreSnapshot>),
    /// Readers-writers.
    ReadersWriters(SyncSnapshot<RwSnapshot>),
    /// Dining philosophers.
    Philosophers(SyncSnapshot<PhilosophersSnapshot>),
}

impl SimulationSnapshot {
    /// Next tick to be processed.
    pub fn tick(&self) -> TickId {
        match self {
            Self::Cpu(s) => s.tick,
            Self::Mutex(s) => s.tick,
            Self::Semaphore(s) => s.tick,
            Self::ReadersWriters(s) => s.tick,
            Self::Philosophers(s) => s.tick,
        }
    }

    /// Retained event log, oldest first.
    pub fn log(&self) -> &[LogEntry] {
        match self {
            Self::Cpu(s) => &s.log,
            Self::Mutex(s) => &s.log,
            Self::Semaphore(s) => &s.log,
            Self::ReadersWriters(s) => &s.log,
            Self::Philosophers(s) => &s.log,
        }
    }

    /// Whether a sync engine is frozen by a detected deadlock.
    pub fn halted(&self) -> bool {
        match self {
            Self::Cpu(_) => false,
            Self::Mutex(s) => s.halted,
            Self::Semaphore(s) => s.halted,
            Self::ReadersWriters(s) => s.halted,
            Self::Philosophers(s) => s.halted,
        }
    }
}

impl Simulation {
    /// Validate `config` and build the engine it names.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let kind = config.kind();
        let sim = match config {
            SimulationConfig::Cpu(c) => Self::Cpu(CpuScheduler::new(c)?),
            SimulationConfig::Mutex(c) => Self::Mutex(MutexSim::new(c)?),
            SimulationConfig::Semaphore(c) => Self::Semaphore(SemaphoreSim::new(c)?),
            SimulationConfig::ReadersWriters(c) => Self::ReadersWriters(ReadersWritersSim::new(c)?),
            SimulationConfig::Philosophers(c) => Self::Philosophers(PhilosophersSim::new(c)?),
        };
        info!(%kind, "simulation built");
        Ok(sim)
    }

    /// Which engine this is.
    pub fn kind(&self) -> SimulationKind {
        match self {
            Self::Cpu(_) => SimulationKind::Cpu,
            Self::Mutex(_) => SimulationKind::Mutex,
            Self::Semaphore(_) => SimulationKind::Semaphore,
            Self::ReadersWriters(_) => SimulationKind::ReadersWriters,
            Self::Philosophers(_) => SimulationKind::Philosophers,
        }
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> SimulationConfig {
        match self {
            Self::Cpu(e) => SimulationConfig::Cpu(e.config().clone()),
            Self::Mutex(e) => SimulationConfig::Mutex(e.mode().config().clone()),
            Self::Semaphore(e) => SimulationConfig::Semaphore(e.mode().config().clone()),
            Self::ReadersWriters(e) => SimulationConfig::ReadersWriters(e.mode().config().clone()),
            Self::Philosophers(e) => SimulationConfig::Philosophers(e.mode().config().clone()),
        }
    }

    /// Break a detected deadlock. Returns `false` if the engine is not
    /// halted or has no recovery action.
    pub fn recover(&mut self) -> bool {
        match self {
            Self::Cpu(_) => false,
            Self::Mutex(e) => e.recover(),
            Self::Semaphore(e) => e.recover(),
            Self::ReadersWriters(e) => e.recover(),
            Self::Philosophers(e) => e.recover(),
        }
    }

    /// Engine-specific metrics.
    pub fn metrics(&self) -> MetricsSummary {
        let sync = |m: &SyncMetrics| MetricsSummary::Sync(m.clone());
        match self {
            Self::Cpu(e) => MetricsSummary::Scheduling {
                metrics: e.metrics(),
                counters: e.counters(),
            },
            Self::Mutex(e) => sync(e.metrics()),
            Self::Semaphore(e) => sync(e.metrics()),
            Self::ReadersWriters(e) => sync(e.metrics()),
            Self::Philosophers(e) => sync(e.metrics()),
        }
    }

    /// Summarize the run so far. `last_outcome` is what the most recent
    /// tick returned.
    pub fn result(&self, last_outcome: TickOutcome) -> SimulationResult {
        SimulationResult {
            kind: self.kind(),
            config: self.config(),
            ticks: self.current_tick().0,
            outcome: last_outcome,
            metrics: self.metrics(),
            final_snapshot: self.snapshot(),
        }
    }
}

impl Tickable for Simulation {
    type Snapshot = SimulationSnapshot;

    fn tick(&mut self) -> TickOutcome {
        dispatch!(self, e => e.tick())
    }

    fn current_tick(&self) -> TickId {
        dispatch!(self, e => e.current_tick())
    }

    fn snapshot(&self) -> SimulationSnapshot {
        match self {
            Self::Cpu(e) => SimulationSnapshot::Cpu(e.snapshot()),
            Self::Mutex(e) => SimulationSnapshot::Mutex(e.snapshot()),
            Self::Semaphore(e) => SimulationSnapshot::Semaphore(e.snapshot()),
            Self::ReadersWriters(e) => SimulationSnapshot::ReadersWriters(e.snapshot()),
            Self::Philosophers(e) => SimulationSnapshot::Philosophers(e.snapshot()),
        }
    }

    fn events(&self) -> &EventLog {
        dispatch!(self, e => e.events())
    }

    fn reset(&mut self) {
        dispatch!(self, e => e.reset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossim_sync::{ForkPolicy, PhilosophersConfig};

    #[test]
    fn builds_every_kind() {
        for kind in [
            SimulationKind::Cpu,
            SimulationKind::Mutex,
            SimulationKind::Semaphore,
            SimulationKind::ReadersWriters,
            SimulationKind::Philosophers,
        ] {
            let mut sim = Simulation::new(SimulationConfig::default_for(kind)).unwrap();
            assert_eq!(sim.kind(), kind);
            assert_eq!(sim.config(), SimulationConfig::default_for(kind));
            sim.tick();
            assert_eq!(sim.current_tick(), TickId(1));
            assert_eq!(sim.snapshot().tick(), TickId(1));
            sim.reset();
            assert_eq!(sim.current_tick(), TickId(0));
        }
    }

    #[test]
    fn deadlock_surfaces_through_the_wrapper() {
        let mut sim = Simulation::new(SimulationConfig::Philosophers(PhilosophersConfig {
            think_time: (1, 1),
            policy: ForkPolicy::Naive,
            ..PhilosophersConfig::default()
        }))
        .unwrap();
        sim.tick();
        assert_eq!(sim.tick(), TickOutcome::Deadlocked);
        assert!(sim.snapshot().halted());
        let result = sim.result(TickOutcome::Deadlocked);
        assert!(matches!(result.metrics, MetricsSummary::Sync(ref m) if m.deadlocks == 1));
        assert!(sim.recover());
        assert!(!sim.snapshot().halted());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = SimulationConfig::Philosophers(PhilosophersConfig {
            philosophers: 1,
            ..PhilosophersConfig::default()
        });
        assert!(Simulation::new(bad).is_err());
    }
}
