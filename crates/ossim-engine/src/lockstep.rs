//! Lockstep (caller-driven) simulation.
//!
//! [`LockstepSimulation`] runs ticks on the caller's thread: each
//! [`step()`](LockstepSimulation::step) is exactly one tick, and
//! [`run(n)`](LockstepSimulation::run) stops early once the engine
//! completes or deadlocks. No background threads are involved.

use tracing::{debug, info};

use ossim_core::{ConfigError, TickId, TickOutcome, Tickable};

use crate::config::SimulationConfig;
use crate::result::SimulationResult;
use crate::simulation::{Simulation, SimulationSnapshot};

// Compile-time assertion: LockstepSimulation can move to another thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<LockstepSimulation>();
    }
};

/// Outcome of [`LockstepSimulation::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Ticks actually executed.
    pub ticks: u64,
    /// Outcome of the last executed tick.
    pub outcome: TickOutcome,
}

/// Single-threaded driver.
#[derive(Debug)]
pub struct LockstepSimulation {
    sim: Simulation,
    last_outcome: TickOutcome,
}

impl LockstepSimulation {
    /// Validate `config` and build a ready-to-step simulation.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            sim: Simulation::new(config)?,
            last_outcome: TickOutcome::Advanced,
        })
    }

    /// Execute one tick.
    pub fn step(&mut self) -> TickOutcome {
        self.last_outcome = self.sim.tick();
        self.last_outcome
    }

    /// Execute up to `ticks` ticks, stopping after the first one that
    /// does not return [`TickOutcome::Advanced`].
    pub fn run(&mut self, ticks: u64) -> RunReport {
        let mut executed = 0;
        while executed < ticks {
            executed += 1;
            if !self.step().is_running() {
                break;
            }
        }
        debug!(executed, outcome = ?self.last_outcome, "lockstep run");
        RunReport {
            ticks: executed,
            outcome: self.last_outcome,
        }
    }

    /// Rebuild from the current configuration and seed.
    pub fn reset(&mut self) {
        self.sim.reset();
        self.last_outcome = TickOutcome::Advanced;
        info!(kind = %self.sim.kind(), "lockstep simulation reset");
    }

    /// Replace the configuration. On error the running simulation is left
    /// untouched.
    pub fn reconfigure(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        self.sim = Simulation::new(config)?;
        self.last_outcome = TickOutcome::Advanced;
        Ok(())
    }

    /// Break a detected deadlock.
    pub fn recover(&mut self) -> bool {
        let recovered = self.sim.recover();
        if recovered {
            self.last_outcome = TickOutcome::Advanced;
        }
        recovered
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.sim.snapshot()
    }

    /// Next tick to be processed.
    pub fn current_tick(&self) -> TickId {
        self.sim.current_tick()
    }

    /// Outcome of the most recent tick; `Advanced` before the first.
    pub fn last_outcome(&self) -> TickOutcome {
        self.last_outcome
    }

    /// Summary of the run so far.
    pub fn result(&self) -> SimulationResult {
        self.sim.result(self.last_outcome)
    }

    /// The wrapped simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }
}
