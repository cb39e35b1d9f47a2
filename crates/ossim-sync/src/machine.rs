//! Generic tick engine shared by every synchronization mode.
//!
//! [`SyncEngine`] owns the clock, event log, metrics, random source, and
//! the deadlock halt flag. A [`SyncMode`] owns its threads and resources
//! and supplies only the per-tick transition rules.

use std::fmt;

use tracing::{debug, info};

use ossim_core::{
    Clock, ConfigError, EventLog, LogEntry, RandomSource, SeededRandom, TickId, TickOutcome,
    Tickable,
};

use crate::config::ModeConfig;
use crate::metrics::SyncMetrics;

/// Mutable view handed to a mode for one tick.
pub struct TickContext<'a> {
    /// The tick being processed.
    pub tick: TickId,
    /// Randomness for probabilistic transitions.
    pub rng: &'a mut dyn RandomSource,
    /// Engine metrics.
    pub metrics: &'a mut SyncMetrics,
    log: &'a mut EventLog,
}

impl TickContext<'_> {
    /// Append an event-log entry stamped with the current tick.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(tick = self.tick.0, %message, "sync event");
        self.log.push(self.tick, message);
    }
}

/// Transition rules for one synchronization primitive.
pub trait SyncMode: Sized + Send {
    /// Validated configuration.
    type Config: ModeConfig;
    /// Owned view of threads and resources.
    type Snapshot: Clone + fmt::Debug + PartialEq;

    /// Short name for logs.
    const NAME: &'static str;

    /// Fresh state for `config`.
    fn build(config: &Self::Config, rng: &mut dyn RandomSource) -> Self;

    /// Configuration this state was built from.
    fn config(&self) -> &Self::Config;

    /// Apply one tick of transitions.
    ///
    /// Returns [`TickOutcome::Deadlocked`] when the mode detects a state
    /// from which no thread can progress; the engine then freezes.
    fn step(&mut self, ctx: &mut TickContext<'_>) -> TickOutcome;

    /// Owned view of the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Break a detected deadlock. Returns `false` if the mode has no
    /// recovery action.
    fn recover(&mut self, _ctx: &mut TickContext<'_>) -> bool {
        false
    }
}

/// Snapshot of a [`SyncEngine`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncSnapshot<S> {
    /// Next tick to be processed.
    pub tick: TickId,
    /// Mode-specific threads and resources.
    pub state: S,
    /// Engine metrics.
    pub metrics: SyncMetrics,
    /// Whether transitions are frozen by a detected deadlock.
    pub halted: bool,
    /// Retained event log, oldest first.
    pub log: Vec<LogEntry>,
}

/// Tick engine for a synchronization mode.
pub struct SyncEngine<M: SyncMode, R: RandomSource = SeededRandom> {
    mode: M,
    clock: Clock,
    log: EventLog,
    metrics: SyncMetrics,
    rng: R,
    halted: bool,
}

impl<M: SyncMode> SyncEngine<M, SeededRandom> {
    /// Build an engine seeded from the config.
    pub fn new(config: M::Config) -> Result<Self, ConfigError> {
        let rng = SeededRandom::new(config.seed());
        Self::with_random(config, rng)
    }
}

impl<M: SyncMode, R: RandomSource> SyncEngine<M, R> {
    /// Build an engine drawing from `rng`.
    pub fn with_random(config: M::Config, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mode = M::build(&config, &mut rng);
        info!(mode = M::NAME, "sync engine created");
        Ok(Self {
            mode,
            clock: Clock::new(),
            log: EventLog::new(config.log_capacity()),
            metrics: SyncMetrics::default(),
            rng,
            halted: false,
        })
    }

    /// The mode's state.
    pub fn mode(&self) -> &M {
        &self.mode
    }

    /// Engine metrics.
    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Whether a detected deadlock has frozen the engine.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Run the mode's recovery action. Returns `true` if the engine was
    /// halted and is now running again.
    pub fn recover(&mut self) -> bool {
        if !self.halted {
            return false;
        }
        let mut ctx = TickContext {
            tick: self.clock.now(),
            rng: &mut self.rng,
            metrics: &mut self.metrics,
            log: &mut self.log,
        };
        if !self.mode.recover(&mut ctx) {
            return false;
        }
        self.halted = false;
        self.metrics.recoveries += 1;
        info!(mode = M::NAME, tick = self.clock.now().0, "recovered from deadlock");
        true
    }

    /// Replace the configuration, rebuilding all state from scratch.
    pub fn reconfigure(&mut self, config: M::Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.rng.restart();
        self.mode = M::build(&config, &mut self.rng);
        self.log = EventLog::new(config.log_capacity());
        self.clock.reset();
        self.metrics = SyncMetrics::default();
        self.halted = false;
        info!(mode = M::NAME, "sync engine reconfigured");
        Ok(())
    }
}

impl<M: SyncMode, R: RandomSource> Tickable for SyncEngine<M, R> {
    type Snapshot = SyncSnapshot<M::Snapshot>;

    fn tick(&mut self) -> TickOutcome {
        if self.halted {
            return TickOutcome::Deadlocked;
        }
        let tick = self.clock.now();
        let mut ctx = TickContext {
            tick,
            rng: &mut self.rng,
            metrics: &mut self.metrics,
            log: &mut self.log,
        };
        let outcome = self.mode.step(&mut ctx);
        if outcome == TickOutcome::Deadlocked {
            ctx.record("DEADLOCK: every thread is waiting on another");
            self.metrics.deadlocks += 1;
            self.halted = true;
            info!(mode = M::NAME, tick = tick.0, "deadlock detected, transitions frozen");
        }
        self.clock.advance();
        outcome
    }

    fn current_tick(&self) -> TickId {
        self.clock.now()
    }

    fn snapshot(&self) -> Self::Snapshot {
        SyncSnapshot {
            tick: self.clock.now(),
            state: self.mode.snapshot(),
            metrics: self.metrics.clone(),
            halted: self.halted,
            log: self.log.to_vec(),
        }
    }

    fn events(&self) -> &EventLog {
        &self.log
    }

    fn reset(&mut self) {
        self.rng.restart();
        let config = self.mode.config().clone();
        self.mode = M::build(&config, &mut self.rng);
        self.log.clear();
        self.clock.reset();
        self.metrics = SyncMetrics::default();
        self.halted = false;
        info!(mode = M::NAME, "sync engine reset");
    }
}

impl<M, R> fmt::Debug for SyncEngine<M, R>
where
    M: SyncMode + fmt::Debug,
    R: RandomSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("mode", &self.mode)
            .field("tick", &self.clock.now())
            .field("halted", &self.halted)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
