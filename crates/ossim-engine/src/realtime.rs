//! Realtime simulation on a background tick thread.
//!
//! # Architecture
//!
//! ```text
//! Caller                        Tick thread
//!   |                               |
//!   |--start()/pause()------------->| cmd_rx.recv_timeout(budget)
//!   |   [cmd_tx: bounded(N)]        | sim.tick()
//!   |--step()/reset()/recover()---->| publish snapshot
//!   |<--reply via bounded(1)--------|
//!   |                               |
//!   |--latest_snapshot()            |
//!   |   Mutex<Arc<Snapshot>> <------|
//!   |                               |
//!   |--shutdown()------------------>| break, return Simulation
//!   |<--JoinHandle::join------------|
//! ```
//!
//! The simulation auto-pauses when it completes or deadlocks; call
//! [`recover`](RealtimeSimulation::recover) and then
//! [`start`](RealtimeSimulation::start) to resume a deadlocked run.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, TrySendError};
use tracing::{info, warn};

use ossim_core::{TickOutcome, Tickable};

use crate::config::{DriverConfig, SimulationConfig};
use crate::error::DriverError;
use crate::simulation::{Simulation, SimulationSnapshot};
use crate::tick_thread::{Command, Shared, TickThreadState};

/// Simulation paced by a dedicated tick thread.
pub struct RealtimeSimulation {
    cmd_tx: Option<Sender<Command>>,
    shared: Arc<Shared>,
    tick_thread: Option<JoinHandle<Simulation>>,
    driver: DriverConfig,
}

impl RealtimeSimulation {
    /// Build the simulation and spawn its tick thread.
    ///
    /// The thread starts paused unless `driver.autostart` is set.
    pub fn new(config: SimulationConfig, driver: DriverConfig) -> Result<Self, DriverError> {
        driver.validate()?;
        let sim = Simulation::new(config)?;
        let kind = sim.kind();
        let shared = Arc::new(Shared::new(sim.snapshot()));
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(driver.command_capacity);

        let state = TickThreadState::new(
            sim,
            cmd_rx,
            Arc::clone(&shared),
            driver.tick_rate_hz,
            driver.autostart,
        );
        let tick_thread = thread::Builder::new()
            .name("ossim-tick".into())
            .spawn(move || state.run())
            .map_err(|e| DriverError::Spawn {
                reason: e.to_string(),
            })?;

        info!(%kind, tick_rate_hz = driver.tick_rate_hz, autostart = driver.autostart, "realtime simulation started");
        Ok(Self {
            cmd_tx: Some(cmd_tx),
            shared,
            tick_thread: Some(tick_thread),
            driver,
        })
    }

    fn send(&self, command: Command) -> Result<(), DriverError> {
        let cmd_tx = self.cmd_tx.as_ref().ok_or(DriverError::Shutdown)?;
        cmd_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::ChannelFull,
            TrySendError::Disconnected(_) => DriverError::Shutdown,
        })
    }

    /// Begin ticking at the configured rate.
    pub fn start(&self) -> Result<(), DriverError> {
        self.send(Command::Start)
    }

    /// Stop ticking; state is kept.
    pub fn pause(&self) -> Result<(), DriverError> {
        self.send(Command::Pause)
    }

    /// Execute exactly one tick and wait for its outcome.
    ///
    /// Works whether or not the thread is running.
    pub fn step(&self) -> Result<TickOutcome, DriverError> {
        let (reply, reply_rx) = crossbeam_channel::bounded(1);
        self.send(Command::Step { reply })?;
        reply_rx.recv().map_err(|_| DriverError::Shutdown)
    }

    /// Pause and rebuild from the current configuration and seed.
    pub fn reset(&self) -> Result<(), DriverError> {
        let (reply, reply_rx) = crossbeam_channel::bounded(1);
        self.send(Command::Reset { reply })?;
        reply_rx.recv().map_err(|_| DriverError::Shutdown)
    }

    /// Break a detected deadlock. Returns `false` when there was nothing
    /// to recover from.
    pub fn recover(&self) -> Result<bool, DriverError> {
        let (reply, reply_rx) = crossbeam_channel::bounded(1);
        self.send(Command::Recover { reply })?;
        reply_rx.recv().map_err(|_| DriverError::Shutdown)
    }

    /// Most recently published snapshot.
    pub fn latest_snapshot(&self) -> Arc<SimulationSnapshot> {
        self.shared.latest()
    }

    /// Whether the tick thread is currently ticking on its own.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Driver settings in effect.
    pub fn driver_config(&self) -> &DriverConfig {
        &self.driver
    }

    /// Stop the tick thread and hand back the simulation.
    ///
    /// Returns `None` on every call after the first, or if the tick
    /// thread panicked.
    pub fn shutdown(&mut self) -> Option<Simulation> {
        let cmd_tx = self.cmd_tx.take()?;
        // A full queue still drains: dropping the sender disconnects it.
        let _ = cmd_tx.try_send(Command::Shutdown);
        drop(cmd_tx);

        let handle = self.tick_thread.take()?;
        match handle.join() {
            Ok(sim) => {
                info!(kind = %sim.kind(), tick = sim.current_tick().0, "realtime simulation shut down");
                Some(sim)
            }
            Err(_) => {
                warn!("tick thread panicked");
                None
            }
        }
    }
}

impl Drop for RealtimeSimulation {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for RealtimeSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSimulation")
            .field("running", &self.is_running())
            .field("tick", &self.latest_snapshot().tick())
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use ossim_core::TickId;
    use ossim_sched::{ProcessSpec, SchedulerConfig};
    use ossim_sync::{MutexConfig, PhilosophersConfig};

    fn mutex() -> SimulationConfig {
        SimulationConfig::Mutex(MutexConfig::default())
    }

    fn fast() -> DriverConfig {
        DriverConfig {
            tick_rate_hz: 500.0,
            ..DriverConfig::default()
        }
    }

    fn wait_for(sim: &RealtimeSimulation, what: &str, cond: impl Fn(&SimulationSnapshot) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond(&sim.latest_snapshot()) {
            if Instant::now() > deadline {
                panic!("{what} not reached within 5s");
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn starts_paused_and_steps_on_demand() {
        let sim = RealtimeSimulation::new(mutex(), fast()).unwrap();
        assert!(!sim.is_running());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sim.latest_snapshot().tick(), TickId(0));

        assert_eq!(sim.step().unwrap(), TickOutcome::Advanced);
        assert_eq!(sim.step().unwrap(), TickOutcome::Advanced);
        assert_eq!(sim.latest_snapshot().tick(), TickId(2));
    }

    #[test]
    fn start_and_pause() {
        let sim = RealtimeSimulation::new(mutex(), fast()).unwrap();
        sim.start().unwrap();
        wait_for(&sim, "tick 5", |s| s.tick() >= TickId(5));

        sim.pause().unwrap();
        // The pause is processed before this step, so the thread idles after it.
        sim.step().unwrap();
        assert!(!sim.is_running());
        let paused_at = sim.latest_snapshot().tick();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(sim.latest_snapshot().tick(), paused_at);
    }

    #[test]
    fn completion_auto_pauses() {
        let config = SimulationConfig::Cpu(SchedulerConfig {
            processes: vec![ProcessSpec::cpu_bound("A", 0, 2)],
            context_switch_time: 0,
            ..SchedulerConfig::default()
        });
        let mut sim = RealtimeSimulation::new(
            config,
            DriverConfig {
                autostart: true,
                ..fast()
            },
        )
        .unwrap();
        wait_for(&sim, "completion", |s| s.tick() >= TickId(3));
        thread::sleep(Duration::from_millis(30));
        assert!(!sim.is_running());
        assert_eq!(sim.latest_snapshot().tick(), TickId(3));

        let inner = sim.shutdown().unwrap();
        assert_eq!(inner.current_tick(), TickId(3));
    }

    #[test]
    fn deadlock_recover_resume() {
        let config = SimulationConfig::Philosophers(PhilosophersConfig {
            think_time: (1, 1),
            ..PhilosophersConfig::default()
        });
        let sim = RealtimeSimulation::new(config, fast()).unwrap();
        assert_eq!(sim.step().unwrap(), TickOutcome::Advanced);
        assert_eq!(sim.step().unwrap(), TickOutcome::Deadlocked);
        assert!(sim.latest_snapshot().halted());

        assert!(sim.recover().unwrap());
        assert!(!sim.latest_snapshot().halted());
        assert!(!sim.recover().unwrap());
        assert_eq!(sim.step().unwrap(), TickOutcome::Advanced);
    }

    #[test]
    fn reset_rewinds_and_pauses() {
        let sim = RealtimeSimulation::new(mutex(), fast()).unwrap();
        for _ in 0..4 {
            sim.step().unwrap();
        }
        let after_four = sim.latest_snapshot();
        sim.start().unwrap();
        sim.reset().unwrap();
        assert!(!sim.is_running());
        assert_eq!(sim.latest_snapshot().tick(), TickId(0));

        for _ in 0..4 {
            sim.step().unwrap();
        }
        assert_eq!(sim.latest_snapshot(), after_four);
    }

    #[test]
    fn commands_after_shutdown_fail() {
        let mut sim = RealtimeSimulation::new(mutex(), fast()).unwrap();
        assert!(sim.shutdown().is_some());
        assert!(sim.shutdown().is_none());
        assert_eq!(sim.start(), Err(DriverError::Shutdown));
        assert_eq!(sim.step(), Err(DriverError::Shutdown));
    }

    #[test]
    fn invalid_driver_config_rejected() {
        let err = RealtimeSimulation::new(
            mutex(),
            DriverConfig {
                tick_rate_hz: 0.0,
                ..DriverConfig::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn drop_triggers_shutdown() {
        let sim = RealtimeSimulation::new(mutex(), fast()).unwrap();
        sim.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(sim);
        // If this doesn't hang, shutdown worked.
    }

    #[test]
    fn shutdown_fast_with_slow_tick_rate() {
        let mut sim = RealtimeSimulation::new(
            mutex(),
            DriverConfig {
                tick_rate_hz: 0.5,
                autostart: true,
                ..DriverConfig::default()
            },
        )
        .unwrap();
        wait_for(&sim, "first tick", |s| s.tick() >= TickId(1));
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        assert!(sim.shutdown().is_some());
        let wall_ms = start.elapsed().as_millis();
        assert!(wall_ms < 500, "shutdown took {wall_ms}ms with 0.5Hz tick rate");
    }
}
