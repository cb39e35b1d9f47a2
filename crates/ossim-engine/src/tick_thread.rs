//! Tick loop and command handling for the realtime driver.
//!
//! The tick thread owns the [`Simulation`] exclusively (moved in via
//! `thread::spawn`) and hands it back through its `JoinHandle` on exit.
//! Commands arrive on a bounded crossbeam channel; pacing uses
//! `recv_timeout`, so a command (including shutdown) wakes the thread
//! immediately regardless of the tick rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use ossim_core::{TickOutcome, Tickable};

use crate::simulation::{Simulation, SimulationSnapshot};

/// A request from the controlling thread.
pub(crate) enum Command {
    Start,
    Pause,
    Step { reply: Sender<TickOutcome> },
    Reset { reply: Sender<()> },
    Recover { reply: Sender<bool> },
    Shutdown,
}

/// State visible to both the tick thread and the controller.
pub(crate) struct Shared {
    latest: Mutex<Arc<SimulationSnapshot>>,
    running: AtomicBool,
}

impl Shared {
    pub fn new(initial: SimulationSnapshot) -> Self {
        Self {
            latest: Mutex::new(Arc::new(initial)),
            running: AtomicBool::new(false),
        }
    }

    pub fn latest(&self) -> Arc<SimulationSnapshot> {
        Arc::clone(&self.latest.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, snapshot: SimulationSnapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// State held by the tick thread's main loop.
pub(crate) struct TickThreadState {
    sim: Simulation,
    cmd_rx: Receiver<Command>,
    shared: Arc<Shared>,
    tick_budget: Duration,
    running: bool,
}

impl TickThreadState {
    pub fn new(
        sim: Simulation,
        cmd_rx: Receiver<Command>,
        shared: Arc<Shared>,
        tick_rate_hz: f64,
        autostart: bool,
    ) -> Self {
        let mut state = Self {
            sim,
            cmd_rx,
            shared,
            tick_budget: Duration::from_secs_f64(1.0 / tick_rate_hz),
            running: false,
        };
        state.set_running(autostart);
        state
    }

    /// Main loop. Runs until a shutdown command arrives or every sender
    /// is dropped, then returns the simulation.
    pub fn run(mut self) -> Simulation {
        let mut next_tick = Instant::now();
        loop {
            let command = if self.running {
                let wait = next_tick.saturating_duration_since(Instant::now());
                match self.cmd_rx.recv_timeout(wait) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.cmd_rx.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };

            match command {
                Some(Command::Shutdown) => break,
                Some(Command::Start) => {
                    if !self.running {
                        next_tick = Instant::now();
                    }
                    self.set_running(true);
                }
                Some(command) => self.handle(command),
                None => {
                    let outcome = self.tick_once();
                    if !outcome.is_running() {
                        info!(?outcome, tick = self.sim.current_tick().0, "auto-paused");
                        self.set_running(false);
                    }
                    next_tick += self.tick_budget;
                    let now = Instant::now();
                    if next_tick < now {
                        debug!(behind_us = (now - next_tick).as_micros() as u64, "tick overran budget");
                        next_tick = now;
                    }
                }
            }
        }

        self.set_running(false);
        info!(kind = %self.sim.kind(), tick = self.sim.current_tick().0, "tick thread stopped");
        self.sim
    }

    fn handle(&mut self, command: Command) {
        // Best-effort replies: the caller may have given up waiting.
        match command {
            Command::Pause => self.set_running(false),
            Command::Step { reply } => {
                let outcome = self.tick_once();
                let _ = reply.send(outcome);
            }
            Command::Reset { reply } => {
                self.set_running(false);
                self.sim.reset();
                self.shared.publish(self.sim.snapshot());
                let _ = reply.send(());
            }
            Command::Recover { reply } => {
                let recovered = self.sim.recover();
                if recovered {
                    self.shared.publish(self.sim.snapshot());
                }
                let _ = reply.send(recovered);
            }
            Command::Start | Command::Shutdown => {}
        }
    }

    fn tick_once(&mut self) -> TickOutcome {
        let outcome = self.sim.tick();
        self.shared.publish(self.sim.snapshot());
        outcome
    }

    fn set_running(&mut self, running: bool) {
        if self.running != running {
            debug!(running, "tick thread state change");
        }
        self.running = running;
        self.shared.running.store(running, Ordering::Release);
    }
}
