//! Process-lifecycle engine: preemptive shortest-remaining-time-first with
//! I/O blocking and context-switch delay.
//!
//! # Tick phases
//!
//! Each [`tick()`](CpuScheduler::tick) at clock `c` runs, in order:
//!
//! 1. **Admit**: `New` processes with `arrival_time <= c` become `Ready`.
//! 2. **Switch**: an in-flight context switch counts down; at zero its
//!    target is dispatched. A tick that starts mid-switch skips phases 4
//!    and 5 (the CPU is busy switching).
//! 3. **I/O**: `Waiting` processes count down; at zero they become `Ready`.
//! 4. **Execute**: the running process burns one tick; it terminates at
//!    zero remaining, otherwise may block on I/O.
//! 5. **Preempt**: the shortest `Ready` process (ties by id) displaces the
//!    running one only if strictly shorter; an idle CPU always takes it.
//! 6. **Age**: every `Ready` process accrues one tick of waiting time.
//!
//! The clock then advances to `c + 1`.

use tracing::{debug, info};

use ossim_core::{
    Clock, ConfigError, EventLog, LogEntry, ProcessId, RandomSource, SeededRandom, TickId,
    TickOutcome, Tickable,
};

use crate::config::SchedulerConfig;
use crate::metrics::{LifecycleCounters, ProcessTiming, SchedulingMetrics};
use crate::process::{ProcessSpec, ProcessState, SimulatedProcess};
use crate::registry::ProcessRegistry;

// ── PendingSwitch ──────────────────────────────────────────────────

/// A context switch in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingSwitch {
    /// Process that will be dispatched when the countdown ends.
    pub target: ProcessId,
    /// Ticks left before dispatch.
    pub remaining: u32,
}

// ── CpuSnapshot ────────────────────────────────────────────────────

/// Owned view of the scheduler after a tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuSnapshot {
    /// Next tick to be processed.
    pub tick: TickId,
    /// Every process in id order.
    pub processes: Vec<SimulatedProcess>,
    /// Process on the CPU.
    pub running: Option<ProcessId>,
    /// Context switch in flight.
    pub pending_switch: Option<PendingSwitch>,
    /// Aggregate metrics.
    pub metrics: SchedulingMetrics,
    /// Engine counters.
    pub counters: LifecycleCounters,
    /// Retained event log, oldest first.
    pub log: Vec<LogEntry>,
}

impl CpuSnapshot {
    /// Look up a process by id.
    pub fn process(&self, id: ProcessId) -> Option<&SimulatedProcess> {
        self.processes.iter().find(|p| p.id == id)
    }
}

// ── CpuScheduler ───────────────────────────────────────────────────

/// Single-CPU process-lifecycle simulator.
///
/// Generic over the [`RandomSource`] that decides I/O interrupts so tests
/// can script them; [`CpuScheduler::new`] uses a seeded ChaCha8 source.
#[derive(Clone, Debug)]
pub struct CpuScheduler<R: RandomSource = SeededRandom> {
    config: SchedulerConfig,
    registry: ProcessRegistry,
    clock: Clock,
    running: Option<ProcessId>,
    pending_switch: Option<PendingSwitch>,
    counters: LifecycleCounters,
    rng: R,
    log: EventLog,
}

impl CpuScheduler<SeededRandom> {
    /// Build a scheduler seeded from `config.seed`.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        let rng = SeededRandom::new(config.seed);
        Self::with_random(config, rng)
    }
}

impl<R: RandomSource> CpuScheduler<R> {
    /// Build a scheduler drawing I/O interrupts from `rng`.
    pub fn with_random(config: SchedulerConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = ProcessRegistry::from_specs(&config.processes);
        let log = EventLog::new(config.log_capacity);
        info!(
            processes = registry.len(),
            context_switch_time = config.context_switch_time,
            "cpu scheduler created"
        );
        Ok(Self {
            config,
            registry,
            clock: Clock::new(),
            running: None,
            pending_switch: None,
            counters: LifecycleCounters::default(),
            rng,
            log,
        })
    }

    /// Register a new process. It is admitted on the first tick at or
    /// after its arrival time.
    pub fn add_process(&mut self, spec: ProcessSpec) -> Result<ProcessId, ConfigError> {
        spec.validate()?;
        let id = self.registry.insert(&spec);
        self.record(format!("{id} ({}) added, arrival {}", spec.name, spec.arrival_time));
        Ok(id)
    }

    /// Remove a process, clearing any scheduler pointer that names it.
    pub fn remove_process(&mut self, id: ProcessId) -> Option<SimulatedProcess> {
        let removed = self.registry.remove(id)?;
        if self.running == Some(id) {
            self.running = None;
        }
        if self.pending_switch.is_some_and(|s| s.target == id) {
            self.pending_switch = None;
        }
        self.record(format!("{id} ({}) removed", removed.name));
        Some(removed)
    }

    /// Look up a process.
    pub fn process(&self, id: ProcessId) -> Option<&SimulatedProcess> {
        self.registry.get(id)
    }

    /// The process registry.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Process currently on the CPU.
    pub fn running(&self) -> Option<ProcessId> {
        self.running
    }

    /// Context switch in flight.
    pub fn pending_switch(&self) -> Option<PendingSwitch> {
        self.pending_switch
    }

    /// Engine counters.
    pub fn counters(&self) -> LifecycleCounters {
        self.counters
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Aggregate metrics for the current state.
    pub fn metrics(&self) -> SchedulingMetrics {
        let timings: Vec<ProcessTiming> = self.registry.iter().map(timing).collect();
        SchedulingMetrics::aggregate(
            &timings,
            self.clock.now().0,
            self.counters.busy_ticks,
            self.counters.context_switches,
        )
    }

    // ── phases ─────────────────────────────────────────────────────

    fn admit(&mut self, now: u64) {
        let mut admitted = Vec::new();
        for p in self.registry.iter_mut() {
            if p.state == ProcessState::New && p.arrival_time <= now {
                p.set_state(ProcessState::Ready);
                admitted.push(p.id);
            }
        }
        for id in admitted {
            debug!(tick = now, pid = id.0, "admit");
            self.record(format!("{id} arrived: NEW -> READY"));
        }
    }

    fn advance_switch(&mut self, now: u64) {
        let Some(mut switch) = self.pending_switch.take() else {
            return;
        };
        switch.remaining = switch.remaining.saturating_sub(1);
        if switch.remaining > 0 {
            self.pending_switch = Some(switch);
            return;
        }
        let ready = self
            .registry
            .get(switch.target)
            .is_some_and(|p| p.state == ProcessState::Ready);
        if ready {
            self.dispatch(switch.target, now);
        }
    }

    fn complete_io(&mut self) {
        let mut woken = Vec::new();
        for p in self.registry.iter_mut() {
            if p.state != ProcessState::Waiting {
                continue;
            }
            p.io_countdown = p.io_countdown.saturating_sub(1);
            if p.io_countdown == 0 {
                p.set_state(ProcessState::Ready);
                woken.push(p.id);
            }
        }
        for id in woken {
            self.record(format!("{id} I/O complete: WAITING -> READY"));
        }
    }

    fn execute(&mut self, now: u64) {
        let Some(id) = self.running else {
            return;
        };
        let Some(p) = self.registry.get_mut(id) else {
            self.running = None;
            return;
        };
        self.counters.busy_ticks += 1;
        if p.execute_tick() {
            p.set_state(ProcessState::Terminated);
            p.completion_time = Some(now);
            p.turnaround_time = Some(now.saturating_sub(p.arrival_time));
            p.save_context();
            self.running = None;
            info!(tick = now, pid = id.0, "terminated");
            self.record(format!("{id} finished: RUNNING -> TERMINATED"));
            return;
        }
        if p.io_frequency > 0.0 && self.rng.chance(p.io_frequency) {
            p.set_state(ProcessState::Waiting);
            p.io_countdown = p.io_duration;
            p.save_context();
            let duration = p.io_duration;
            self.running = None;
            self.counters.io_interrupts += 1;
            debug!(tick = now, pid = id.0, duration, "io block");
            self.record(format!("{id} requested I/O for {duration} tick(s): RUNNING -> WAITING"));
        }
    }

    fn shortest_ready(&self) -> Option<(ProcessId, u64)> {
        self.registry
            .in_state(ProcessState::Ready)
            .map(|p| (p.id, p.remaining_time))
            .min_by_key(|&(id, remaining)| (remaining, id))
    }

    fn preempt(&mut self, now: u64) {
        let Some((candidate, candidate_remaining)) = self.shortest_ready() else {
            return;
        };
        if let Some(current) = self.running {
            let current_remaining = self
                .registry
                .get(current)
                .map_or(u64::MAX, |p| p.remaining_time);
            if candidate_remaining >= current_remaining {
                return;
            }
            if let Some(p) = self.registry.get_mut(current) {
                p.set_state(ProcessState::Ready);
                p.save_context();
            }
            self.running = None;
            self.counters.preemptions += 1;
            debug!(tick = now, pid = current.0, by = candidate.0, "preempt");
            self.record(format!(
                "{current} preempted by {candidate} ({candidate_remaining} < {current_remaining}): RUNNING -> READY"
            ));
        }
        self.begin_switch(candidate, now);
    }

    fn begin_switch(&mut self, target: ProcessId, now: u64) {
        let delay = self.config.context_switch_time;
        if delay == 0 {
            self.dispatch(target, now);
            return;
        }
        self.pending_switch = Some(PendingSwitch {
            target,
            remaining: delay,
        });
        self.counters.context_switches += 1;
        debug!(tick = now, pid = target.0, delay, "context switch");
        self.record(format!("context switch to {target} ({delay} tick(s))"));
    }

    fn dispatch(&mut self, id: ProcessId, now: u64) {
        let Some(p) = self.registry.get_mut(id) else {
            return;
        };
        p.set_state(ProcessState::Running);
        p.first_dispatch_time.get_or_insert(now);
        self.running = Some(id);
        self.counters.dispatches += 1;
        debug!(tick = now, pid = id.0, "dispatch");
        self.record(format!("{id} dispatched: READY -> RUNNING"));
    }

    fn age(&mut self) {
        for p in self.registry.iter_mut() {
            if p.state == ProcessState::Ready {
                p.waiting_time += 1;
            }
        }
    }

    fn record(&mut self, message: String) {
        self.log.push(self.clock.now(), message);
    }
}

impl<R: RandomSource> Tickable for CpuScheduler<R> {
    type Snapshot = CpuSnapshot;

    fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now().0;
        self.admit(now);
        let switching = self.pending_switch.is_some();
        if switching {
            self.advance_switch(now);
        }
        self.complete_io();
        if !switching {
            self.execute(now);
            self.preempt(now);
        }
        self.age();
        self.clock.advance();

        if self.registry.all_terminated() {
            TickOutcome::Completed
        } else {
            TickOutcome::Advanced
        }
    }

    fn current_tick(&self) -> TickId {
        self.clock.now()
    }

    fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            tick: self.clock.now(),
            processes: self.registry.to_vec(),
            running: self.running,
            pending_switch: self.pending_switch,
            metrics: self.metrics(),
            counters: self.counters,
            log: self.log.to_vec(),
        }
    }

    fn events(&self) -> &EventLog {
        &self.log
    }

    fn reset(&mut self) {
        self.registry = ProcessRegistry::from_specs(&self.config.processes);
        self.clock.reset();
        self.running = None;
        self.pending_switch = None;
        self.counters = LifecycleCounters::default();
        self.rng.restart();
        self.log.clear();
        info!("cpu scheduler reset");
    }
}

fn timing(p: &SimulatedProcess) -> ProcessTiming {
    ProcessTiming {
        arrived: p.state != ProcessState::New,
        waiting_time: p.waiting_time,
        turnaround_time: p.turnaround_time,
        response_time: p
            .first_dispatch_time
            .map(|t| t.saturating_sub(p.arrival_time)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossim_test_utils::ScriptedRandom;

    fn engine(specs: Vec<ProcessSpec>, switch: u32) -> CpuScheduler {
        CpuScheduler::new(SchedulerConfig {
            processes: specs,
            context_switch_time: switch,
            ..SchedulerConfig::default()
        })
        .unwrap()
    }

    fn state(e: &CpuScheduler<impl RandomSource>, id: u32) -> ProcessState {
        e.process(ProcessId(id)).unwrap().state
    }

    #[test]
    fn single_process_runs_to_completion() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("A", 0, 3)], 0);
        assert_eq!(e.tick(), TickOutcome::Advanced);
        assert_eq!(e.running(), Some(ProcessId(0)));
        e.tick();
        e.tick();
        assert_eq!(e.tick(), TickOutcome::Completed);
        let p = e.process(ProcessId(0)).unwrap();
        assert_eq!(p.state, ProcessState::Terminated);
        assert_eq!(p.completion_time, Some(3));
        assert_eq!(p.turnaround_time, Some(3));
        assert_eq!(p.waiting_time, 0);
        assert_eq!(e.running(), None);
    }

    #[test]
    fn arrival_gates_admission() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("late", 2, 1)], 0);
        e.tick();
        assert_eq!(state(&e, 0), ProcessState::New);
        e.tick();
        assert_eq!(state(&e, 0), ProcessState::New);
        e.tick();
        assert_eq!(state(&e, 0), ProcessState::Running);
    }

    #[test]
    fn shorter_arrival_preempts() {
        let mut e = engine(
            vec![
                ProcessSpec::cpu_bound("long", 0, 8),
                ProcessSpec::cpu_bound("short", 2, 2),
            ],
            0,
        );
        e.tick(); // t0: long dispatched
        e.tick(); // t1: long 7
        e.tick(); // t2: long 6, short admitted with 2 < 6
        assert_eq!(e.running(), Some(ProcessId(1)));
        assert_eq!(state(&e, 0), ProcessState::Ready);
        assert_eq!(e.counters().preemptions, 1);
    }

    #[test]
    fn equal_remaining_does_not_preempt() {
        let mut e = engine(
            vec![
                ProcessSpec::cpu_bound("a", 0, 3),
                ProcessSpec::cpu_bound("b", 1, 2),
            ],
            0,
        );
        e.tick(); // t0: a dispatched (3)
        e.tick(); // t1: a -> 2, b admitted with 2: tie
        assert_eq!(e.running(), Some(ProcessId(0)));
        assert_eq!(e.counters().preemptions, 0);
    }

    #[test]
    fn context_switch_delays_dispatch() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("A", 0, 2)], 2);
        e.tick(); // t0: switch begins
        assert_eq!(e.running(), None);
        assert_eq!(
            e.pending_switch(),
            Some(PendingSwitch {
                target: ProcessId(0),
                remaining: 2
            })
        );
        e.tick(); // t1: countdown 1
        assert_eq!(e.running(), None);
        e.tick(); // t2: countdown 0 -> dispatched, no work
        assert_eq!(e.running(), Some(ProcessId(0)));
        assert_eq!(e.process(ProcessId(0)).unwrap().remaining_time, 2);
        e.tick(); // t3
        e.tick(); // t4: done
        let p = e.process(ProcessId(0)).unwrap();
        assert_eq!(p.completion_time, Some(4));
        // Ready during t0 and t1; dispatched before aging on t2.
        assert_eq!(p.waiting_time, 2);
        assert_eq!(e.counters().context_switches, 1);
    }

    #[test]
    fn zero_switch_time_counts_no_switches() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("A", 0, 1)], 0);
        e.tick();
        assert_eq!(e.counters().context_switches, 0);
        assert_eq!(e.counters().dispatches, 1);
    }

    #[test]
    fn io_block_and_wake() {
        let spec = ProcessSpec::builder("io").burst(4).io(0.5, 2).build().unwrap();
        // First draw (t1 execute) fires, everything after does not.
        let rng = ScriptedRandom::new(vec![0.1], 0.9);
        let mut e = CpuScheduler::with_random(
            SchedulerConfig {
                processes: vec![spec],
                context_switch_time: 0,
                ..SchedulerConfig::default()
            },
            rng,
        )
        .unwrap();
        e.tick(); // t0 dispatch
        e.tick(); // t1 execute 3 left, io fires
        assert_eq!(state(&e, 0), ProcessState::Waiting);
        assert_eq!(e.process(ProcessId(0)).unwrap().io_countdown, 2);
        e.tick(); // t2 countdown 1
        assert_eq!(state(&e, 0), ProcessState::Waiting);
        e.tick(); // t3 countdown 0 -> ready -> dispatched
        assert_eq!(state(&e, 0), ProcessState::Running);
        assert_eq!(e.counters().io_interrupts, 1);
    }

    #[test]
    fn removing_running_process_clears_pointer() {
        let mut e = engine(
            vec![
                ProcessSpec::cpu_bound("a", 0, 5),
                ProcessSpec::cpu_bound("b", 0, 6),
            ],
            0,
        );
        e.tick();
        assert_eq!(e.running(), Some(ProcessId(0)));
        assert!(e.remove_process(ProcessId(0)).is_some());
        assert_eq!(e.running(), None);
        e.tick();
        assert_eq!(e.running(), Some(ProcessId(1)));
    }

    #[test]
    fn removing_switch_target_cancels_switch() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("a", 0, 5)], 3);
        e.tick();
        assert!(e.pending_switch().is_some());
        e.remove_process(ProcessId(0));
        assert!(e.pending_switch().is_none());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("a", 0, 2)], 0);
        let initial = e.snapshot();
        while e.tick() != TickOutcome::Completed {}
        e.reset();
        assert_eq!(e.snapshot(), initial);
    }

    #[test]
    fn add_process_mid_run_is_admitted() {
        let mut e = engine(vec![ProcessSpec::cpu_bound("a", 0, 10)], 0);
        e.tick();
        e.tick();
        let id = e.add_process(ProcessSpec::cpu_bound("b", 0, 1)).unwrap();
        e.tick();
        assert_eq!(e.running(), Some(id));
        assert!(e
            .add_process(ProcessSpec::cpu_bound("bad", 0, 0))
            .is_err());
    }

    #[test]
    fn log_is_bounded() {
        let mut e = CpuScheduler::new(SchedulerConfig {
            processes: (0..10)
                .map(|i| ProcessSpec::cpu_bound(format!("p{i}"), i, 3))
                .collect(),
            context_switch_time: 1,
            log_capacity: 5,
            ..SchedulerConfig::default()
        })
        .unwrap();
        for _ in 0..50 {
            e.tick();
        }
        assert_eq!(e.events().len(), 5);
        assert!(e.events().total_pushed() > 5);
    }
}
