//! Simulated processes: specs, lifecycle state, and the PCB.

use std::fmt;

use ossim_core::{ConfigError, ProcessId};

/// Lifecycle state of a simulated process.
///
/// Legal transitions are encoded in [`can_transition_to`]; the engine
/// checks every state change against it in debug builds.
///
/// [`can_transition_to`]: ProcessState::can_transition_to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessState {
    /// Created but not yet arrived.
    New,
    /// Arrived and waiting for the CPU.
    Ready,
    /// Holding the CPU.
    Running,
    /// Blocked on I/O.
    Waiting,
    /// Finished. Never mutated again.
    Terminated,
}

impl ProcessState {
    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        match (self, next) {
            (New, Ready) => true,
            (Ready, Running) => true,
            (Running, Ready) | (Running, Waiting) | (Running, Terminated) => true,
            (Waiting, Ready) => true,
            (New, _) | (Ready, _) | (Running, _) | (Waiting, _) | (Terminated, _) => false,
        }
    }

    /// Whether the process has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Upper-case label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Saved register context. Inspection only: nothing in the scheduler
/// reads these values back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pcb {
    /// Program counter, advanced by one instruction word per CPU tick.
    pub program_counter: u64,
    /// General-purpose registers captured at the last context save.
    pub registers: [u64; 4],
}

/// Bytes the program counter advances per CPU tick.
const INSTRUCTION_WIDTH: u64 = 4;

/// Static description of a process, as supplied by the user.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessSpec {
    /// Display name.
    pub name: String,
    /// Tick at which the process becomes eligible to run.
    pub arrival_time: u64,
    /// Total CPU ticks required. At least 1.
    pub burst_time: u64,
    /// Scheduling priority; lower numbers run first where priority matters.
    pub priority: u32,
    /// Per-tick probability of blocking on I/O while running.
    pub io_frequency: f64,
    /// Ticks spent blocked per I/O request. At least 1 when
    /// `io_frequency > 0`.
    pub io_duration: u32,
}

impl ProcessSpec {
    /// Start a builder for a process named `name`.
    pub fn builder(name: impl Into<String>) -> ProcessSpecBuilder {
        ProcessSpecBuilder {
            spec: ProcessSpec {
                name: name.into(),
                arrival_time: 0,
                burst_time: 1,
                priority: 0,
                io_frequency: 0.0,
                io_duration: 0,
            },
        }
    }

    /// CPU-bound process with no I/O.
    pub fn cpu_bound(name: impl Into<String>, arrival_time: u64, burst_time: u64) -> Self {
        Self {
            name: name.into(),
            arrival_time,
            burst_time,
            priority: 0,
            io_frequency: 0.0,
            io_duration: 0,
        }
    }

    /// Check the spec's structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.burst_time == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "burst_time",
                reason: format!("process '{}' needs at least one tick of CPU", self.name),
            });
        }
        ConfigError::check_probability("io_frequency", self.io_frequency)?;
        if self.io_frequency > 0.0 {
            ConfigError::check_duration("io_duration", self.io_duration)?;
        }
        Ok(())
    }
}

/// Builder for [`ProcessSpec`]. Validates on [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct ProcessSpecBuilder {
    spec: ProcessSpec,
}

impl ProcessSpecBuilder {
    /// Arrival tick (default 0).
    pub fn arrival(mut self, tick: u64) -> Self {
        self.spec.arrival_time = tick;
        self
    }

    /// CPU burst length (default 1).
    pub fn burst(mut self, ticks: u64) -> Self {
        self.spec.burst_time = ticks;
        self
    }

    /// Priority (default 0).
    pub fn priority(mut self, priority: u32) -> Self {
        self.spec.priority = priority;
        self
    }

    /// I/O behavior: block with probability `frequency` per running tick,
    /// for `duration` ticks.
    pub fn io(mut self, frequency: f64, duration: u32) -> Self {
        self.spec.io_frequency = frequency;
        self.spec.io_duration = duration;
        self
    }

    /// Validate and return the spec.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the burst is zero, the I/O frequency is not a
    /// probability, or I/O can happen with a zero duration.
    pub fn build(self) -> Result<ProcessSpec, ConfigError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

/// A process instance tracked by the scheduling engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulatedProcess {
    /// Registry-assigned identifier.
    pub id: ProcessId,
    /// Display name.
    pub name: String,
    /// Arrival tick.
    pub arrival_time: u64,
    /// Total CPU ticks required.
    pub burst_time: u64,
    /// CPU ticks still owed. Never increases.
    pub remaining_time: u64,
    /// CPU ticks received so far.
    pub cpu_time: u64,
    /// Ticks spent in [`ProcessState::Ready`].
    pub waiting_time: u64,
    /// Tick of termination.
    pub completion_time: Option<u64>,
    /// `completion_time - arrival_time`.
    pub turnaround_time: Option<u64>,
    /// Tick of the first dispatch onto the CPU.
    pub first_dispatch_time: Option<u64>,
    /// Lifecycle state.
    pub state: ProcessState,
    /// Scheduling priority (unused by SRTF).
    pub priority: u32,
    /// Per-tick probability of blocking on I/O while running.
    pub io_frequency: f64,
    /// Ticks spent blocked per I/O request.
    pub io_duration: u32,
    /// Ticks left in the current I/O wait.
    pub io_countdown: u32,
    /// Saved context.
    pub pcb: Pcb,
}

impl SimulatedProcess {
    /// Instantiate a spec in state [`ProcessState::New`].
    pub fn from_spec(id: ProcessId, spec: &ProcessSpec) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            arrival_time: spec.arrival_time,
            burst_time: spec.burst_time,
            remaining_time: spec.burst_time,
            cpu_time: 0,
            waiting_time: 0,
            completion_time: None,
            turnaround_time: None,
            first_dispatch_time: None,
            state: ProcessState::New,
            priority: spec.priority,
            io_frequency: spec.io_frequency,
            io_duration: spec.io_duration,
            io_countdown: 0,
            pcb: Pcb::default(),
        }
    }

    /// Move to `next`, checking legality in debug builds.
    pub(crate) fn set_state(&mut self, next: ProcessState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {} for {}",
            self.state,
            next,
            self.id
        );
        self.state = next;
    }

    /// Execute one CPU tick. Returns `true` when the burst is exhausted.
    pub(crate) fn execute_tick(&mut self) -> bool {
        debug_assert!(self.remaining_time > 0, "{} ran with nothing left", self.id);
        self.remaining_time = self.remaining_time.saturating_sub(1);
        self.cpu_time += 1;
        self.pcb.program_counter += INSTRUCTION_WIDTH;
        self.remaining_time == 0
    }

    /// Capture registers when the process leaves the CPU.
    pub(crate) fn save_context(&mut self) {
        self.pcb.registers = [
            self.remaining_time,
            self.cpu_time,
            self.waiting_time,
            self.pcb.program_counter,
        ];
    }

    /// Percentage of the burst completed, 0-100.
    pub fn progress(&self) -> u8 {
        let done = self.burst_time - self.remaining_time;
        ((done * 100) / self.burst_time.max(1)) as u8
    }
}
