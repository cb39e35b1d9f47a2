//! CPU scheduling for ossim.
//!
//! Two views of the same problem:
//!
//! - [`CpuScheduler`]: a tick-driven process-lifecycle engine running
//!   preemptive SRTF with I/O blocking and a context-switch delay.
//! - [`schedule`]: batch policies (FCFS, SJF, SRTF, priority, round robin)
//!   that run a workload to completion and return a Gantt chart.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod process;
pub mod registry;

pub use batch::{schedule, Algorithm, GanttSegment, ProcessOutcome, ScheduleResult};
pub use config::SchedulerConfig;
pub use lifecycle::{CpuScheduler, CpuSnapshot, PendingSwitch};
pub use metrics::{LifecycleCounters, ProcessTiming, SchedulingMetrics};
pub use process::{Pcb, ProcessSpec, ProcessSpecBuilder, ProcessState, SimulatedProcess};
pub use registry::ProcessRegistry;
