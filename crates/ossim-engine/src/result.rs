//! Run summaries for export.

use ossim_core::TickOutcome;
use ossim_sched::{LifecycleCounters, SchedulingMetrics};
use ossim_sync::SyncMetrics;

use crate::config::{SimulationConfig, SimulationKind};
use crate::simulation::SimulationSnapshot;

/// Engine-specific metrics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetricsSummary {
    /// CPU scheduling metrics and counters.
    Scheduling {
        /// Averages over arrived processes.
        metrics: SchedulingMetrics,
        /// Busy ticks, switches, preemptions, I/O.
        counters: LifecycleCounters,
    },
    /// Synchronization metrics.
    Sync(SyncMetrics),
}

/// Everything an export collaborator needs about one run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationResult {
    /// Engine kind.
    pub kind: SimulationKind,
    /// Configuration the run started from.
    pub config: SimulationConfig,
    /// Ticks executed.
    pub ticks: u64,
    /// Outcome of the last tick.
    pub outcome: TickOutcome,
    /// Final metrics.
    pub metrics: MetricsSummary,
    /// State after the last tick, including the retained event log.
    pub final_snapshot: SimulationSnapshot,
}
