//! Scheduling metrics aggregation.
//!
//! [`SchedulingMetrics`] is derived from per-process timing after each tick
//! (live engine) or at completion (batch schedulers). Both paths feed the
//! same [`SchedulingMetrics::aggregate`] so averages are computed one way.

/// Timing of one process as seen by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessTiming {
    /// Whether the process has arrived (left `New`).
    pub arrived: bool,
    /// Ticks spent ready but not running.
    pub waiting_time: u64,
    /// Completion minus arrival, once terminated.
    pub turnaround_time: Option<u64>,
    /// First dispatch minus arrival, when known.
    pub response_time: Option<u64>,
}

/// Aggregate CPU-scheduling statistics.
///
/// Averages are taken over the processes for which the quantity is
/// defined: waiting time over arrived processes, turnaround and response
/// over processes that have a value. Empty sets average to `0.0`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulingMetrics {
    /// Ticks simulated so far.
    pub elapsed_ticks: u64,
    /// Ticks in which a process executed on the CPU.
    pub busy_ticks: u64,
    /// Processes that have terminated.
    pub completed: usize,
    /// Processes known to the engine.
    pub total: usize,
    /// Mean ready-queue waiting time.
    pub avg_waiting_time: f64,
    /// Mean turnaround time.
    pub avg_turnaround_time: f64,
    /// Mean response time.
    pub avg_response_time: f64,
    /// `busy_ticks / elapsed_ticks`, in `[0, 1]`.
    pub cpu_utilization: f64,
    /// Completed processes per tick.
    pub throughput: f64,
    /// Context switches performed.
    pub context_switches: u64,
}

impl SchedulingMetrics {
    /// Aggregate per-process timings.
    pub fn aggregate(
        timings: &[ProcessTiming],
        elapsed_ticks: u64,
        busy_ticks: u64,
        context_switches: u64,
    ) -> Self {
        let completed = timings
            .iter()
            .filter(|t| t.turnaround_time.is_some())
            .count();
        Self {
            elapsed_ticks,
            busy_ticks,
            completed,
            total: timings.len(),
            avg_waiting_time: mean(
                timings
                    .iter()
                    .filter(|t| t.arrived)
                    .map(|t| t.waiting_time),
            ),
            avg_turnaround_time: mean(timings.iter().filter_map(|t| t.turnaround_time)),
            avg_response_time: mean(timings.iter().filter_map(|t| t.response_time)),
            cpu_utilization: ratio(busy_ticks, elapsed_ticks),
            throughput: ratio(completed as u64, elapsed_ticks),
            context_switches,
        }
    }
}

/// Counters the live lifecycle engine maintains on top of the aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LifecycleCounters {
    /// Ticks in which the CPU executed a process.
    pub busy_ticks: u64,
    /// Context switches started (only counted with a non-zero switch time).
    pub context_switches: u64,
    /// Processes placed on the CPU.
    pub dispatches: u64,
    /// Running processes displaced by a shorter one.
    pub preemptions: u64,
    /// Running processes that blocked on I/O.
    pub io_interrupts: u64,
}

fn mean(values: impl Iterator<Item = u64>) -> f64 {
    let (sum, count) = values.fold((0u64, 0u64), |(s, c), v| (s + v, c + 1));
    ratio(sum, count)
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(waiting: u64, turnaround: u64) -> ProcessTiming {
        ProcessTiming {
            arrived: true,
            waiting_time: waiting,
            turnaround_time: Some(turnaround),
            response_time: Some(waiting),
        }
    }

    #[test]
    fn empty_aggregate_is_zero() {
        let m = SchedulingMetrics::aggregate(&[], 0, 0, 0);
        assert_eq!(m, SchedulingMetrics::default());
    }

    #[test]
    fn averages_over_defined_values() {
        let pending = ProcessTiming {
            arrived: false,
            waiting_time: 0,
            turnaround_time: None,
            response_time: None,
        };
        let m = SchedulingMetrics::aggregate(&[done(0, 24), done(24, 27), pending], 30, 27, 2);
        assert_eq!(m.completed, 2);
        assert_eq!(m.total, 3);
        assert!((m.avg_waiting_time - 12.0).abs() < 1e-9);
        assert!((m.avg_turnaround_time - 25.5).abs() < 1e-9);
        assert!((m.cpu_utilization - 0.9).abs() < 1e-9);
        assert!((m.throughput - 2.0 / 30.0).abs() < 1e-9);
        assert_eq!(m.context_switches, 2);
    }
}
