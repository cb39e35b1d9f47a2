//! Batch CPU schedulers producing a Gantt chart.
//!
//! Unlike [`CpuScheduler`](crate::CpuScheduler), these run a whole
//! workload to completion in one call and ignore I/O. They exist to
//! compare the classic policies on the same process set.

use std::collections::VecDeque;
use std::fmt;

use ossim_core::{ConfigError, ProcessId};

use crate::metrics::{ProcessTiming, SchedulingMetrics};
use crate::process::ProcessSpec;

/// Scheduling policy for [`schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// First come, first served.
    Fcfs,
    /// Shortest job first, non-preemptive.
    Sjf,
    /// Shortest remaining time first.
    Srtf,
    /// Lowest priority number first.
    Priority {
        /// Whether a higher-priority arrival displaces the running process.
        preemptive: bool,
    },
    /// Round robin with a fixed time slice.
    RoundRobin {
        /// Slice length in ticks. At least 1.
        quantum: u64,
    },
}

impl Algorithm {
    /// Short name for reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::Srtf => "SRTF",
            Self::Priority { preemptive: false } => "Priority",
            Self::Priority { preemptive: true } => "Priority (preemptive)",
            Self::RoundRobin { .. } => "Round Robin",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::RoundRobin { quantum: 0 } => Err(ConfigError::ZeroQuantum),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundRobin { quantum } => write!(f, "Round Robin (q={quantum})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One contiguous stretch of the CPU timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GanttSegment {
    /// Process on the CPU, or `None` when idle.
    pub process: Option<ProcessId>,
    /// First tick of the segment.
    pub start: u64,
    /// One past the last tick.
    pub end: u64,
}

impl GanttSegment {
    /// Ticks covered.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Per-process result of a batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessOutcome {
    /// Position of the spec in the input slice.
    pub id: ProcessId,
    /// Display name.
    pub name: String,
    /// Arrival tick.
    pub arrival_time: u64,
    /// CPU burst.
    pub burst_time: u64,
    /// Tick at which the last unit of work finished.
    pub completion_time: u64,
    /// `completion - arrival`.
    pub turnaround_time: u64,
    /// `turnaround - burst`.
    pub waiting_time: u64,
    /// First start minus arrival.
    pub response_time: u64,
}

/// Everything a batch run produces.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleResult {
    /// Policy that produced this result.
    pub algorithm: Algorithm,
    /// Timeline, adjacent runs of the same process merged.
    pub gantt: Vec<GanttSegment>,
    /// Outcomes in input order.
    pub outcomes: Vec<ProcessOutcome>,
    /// Aggregates over `outcomes`.
    pub metrics: SchedulingMetrics,
}

struct Job {
    arrival: u64,
    burst: u64,
    priority: u32,
    remaining: u64,
    first_start: Option<u64>,
    completion: Option<u64>,
}

impl Job {
    fn done(&self) -> bool {
        self.completion.is_some()
    }
}

struct Timeline {
    segments: Vec<GanttSegment>,
}

impl Timeline {
    fn push(&mut self, process: Option<ProcessId>, start: u64, end: u64) {
        if end <= start {
            return;
        }
        if let Some(last) = self.segments.last_mut() {
            if last.process == process && last.end == start {
                last.end = end;
                return;
            }
        }
        self.segments.push(GanttSegment {
            process,
            start,
            end,
        });
    }
}

/// Run `specs` to completion under `algorithm`.
///
/// Process ids are the spec indices. I/O fields are ignored.
///
/// # Errors
///
/// Returns `Err` for a zero round-robin quantum or an invalid spec.
pub fn schedule(algorithm: Algorithm, specs: &[ProcessSpec]) -> Result<ScheduleResult, ConfigError> {
    algorithm.validate()?;
    for spec in specs {
        spec.validate()?;
    }
    let mut jobs: Vec<Job> = specs
        .iter()
        .map(|s| Job {
            arrival: s.arrival_time,
            burst: s.burst_time,
            priority: s.priority,
            remaining: s.burst_time,
            first_start: None,
            completion: None,
        })
        .collect();
    let mut timeline = Timeline {
        segments: Vec::new(),
    };

    match algorithm {
        Algorithm::Fcfs => run_to_completion(&mut jobs, &mut timeline, |j| (j.arrival, 0)),
        Algorithm::Sjf => run_to_completion(&mut jobs, &mut timeline, |j| (j.burst, j.arrival)),
        Algorithm::Priority { preemptive: false } => {
            run_to_completion(&mut jobs, &mut timeline, |j| (u64::from(j.priority), j.arrival))
        }
        Algorithm::Srtf => run_preemptive(&mut jobs, &mut timeline, |j| j.remaining),
        Algorithm::Priority { preemptive: true } => {
            run_preemptive(&mut jobs, &mut timeline, |j| u64::from(j.priority))
        }
        Algorithm::RoundRobin { quantum } => run_round_robin(&mut jobs, &mut timeline, quantum),
    }

    let outcomes: Vec<ProcessOutcome> = specs
        .iter()
        .zip(&jobs)
        .enumerate()
        .map(|(i, (spec, job))| {
            let completion = job.completion.unwrap_or(job.arrival + job.burst);
            let turnaround = completion - job.arrival;
            ProcessOutcome {
                id: ProcessId(i as u32),
                name: spec.name.clone(),
                arrival_time: job.arrival,
                burst_time: job.burst,
                completion_time: completion,
                turnaround_time: turnaround,
                waiting_time: turnaround - job.burst,
                response_time: job.first_start.unwrap_or(job.arrival) - job.arrival,
            }
        })
        .collect();

    let timings: Vec<ProcessTiming> = outcomes
        .iter()
        .map(|o| ProcessTiming {
            arrived: true,
            waiting_time: o.waiting_time,
            turnaround_time: Some(o.turnaround_time),
            response_time: Some(o.response_time),
        })
        .collect();
    let elapsed = timeline.segments.last().map_or(0, |s| s.end);
    let busy = jobs.iter().map(|j| j.burst).sum();
    let metrics =
        SchedulingMetrics::aggregate(&timings, elapsed, busy, count_switches(&timeline.segments));

    Ok(ScheduleResult {
        algorithm,
        gantt: timeline.segments,
        outcomes,
        metrics,
    })
}

/// Number of times the CPU moved to a process other than the last one
/// that ran.
fn count_switches(segments: &[GanttSegment]) -> u64 {
    let mut last = None;
    let mut switches = 0;
    for pid in segments.iter().filter_map(|s| s.process) {
        if last.is_some_and(|l| l != pid) {
            switches += 1;
        }
        last = Some(pid);
    }
    switches
}

fn next_arrival_after(jobs: &[Job], t: u64) -> Option<u64> {
    jobs.iter()
        .filter(|j| !j.done() && j.arrival > t)
        .map(|j| j.arrival)
        .min()
}

fn pick<K: Ord>(jobs: &[Job], t: u64, key: impl Fn(usize, &Job) -> K) -> Option<usize> {
    jobs.iter()
        .enumerate()
        .filter(|(_, j)| !j.done() && j.arrival <= t)
        .min_by_key(|&(i, j)| key(i, j))
        .map(|(i, _)| i)
}

/// Jump an idle CPU to the next arrival. Returns `false` when nothing is
/// left to run.
fn idle_until_arrival(jobs: &[Job], timeline: &mut Timeline, t: &mut u64) -> bool {
    match next_arrival_after(jobs, *t) {
        Some(next) => {
            timeline.push(None, *t, next);
            *t = next;
            true
        }
        None => false,
    }
}

fn run_to_completion(jobs: &mut [Job], timeline: &mut Timeline, key: impl Fn(&Job) -> (u64, u64)) {
    let mut t = 0;
    loop {
        let Some(i) = pick(jobs, t, |i, j| (key(j), i)) else {
            if idle_until_arrival(jobs, timeline, &mut t) {
                continue;
            }
            return;
        };
        let job = &mut jobs[i];
        job.first_start = Some(t);
        timeline.push(Some(ProcessId(i as u32)), t, t + job.remaining);
        t += job.remaining;
        job.remaining = 0;
        job.completion = Some(t);
    }
}

/// Preemptive policies only change their decision at arrivals, so the
/// running job advances straight to the next arrival or its completion.
/// On a tie the job already running keeps the CPU.
fn run_preemptive(jobs: &mut [Job], timeline: &mut Timeline, metric: impl Fn(&Job) -> u64) {
    let mut t = 0;
    let mut current: Option<usize> = None;
    loop {
        let Some(i) = pick(jobs, t, |i, j| {
            (metric(j), current != Some(i), j.arrival, i)
        }) else {
            current = None;
            if idle_until_arrival(jobs, timeline, &mut t) {
                continue;
            }
            return;
        };
        let horizon = next_arrival_after(jobs, t);
        let job = &mut jobs[i];
        let run = match horizon {
            Some(next) => job.remaining.min(next - t),
            None => job.remaining,
        };
        job.first_start.get_or_insert(t);
        timeline.push(Some(ProcessId(i as u32)), t, t + run);
        t += run;
        job.remaining -= run;
        if job.remaining == 0 {
            job.completion = Some(t);
            current = None;
        } else {
            current = Some(i);
        }
    }
}

fn run_round_robin(jobs: &mut [Job], timeline: &mut Timeline, quantum: u64) {
    let mut order: Vec<usize> = (0..jobs.len()).collect();
    order.sort_by_key(|&i| (jobs[i].arrival, i));
    let mut pending: VecDeque<usize> = order.into();
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut t = 0;

    let admit = |pending: &mut VecDeque<usize>, queue: &mut VecDeque<usize>, jobs: &[Job], t: u64| {
        while pending.front().is_some_and(|&i| jobs[i].arrival <= t) {
            if let Some(i) = pending.pop_front() {
                queue.push_back(i);
            }
        }
    };

    loop {
        admit(&mut pending, &mut queue, jobs, t);
        let Some(i) = queue.pop_front() else {
            match pending.front() {
                Some(&next) => {
                    let arrival = jobs[next].arrival;
                    timeline.push(None, t, arrival);
                    t = arrival;
                    continue;
                }
                None => return,
            }
        };
        let job = &mut jobs[i];
        let slice = job.remaining.min(quantum);
        job.first_start.get_or_insert(t);
        timeline.push(Some(ProcessId(i as u32)), t, t + slice);
        t += slice;
        job.remaining -= slice;
        let finished = job.remaining == 0;
        if finished {
            job.completion = Some(t);
        }
        // Arrivals during the slice queue ahead of the preempted job.
        admit(&mut pending, &mut queue, jobs, t);
        if !finished {
            queue.push_back(i);
        }
    }
}
