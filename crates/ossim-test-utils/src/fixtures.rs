//! Shared workloads, graphs, and Banker matrices.
//!
//! - [`classic_srtf_workload`]: four CPU-bound jobs from the textbook SRTF trace.
//! - [`io_heavy_workload`]: mixed CPU- and I/O-bound jobs.
//! - [`two_process_deadlock`]: a minimal circular wait.
//! - [`banker_textbook`] / [`banker_unsafe`]: safe and unsafe Banker inputs.

use ossim_core::{ProcessId, ResourceId};
use ossim_deadlock::ResourceGraph;
use ossim_sched::ProcessSpec;

/// Allocation, max, and available, as taken by `check_safety`.
pub type BankerMatrices = (Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<u32>);

/// Arrivals 0..3 with bursts 8, 4, 9, 5.
pub fn classic_srtf_workload() -> Vec<ProcessSpec> {
    [(0, 8), (1, 4), (2, 9), (3, 5)]
        .into_iter()
        .enumerate()
        .map(|(i, (arrival, burst))| ProcessSpec::cpu_bound(format!("P{i}"), arrival, burst))
        .collect()
}

/// Two CPU-bound jobs and three that block on I/O.
pub fn io_heavy_workload() -> Vec<ProcessSpec> {
    let mut specs = vec![
        ProcessSpec::cpu_bound("compute-a", 0, 12),
        ProcessSpec::cpu_bound("compute-b", 4, 7),
    ];
    for (i, (arrival, burst, frequency, duration)) in
        [(0, 6, 0.3, 3), (2, 9, 0.2, 4), (5, 4, 0.5, 2)].into_iter().enumerate()
    {
        specs.push(ProcessSpec {
            name: format!("io-{i}"),
            arrival_time: arrival,
            burst_time: burst,
            priority: 0,
            io_frequency: frequency,
            io_duration: duration,
        });
    }
    specs
}

/// P0 holds R1 and wants R0; P1 holds R0 and wants R1.
pub fn two_process_deadlock() -> ResourceGraph {
    let mut g = ResourceGraph::new();
    for i in 0..2 {
        g.add_process(ProcessId(i), format!("P{i}"))
            .expect("fresh process id");
        g.add_resource(ResourceId(i), format!("R{i}"), 1)
            .expect("fresh resource id");
    }
    g.allocate(ProcessId(0), ResourceId(1), 1).expect("R1 free");
    g.allocate(ProcessId(1), ResourceId(0), 1).expect("R0 free");
    g.request(ProcessId(0), ResourceId(0), 1).expect("R0 exists");
    g.request(ProcessId(1), ResourceId(1), 1).expect("R1 exists");
    g
}

/// Five processes over three resource types; safe via P1, P3, P4, P0, P2.
pub fn banker_textbook() -> BankerMatrices {
    (
        vec![
            vec![0, 1, 0],
            vec![2, 0, 0],
            vec![3, 0, 2],
            vec![2, 1, 1],
            vec![0, 0, 2],
        ],
        vec![
            vec![7, 5, 3],
            vec![3, 2, 2],
            vec![9, 0, 2],
            vec![2, 2, 2],
            vec![4, 3, 3],
        ],
        vec![3, 3, 2],
    )
}

/// One resource type with nothing available: every process still needs
/// more, so no process can finish.
pub fn banker_unsafe() -> BankerMatrices {
    (vec![vec![5], vec![4], vec![3]], vec![vec![9], vec![7], vec![6]], vec![0])
}
