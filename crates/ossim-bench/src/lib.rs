//! Benchmark workloads for the ossim simulators.
//!
//! Every builder is deterministic in its seed:
//!
//! - [`scheduling_workload`]: mixed CPU- and I/O-bound process specs
//! - [`ring_graph`]: `n` processes in one circular wait
//! - [`banker_profile`]: random Banker matrices with `allocation <= max`
//! - [`reference_string`]: page references with some locality
//! - [`disk_queue`]: uniformly scattered cylinder requests

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ossim_core::{GraphError, ProcessId, RandomSource, ResourceId, SeededRandom};
use ossim_deadlock::ResourceGraph;
use ossim_disk::DiskQueue;
use ossim_sched::ProcessSpec;

/// `n` processes arriving over the first `2n` ticks; every third one
/// blocks on I/O.
pub fn scheduling_workload(n: usize, seed: u64) -> Vec<ProcessSpec> {
    let mut rng = SeededRandom::new(seed);
    let horizon = u32::try_from(2 * n).unwrap_or(u32::MAX);
    (0..n)
        .map(|i| {
            let io = i % 3 == 2;
            ProcessSpec {
                name: format!("P{i}"),
                arrival_time: u64::from(rng.range_inclusive(0, horizon)),
                burst_time: u64::from(rng.range_inclusive(1, 20)),
                priority: rng.range_inclusive(0, 9),
                io_frequency: if io { 0.2 } else { 0.0 },
                io_duration: if io { rng.range_inclusive(1, 5) } else { 0 },
            }
        })
        .collect()
}

/// `P(i)` holds `R(i)` and requests `R(i + 1 mod n)`.
pub fn ring_graph(n: u32) -> Result<ResourceGraph, GraphError> {
    let mut graph = ResourceGraph::new();
    for i in 0..n {
        graph.add_process(ProcessId(i), format!("P{i}"))?;
        graph.add_resource(ResourceId(i), format!("R{i}"), 1)?;
    }
    for i in 0..n {
        graph.allocate(ProcessId(i), ResourceId(i), 1)?;
        graph.request(ProcessId(i), ResourceId((i + 1) % n), 1)?;
    }
    Ok(graph)
}

/// Allocation, max, and available for `processes x resources`.
pub fn banker_profile(
    processes: usize,
    resources: usize,
    seed: u64,
) -> (Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<u32>) {
    let mut rng = SeededRandom::new(seed);
    let mut allocation = Vec::with_capacity(processes);
    let mut max = Vec::with_capacity(processes);
    for _ in 0..processes {
        let row_max: Vec<u32> = (0..resources).map(|_| rng.range_inclusive(1, 10)).collect();
        let row_alloc = row_max.iter().map(|&m| rng.range_inclusive(0, m)).collect();
        max.push(row_max);
        allocation.push(row_alloc);
    }
    let available = (0..resources).map(|_| rng.range_inclusive(0, 6)).collect();
    (allocation, max, available)
}

/// `len` references over pages `0..pages`. Four in five stay within two
/// pages of the previous reference.
pub fn reference_string(len: usize, pages: u32, seed: u64) -> Vec<u32> {
    let mut rng = SeededRandom::new(seed);
    let top = pages.saturating_sub(1);
    let mut current = 0u32;
    (0..len)
        .map(|_| {
            current = if rng.chance(0.8) {
                rng.range_inclusive(current.saturating_sub(2), current.saturating_add(2).min(top))
            } else {
                rng.range_inclusive(0, top)
            };
            current
        })
        .collect()
}

/// `n` requests on a disk of `cylinders`, head in the middle.
pub fn disk_queue(n: usize, cylinders: u32, seed: u64) -> DiskQueue {
    let mut rng = SeededRandom::new(seed);
    let top = cylinders.saturating_sub(1);
    let requests = (0..n).map(|_| rng.range_inclusive(0, top)).collect();
    DiskQueue::new(cylinders, cylinders / 2, requests)
}
