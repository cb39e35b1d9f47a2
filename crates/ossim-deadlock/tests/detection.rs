//! Cycle detection against randomly built graphs.

use std::time::{Duration, Instant};

use ossim_core::{ProcessId, ResourceId};
use ossim_deadlock::{check_safety, NodeId, ResourceGraph};
use ossim_test_utils::fixtures::{banker_textbook, banker_unsafe, two_process_deadlock};
use proptest::prelude::*;

#[test]
fn fixture_deadlock_clears_after_removing_one_allocation() {
    let mut graph = two_process_deadlock();
    let report = graph.detect_cycles();
    assert_eq!(report.process_cycles(), vec![vec![ProcessId(0), ProcessId(1)]]);

    assert!(graph.release(ProcessId(0), ResourceId(1)).unwrap());
    assert!(!graph.detect_cycles().has_cycle());
    assert!(graph.report().deadlocked.is_empty());
}

#[test]
fn banker_fixtures_round_trip() {
    let (allocation, max, available) = banker_textbook();
    let first = check_safety(&allocation, &max, &available).unwrap();
    let second = check_safety(&allocation, &max, &available).unwrap();
    assert_eq!(first, second);
    assert!(first.is_safe);
    assert_eq!(&first.sequence[..2], &[1, 3]);

    let (allocation, max, available) = banker_unsafe();
    let report = check_safety(&allocation, &max, &available).unwrap();
    assert!(!report.is_safe);
    assert!(report.sequence.is_empty());
    assert_eq!(report.steps.len(), 3);
    let needs: Vec<_> = report.steps.iter().map(|s| s.need[0]).collect();
    assert_eq!(needs, vec![4, 3, 3]);
}

/// `R(k)` has two units, held by `P(2k)` and `P(2k + 1)`, which both
/// request `R(k + 1)`. Path count doubles per layer; there is no cycle.
fn layered_graph(layers: u32) -> ResourceGraph {
    let mut g = ResourceGraph::new();
    for k in 0..=layers {
        g.add_resource(ResourceId(k), format!("R{k}"), 2).unwrap();
    }
    for k in 0..layers {
        for p in [2 * k, 2 * k + 1] {
            g.add_process(ProcessId(p), format!("P{p}")).unwrap();
            g.allocate(ProcessId(p), ResourceId(k), 1).unwrap();
            g.request(ProcessId(p), ResourceId(k + 1), 1).unwrap();
        }
    }
    g
}

#[test]
fn deep_acyclic_graph_builds_quickly() {
    let started = Instant::now();
    let g = layered_graph(60);
    let elapsed = started.elapsed();
    assert!(!g.is_deadlocked());
    assert!(g.detect_cycles().cycles.is_empty());
    assert!(
        elapsed < Duration::from_secs(5),
        "181-vertex layered graph took {elapsed:?}"
    );
}

#[test]
fn closing_the_layers_truncates_at_the_cap() {
    // P24 holds R12 and asks for R0: one cycle per choice of holder in
    // each of the 12 layers, 4096 in all.
    let mut g = layered_graph(12);
    g.add_process(ProcessId(24), "P24").unwrap();
    g.allocate(ProcessId(24), ResourceId(12), 1).unwrap();
    g.request(ProcessId(24), ResourceId(0), 1).unwrap();
    let report = g.report();
    assert!(report.truncated);
    assert_eq!(report.cycles.len(), ossim_deadlock::graph::MAX_REPORTED_CYCLES);
    for cycle in &report.cycles {
        assert_eq!(cycle.path[0], NodeId::Process(ProcessId(0)));
        assert_eq!(cycle.path.len(), 26);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Allocate(u32, u32),
    Request(u32, u32),
    Release(u32, u32),
    Cancel(u32, u32),
    Terminate(u32),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0u32..4, 0u32..4).prop_map(|(p, r)| Op::Allocate(p, r)),
        (0u32..4, 0u32..4).prop_map(|(p, r)| Op::Request(p, r)),
        (0u32..4, 0u32..4).prop_map(|(p, r)| Op::Release(p, r)),
        (0u32..4, 0u32..4).prop_map(|(p, r)| Op::Cancel(p, r)),
        (0u32..4).prop_map(Op::Terminate),
    ];
    prop::collection::vec(op, 0..40)
}

fn graph() -> ResourceGraph {
    let mut g = ResourceGraph::new();
    for i in 0..4 {
        g.add_process(ProcessId(i), format!("P{i}")).unwrap();
        g.add_resource(ResourceId(i), format!("R{i}"), 1 + i % 2).unwrap();
    }
    g
}

proptest! {
    #[test]
    fn cached_report_tracks_every_mutation(ops in ops()) {
        let mut g = graph();
        for op in ops {
            // Rejected operations leave the graph untouched.
            let _ = match op {
                Op::Allocate(p, r) => g.allocate(ProcessId(p), ResourceId(r), 1).map(|_| true),
                Op::Request(p, r) => g.request(ProcessId(p), ResourceId(r), 1),
                Op::Release(p, r) => g.release(ProcessId(p), ResourceId(r)),
                Op::Cancel(p, r) => g.cancel_request(ProcessId(p), ResourceId(r)),
                Op::Terminate(p) => g.terminate_process(ProcessId(p)).map(|_| true),
            };
            prop_assert_eq!(g.report(), &g.detect_cycles());

            for resource in g.resources() {
                let held: u32 = g
                    .allocations()
                    .filter(|e| e.resource == resource.id)
                    .map(|e| e.instances)
                    .sum();
                prop_assert!(held <= resource.total_instances);
            }
        }

        let report = g.detect_cycles();
        for cycle in &report.cycles {
            // Canonical rotation: starts at its smallest vertex, a process.
            let first = cycle.path[0];
            prop_assert!(matches!(first, NodeId::Process(_)));
            prop_assert!(cycle.path.iter().all(|n| *n >= first));
            // Bipartite: processes and resources alternate.
            for pair in cycle.path.windows(2) {
                prop_assert_ne!(
                    matches!(pair[0], NodeId::Process(_)),
                    matches!(pair[1], NodeId::Process(_))
                );
            }
        }
        // A set of stuck processes always waits in a circle.
        let reduction = g.detect_by_reduction();
        if reduction.is_deadlocked() {
            prop_assert!(report.has_cycle());
        }
    }
}

/// Every simple path from each start back to itself, restricted to
/// vertices above the start. Exponential, so only for small graphs.
fn enumerate_exhaustively(g: &ResourceGraph) -> Vec<Vec<NodeId>> {
    let mut nodes: Vec<NodeId> = g
        .processes()
        .map(|p| NodeId::Process(p.id))
        .chain(g.resources().map(|r| NodeId::Resource(r.id)))
        .collect();
    nodes.sort();
    let successors = |node: NodeId| -> Vec<NodeId> {
        let mut next: Vec<NodeId> = match node {
            NodeId::Process(p) => g
                .requests()
                .filter(|e| e.process == p)
                .map(|e| NodeId::Resource(e.resource))
                .collect(),
            NodeId::Resource(r) => g
                .allocations()
                .filter(|e| e.resource == r)
                .map(|e| NodeId::Process(e.process))
                .collect(),
        };
        next.sort();
        next
    };

    fn walk(
        start: NodeId,
        path: &mut Vec<NodeId>,
        successors: &dyn Fn(NodeId) -> Vec<NodeId>,
        found: &mut Vec<Vec<NodeId>>,
    ) {
        let Some(&last) = path.last() else { return };
        for next in successors(last) {
            if next == start {
                found.push(path.clone());
            } else if next > start && !path.contains(&next) {
                path.push(next);
                walk(start, path, successors, found);
                path.pop();
            }
        }
    }

    let mut found = Vec::new();
    for &start in &nodes {
        walk(start, &mut vec![start], &successors, &mut found);
    }
    found.sort();
    found
}

fn dense_graph() -> impl Strategy<Value = ResourceGraph> {
    let edges = prop::collection::vec((0u32..5, 0u32..5, any::<bool>()), 0..30);
    edges.prop_map(|edges| {
        let mut g = ResourceGraph::new();
        for i in 0..5 {
            g.add_process(ProcessId(i), format!("P{i}")).unwrap();
            g.add_resource(ResourceId(i), format!("R{i}"), 3).unwrap();
        }
        for (p, r, allocate) in edges {
            let _ = if allocate {
                g.allocate(ProcessId(p), ResourceId(r), 1).map(|_| true)
            } else {
                g.request(ProcessId(p), ResourceId(r), 1)
            };
        }
        g
    })
}

proptest! {
    #[test]
    fn reports_exactly_the_elementary_cycles(g in dense_graph()) {
        let report = g.detect_cycles();
        prop_assume!(!report.truncated);
        let mut cycles: Vec<Vec<NodeId>> = report.cycles.into_iter().map(|c| c.path).collect();
        cycles.sort();
        prop_assert_eq!(cycles, enumerate_exhaustively(&g));
    }
}
