//! Resource-allocation graph with cached cycle detection.
//!
//! Processes and resources form a bipartite digraph: a request is an edge
//! `P -> R`, an allocation an edge `R -> P`. Every structural mutation
//! recomputes the [`CycleReport`] from scratch with Johnson's algorithm,
//! polynomial in graph size per reported cycle.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use ossim_core::{GraphError, ProcessId, ResourceId};

/// Upper bound on cycles enumerated per detection pass.
pub const MAX_REPORTED_CYCLES: usize = 1024;

/// A vertex of the resource-allocation graph.
///
/// Orders every process before every resource, so a cycle's canonical
/// rotation always starts at a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeId {
    /// A process vertex.
    Process(ProcessId),
    /// A resource vertex.
    Resource(ResourceId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process(p) => p.fmt(f),
            Self::Resource(r) => r.fmt(f),
        }
    }
}

/// A process vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessNode {
    /// Identifier.
    pub id: ProcessId,
    /// Display name.
    pub name: String,
}

/// A resource vertex with a fixed number of instances.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceNode {
    /// Identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Capacity. At least 1.
    pub total_instances: u32,
}

/// An allocation or request edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// The process end.
    pub process: ProcessId,
    /// The resource end.
    pub resource: ResourceId,
    /// Instances held or wanted.
    pub instances: u32,
}

/// One elementary cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cycle {
    /// Vertices in edge order, starting at the lowest-ordered one. The
    /// closing edge back to the first vertex is implied.
    pub path: Vec<NodeId>,
}

impl Cycle {
    /// The process vertices of the cycle, in path order.
    pub fn processes(&self) -> Vec<ProcessId> {
        self.path
            .iter()
            .filter_map(|n| match n {
                NodeId::Process(p) => Some(*p),
                NodeId::Resource(_) => None,
            })
            .collect()
    }
}

/// Result of a cycle search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleReport {
    /// Every elementary cycle, each reported once.
    pub cycles: Vec<Cycle>,
    /// Union of all vertices on any cycle.
    pub deadlocked: BTreeSet<NodeId>,
    /// Whether enumeration stopped at [`MAX_REPORTED_CYCLES`].
    pub truncated: bool,
}

impl CycleReport {
    /// Whether any cycle exists.
    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// The process subsequence of every cycle.
    pub fn process_cycles(&self) -> Vec<Vec<ProcessId>> {
        self.cycles.iter().map(Cycle::processes).collect()
    }

    /// Processes on at least one cycle, ascending.
    pub fn deadlocked_processes(&self) -> Vec<ProcessId> {
        self.deadlocked
            .iter()
            .filter_map(|n| match n {
                NodeId::Process(p) => Some(*p),
                NodeId::Resource(_) => None,
            })
            .collect()
    }
}

/// Result of the work/finish reduction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReductionReport {
    /// Processes in the order they were reduced away.
    pub completion_order: Vec<ProcessId>,
    /// Processes that can never finish.
    pub deadlocked: Vec<ProcessId>,
}

impl ReductionReport {
    /// Whether any process is stuck.
    pub fn is_deadlocked(&self) -> bool {
        !self.deadlocked.is_empty()
    }
}

/// Mutable resource-allocation graph.
///
/// Holds at most one allocation edge and one request edge per
/// `(process, resource)` pair; repeated allocations accumulate into the
/// existing edge. Allocated instances never exceed a resource's total.
#[derive(Clone, Debug, Default)]
pub struct ResourceGraph {
    processes: IndexMap<ProcessId, ProcessNode>,
    resources: IndexMap<ResourceId, ResourceNode>,
    allocations: IndexMap<(ProcessId, ResourceId), u32>,
    requests: IndexMap<(ProcessId, ResourceId), u32>,
    report: CycleReport,
}

impl ResourceGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ── vertices ───────────────────────────────────────────────────

    /// Add a process vertex.
    pub fn add_process(&mut self, id: ProcessId, name: impl Into<String>) -> Result<(), GraphError> {
        if self.processes.contains_key(&id) {
            return Err(GraphError::DuplicateProcess(id));
        }
        let name = name.into();
        debug!(process = %id, %name, "add process");
        self.processes.insert(id, ProcessNode { id, name });
        self.refresh();
        Ok(())
    }

    /// Add a resource vertex with `instances` units.
    pub fn add_resource(
        &mut self,
        id: ResourceId,
        name: impl Into<String>,
        instances: u32,
    ) -> Result<(), GraphError> {
        if self.resources.contains_key(&id) {
            return Err(GraphError::DuplicateResource(id));
        }
        if instances == 0 {
            return Err(GraphError::ZeroInstances(id));
        }
        let name = name.into();
        debug!(resource = %id, %name, instances, "add resource");
        self.resources.insert(
            id,
            ResourceNode {
                id,
                name,
                total_instances: instances,
            },
        );
        self.refresh();
        Ok(())
    }

    /// Remove a process and every edge touching it.
    pub fn remove_process(&mut self, id: ProcessId) -> Result<ProcessNode, GraphError> {
        let node = self
            .processes
            .shift_remove(&id)
            .ok_or(GraphError::UnknownProcess(id))?;
        self.allocations.retain(|&(p, _), _| p != id);
        self.requests.retain(|&(p, _), _| p != id);
        debug!(process = %id, "remove process");
        self.refresh();
        Ok(node)
    }

    /// Remove a resource and every edge touching it.
    pub fn remove_resource(&mut self, id: ResourceId) -> Result<ResourceNode, GraphError> {
        let node = self
            .resources
            .shift_remove(&id)
            .ok_or(GraphError::UnknownResource(id))?;
        self.allocations.retain(|&(_, r), _| r != id);
        self.requests.retain(|&(_, r), _| r != id);
        debug!(resource = %id, "remove resource");
        self.refresh();
        Ok(node)
    }

    /// Deadlock recovery: kill `id`, releasing everything it holds.
    ///
    /// Returns the report recomputed after the removal.
    pub fn terminate_process(&mut self, id: ProcessId) -> Result<&CycleReport, GraphError> {
        self.remove_process(id)?;
        info!(
            process = %id,
            still_deadlocked = self.report.has_cycle(),
            "process terminated for recovery"
        );
        Ok(&self.report)
    }

    // ── edges ──────────────────────────────────────────────────────

    /// Give `instances` units of `resource` to `process`.
    ///
    /// # Errors
    ///
    /// Fails if either vertex is unknown, `instances` is zero, or fewer
    /// than `instances` units are free.
    pub fn allocate(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
        instances: u32,
    ) -> Result<(), GraphError> {
        self.check_edge(process, resource, instances)?;
        let free = self.free_instances_unchecked(resource);
        if instances > free {
            return Err(GraphError::CapacityExceeded {
                resource,
                requested: instances,
                free,
            });
        }
        *self.allocations.entry((process, resource)).or_insert(0) += instances;
        debug!(%process, %resource, instances, "allocate");
        self.refresh();
        Ok(())
    }

    /// Record that `process` wants `instances` units of `resource`.
    ///
    /// Returns `Ok(false)` if the process already has a request outstanding
    /// for this resource.
    pub fn request(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
        instances: u32,
    ) -> Result<bool, GraphError> {
        self.check_edge(process, resource, instances)?;
        let total = self
            .resources
            .get(&resource)
            .map_or(0, |r| r.total_instances);
        if instances > total {
            return Err(GraphError::ExceedsTotal {
                resource,
                requested: instances,
                total,
            });
        }
        if self.requests.contains_key(&(process, resource)) {
            return Ok(false);
        }
        self.requests.insert((process, resource), instances);
        debug!(%process, %resource, instances, "request");
        self.refresh();
        Ok(true)
    }

    /// Return every unit of `resource` held by `process`.
    ///
    /// Returns `Ok(false)` if nothing was held.
    pub fn release(&mut self, process: ProcessId, resource: ResourceId) -> Result<bool, GraphError> {
        self.check_vertices(process, resource)?;
        if self.allocations.shift_remove(&(process, resource)).is_none() {
            return Ok(false);
        }
        debug!(%process, %resource, "release");
        self.refresh();
        Ok(true)
    }

    /// Withdraw an outstanding request. Returns `Ok(false)` if there was none.
    pub fn cancel_request(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<bool, GraphError> {
        self.check_vertices(process, resource)?;
        if self.requests.shift_remove(&(process, resource)).is_none() {
            return Ok(false);
        }
        debug!(%process, %resource, "cancel request");
        self.refresh();
        Ok(true)
    }

    /// Convert an outstanding request into an allocation.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoSuchRequest`] if nothing is outstanding,
    /// [`GraphError::CapacityExceeded`] if not enough units are free (the
    /// request stays outstanding).
    pub fn grant_request(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<(), GraphError> {
        self.check_vertices(process, resource)?;
        let wanted = *self
            .requests
            .get(&(process, resource))
            .ok_or(GraphError::NoSuchRequest { process, resource })?;
        let free = self.free_instances_unchecked(resource);
        if wanted > free {
            return Err(GraphError::CapacityExceeded {
                resource,
                requested: wanted,
                free,
            });
        }
        self.requests.shift_remove(&(process, resource));
        *self.allocations.entry((process, resource)).or_insert(0) += wanted;
        debug!(%process, %resource, instances = wanted, "grant request");
        self.refresh();
        Ok(())
    }

    // ── queries ────────────────────────────────────────────────────

    /// Process vertices in insertion order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessNode> + '_ {
        self.processes.values()
    }

    /// Resource vertices in insertion order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> + '_ {
        self.resources.values()
    }

    /// Allocation edges.
    pub fn allocations(&self) -> impl Iterator<Item = Edge> + '_ {
        self.allocations.iter().map(|(&(process, resource), &instances)| Edge {
            process,
            resource,
            instances,
        })
    }

    /// Request edges.
    pub fn requests(&self) -> impl Iterator<Item = Edge> + '_ {
        self.requests.iter().map(|(&(process, resource), &instances)| Edge {
            process,
            resource,
            instances,
        })
    }

    /// Units of `resource` not allocated to anyone.
    pub fn free_instances(&self, resource: ResourceId) -> Option<u32> {
        self.resources
            .contains_key(&resource)
            .then(|| self.free_instances_unchecked(resource))
    }

    /// The report cached after the last mutation.
    pub fn report(&self) -> &CycleReport {
        &self.report
    }

    /// Whether the cached report contains a cycle.
    pub fn is_deadlocked(&self) -> bool {
        self.report.has_cycle()
    }

    /// Processes that appear on a cycle, ascending. Terminating any one
    /// of them breaks at least one cycle.
    pub fn recovery_candidates(&self) -> Vec<ProcessId> {
        self.report.deadlocked_processes()
    }

    /// Enumerate every elementary cycle.
    ///
    /// Pure: repeated calls on an unchanged graph return equal reports.
    /// Runs in `O(V * (V + E) + (V + E) * C)` for `C` reported cycles, so
    /// an acyclic graph costs polynomial time however many paths it has.
    pub fn detect_cycles(&self) -> CycleReport {
        let nodes = self.ordered_nodes();
        let index = |node: NodeId| nodes.binary_search(&node).ok();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let requests = self
            .requests
            .keys()
            .map(|&(p, r)| (NodeId::Process(p), NodeId::Resource(r)));
        let allocations = self
            .allocations
            .keys()
            .map(|&(p, r)| (NodeId::Resource(r), NodeId::Process(p)));
        for (from, to) in requests.chain(allocations) {
            if let (Some(from), Some(to)) = (index(from), index(to)) {
                adjacency[from].push(to);
            }
        }
        for next in &mut adjacency {
            next.sort_unstable();
        }

        let mut search = CycleSearch::new(&adjacency);
        for start in 0..nodes.len() {
            if search.truncated {
                break;
            }
            search.search_from(start);
        }
        if search.truncated {
            warn!(limit = MAX_REPORTED_CYCLES, "cycle enumeration truncated");
        }

        let mut report = CycleReport {
            truncated: search.truncated,
            ..CycleReport::default()
        };
        for indices in search.found {
            let path: Vec<NodeId> = indices.iter().map(|&i| nodes[i]).collect();
            report.deadlocked.extend(path.iter().copied());
            report.cycles.push(Cycle { path });
        }
        report
    }

    /// Multi-instance detection by graph reduction.
    ///
    /// Repeatedly retires a process whose every request fits in the free
    /// units, returning its allocations to the pool. Processes holding
    /// nothing start retired. Whatever remains is deadlocked.
    pub fn detect_by_reduction(&self) -> ReductionReport {
        let mut work: IndexMap<ResourceId, u32> = self
            .resources
            .keys()
            .map(|&r| (r, self.free_instances_unchecked(r)))
            .collect();
        let mut remaining: Vec<ProcessId> = Vec::new();
        let mut report = ReductionReport::default();
        for &p in self.processes.keys() {
            if self.allocations.keys().any(|&(q, _)| q == p) {
                remaining.push(p);
            } else {
                report.completion_order.push(p);
            }
        }

        loop {
            let ready = remaining.iter().position(|&p| {
                self.requests
                    .iter()
                    .filter(|((q, _), _)| *q == p)
                    .all(|(&(_, r), &n)| work.get(&r).is_some_and(|&w| n <= w))
            });
            let Some(index) = ready else { break };
            let p = remaining.remove(index);
            for (&(q, r), &n) in &self.allocations {
                if q == p {
                    if let Some(w) = work.get_mut(&r) {
                        *w += n;
                    }
                }
            }
            report.completion_order.push(p);
        }
        report.deadlocked = remaining;
        report
    }

    // ── internals ──────────────────────────────────────────────────

    fn check_vertices(&self, process: ProcessId, resource: ResourceId) -> Result<(), GraphError> {
        if !self.processes.contains_key(&process) {
            return Err(GraphError::UnknownProcess(process));
        }
        if !self.resources.contains_key(&resource) {
            return Err(GraphError::UnknownResource(resource));
        }
        Ok(())
    }

    fn check_edge(
        &self,
        process: ProcessId,
        resource: ResourceId,
        instances: u32,
    ) -> Result<(), GraphError> {
        self.check_vertices(process, resource)?;
        if instances == 0 {
            return Err(GraphError::ZeroAmount);
        }
        Ok(())
    }

    fn free_instances_unchecked(&self, resource: ResourceId) -> u32 {
        let total = self
            .resources
            .get(&resource)
            .map_or(0, |r| r.total_instances);
        let held: u32 = self
            .allocations
            .iter()
            .filter(|((_, r), _)| *r == resource)
            .map(|(_, &n)| n)
            .sum();
        total.saturating_sub(held)
    }

    fn ordered_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .processes
            .keys()
            .map(|&p| NodeId::Process(p))
            .chain(self.resources.keys().map(|&r| NodeId::Resource(r)))
            .collect();
        nodes.sort_unstable();
        nodes
    }

    fn refresh(&mut self) {
        let report = self.detect_cycles();
        if report.has_cycle() && !self.report.has_cycle() {
            info!(
                cycles = report.cycles.len(),
                processes = ?report.deadlocked_processes(),
                "deadlock detected"
            );
        } else if !report.has_cycle() && self.report.has_cycle() {
            info!("deadlock cleared");
        }
        self.report = report;
    }
}

/// Johnson's elementary-cycle enumeration.
///
/// Start vertices are taken in ascending order. For start `s` the search
/// is confined to the strongly connected component of `s` within the
/// vertices ordered at or after `s`, so every cycle is found exactly once,
/// from its lowest vertex. A vertex stays blocked until some path through
/// it closes a cycle; `b_lists[w]` holds the vertices to unblock with `w`.
struct CycleSearch<'a> {
    adjacency: &'a [Vec<usize>],
    reverse: Vec<Vec<usize>>,
    in_component: Vec<bool>,
    blocked: Vec<bool>,
    b_lists: Vec<Vec<usize>>,
    path: Vec<usize>,
    found: Vec<Vec<usize>>,
    truncated: bool,
}

impl<'a> CycleSearch<'a> {
    fn new(adjacency: &'a [Vec<usize>]) -> Self {
        let n = adjacency.len();
        let mut reverse = vec![Vec::new(); n];
        for (from, next) in adjacency.iter().enumerate() {
            for &to in next {
                reverse[to].push(from);
            }
        }
        Self {
            adjacency,
            reverse,
            in_component: vec![false; n],
            blocked: vec![false; n],
            b_lists: vec![Vec::new(); n],
            path: Vec::new(),
            found: Vec::new(),
            truncated: false,
        }
    }

    /// Vertices `>= start` reachable from `start` along `edges`.
    fn reach(edges: &[Vec<usize>], start: usize) -> Vec<bool> {
        let mut seen = vec![false; edges.len()];
        seen[start] = true;
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for &w in &edges[v] {
                if w >= start && !seen[w] {
                    seen[w] = true;
                    stack.push(w);
                }
            }
        }
        seen
    }

    fn search_from(&mut self, start: usize) {
        let forward = Self::reach(self.adjacency, start);
        let backward = Self::reach(&self.reverse, start);
        let mut members = 0;
        for v in 0..self.adjacency.len() {
            self.in_component[v] = forward[v] && backward[v];
            members += usize::from(self.in_component[v]);
            self.blocked[v] = false;
            self.b_lists[v].clear();
        }
        // The graph is bipartite, so a lone vertex has no self-loop.
        if members > 1 {
            self.circuit(start, start);
        }
    }

    fn circuit(&mut self, start: usize, v: usize) -> bool {
        let adjacency = self.adjacency;
        let mut closed = false;
        self.path.push(v);
        self.blocked[v] = true;
        for &w in &adjacency[v] {
            if self.truncated {
                break;
            }
            if !self.in_component[w] {
                continue;
            }
            if w == start {
                if self.found.len() == MAX_REPORTED_CYCLES {
                    self.truncated = true;
                    break;
                }
                self.found.push(self.path.clone());
                closed = true;
            } else if !self.blocked[w] && self.circuit(start, w) {
                closed = true;
            }
        }
        if closed {
            self.unblock(v);
        } else {
            for &w in &adjacency[v] {
                if self.in_component[w] && !self.b_lists[w].contains(&v) {
                    self.b_lists[w].push(v);
                }
            }
        }
        self.path.pop();
        closed
    }

    fn unblock(&mut self, v: usize) {
        self.blocked[v] = false;
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            for w in std::mem::take(&mut self.b_lists[u]) {
                if self.blocked[w] {
                    self.blocked[w] = false;
                    stack.push(w);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> ProcessId {
        ProcessId(n)
    }

    fn r(n: u32) -> ResourceId {
        ResourceId(n)
    }

    /// P0 holds R1 and wants R0; P1 holds R0 and wants R1.
    fn two_process_deadlock() -> ResourceGraph {
        let mut g = ResourceGraph::new();
        g.add_process(p(0), "P0").unwrap();
        g.add_process(p(1), "P1").unwrap();
        g.add_resource(r(0), "R0", 1).unwrap();
        g.add_resource(r(1), "R1", 1).unwrap();
        g.allocate(p(0), r(1), 1).unwrap();
        g.allocate(p(1), r(0), 1).unwrap();
        g.request(p(0), r(0), 1).unwrap();
        g.request(p(1), r(1), 1).unwrap();
        g
    }

    #[test]
    fn detects_two_process_cycle() {
        let g = two_process_deadlock();
        let report = g.report();
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.process_cycles(), vec![vec![p(0), p(1)]]);
        assert_eq!(
            report.cycles[0].path,
            vec![
                NodeId::Process(p(0)),
                NodeId::Resource(r(0)),
                NodeId::Process(p(1)),
                NodeId::Resource(r(1)),
            ]
        );
        assert_eq!(report.deadlocked.len(), 4);
        assert!(!report.truncated);
    }

    #[test]
    fn releasing_an_allocation_clears_the_cycle() {
        let mut g = two_process_deadlock();
        assert!(g.release(p(1), r(0)).unwrap());
        assert!(!g.is_deadlocked());
        assert!(g.report().deadlocked.is_empty());
    }

    #[test]
    fn terminate_recovers() {
        let mut g = two_process_deadlock();
        assert_eq!(g.recovery_candidates(), vec![p(0), p(1)]);
        let report = g.terminate_process(p(0)).unwrap();
        assert!(!report.has_cycle());
        assert_eq!(g.free_instances(r(1)), Some(1));
        assert_eq!(g.requests().count(), 1);
    }

    #[test]
    fn idempotent_no_ops() {
        let mut g = two_process_deadlock();
        assert!(!g.request(p(0), r(0), 1).unwrap());
        assert!(!g.release(p(0), r(0)).unwrap());
        assert!(!g.cancel_request(p(0), r(1)).unwrap());
        assert_eq!(g.report().cycles.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut g = ResourceGraph::new();
        g.add_process(p(0), "P0").unwrap();
        g.add_process(p(1), "P1").unwrap();
        g.add_resource(r(0), "R0", 2).unwrap();
        g.allocate(p(0), r(0), 2).unwrap();
        assert_eq!(
            g.allocate(p(1), r(0), 1),
            Err(GraphError::CapacityExceeded {
                resource: r(0),
                requested: 1,
                free: 0
            })
        );
        assert_eq!(
            g.request(p(1), r(0), 3),
            Err(GraphError::ExceedsTotal {
                resource: r(0),
                requested: 3,
                total: 2
            })
        );
        assert_eq!(g.allocate(p(1), r(0), 0), Err(GraphError::ZeroAmount));
    }

    #[test]
    fn unknown_and_duplicate_vertices() {
        let mut g = ResourceGraph::new();
        g.add_process(p(0), "P0").unwrap();
        assert_eq!(g.add_process(p(0), "again"), Err(GraphError::DuplicateProcess(p(0))));
        assert_eq!(g.add_resource(r(0), "R0", 0), Err(GraphError::ZeroInstances(r(0))));
        assert_eq!(g.request(p(0), r(9), 1), Err(GraphError::UnknownResource(r(9))));
        assert_eq!(g.release(p(5), r(9)), Err(GraphError::UnknownProcess(p(5))));
        assert_eq!(g.free_instances(r(9)), None);
    }

    #[test]
    fn grant_request_moves_edge() {
        let mut g = ResourceGraph::new();
        g.add_process(p(0), "P0").unwrap();
        g.add_resource(r(0), "R0", 3).unwrap();
        assert_eq!(
            g.grant_request(p(0), r(0)),
            Err(GraphError::NoSuchRequest {
                process: p(0),
                resource: r(0)
            })
        );
        g.request(p(0), r(0), 2).unwrap();
        g.grant_request(p(0), r(0)).unwrap();
        assert_eq!(g.requests().count(), 0);
        assert_eq!(g.free_instances(r(0)), Some(1));
    }

    #[test]
    fn independent_cycles_are_all_reported() {
        let mut g = two_process_deadlock();
        g.add_process(p(2), "P2").unwrap();
        g.add_process(p(3), "P3").unwrap();
        g.add_resource(r(2), "R2", 1).unwrap();
        g.add_resource(r(3), "R3", 1).unwrap();
        g.allocate(p(2), r(3), 1).unwrap();
        g.allocate(p(3), r(2), 1).unwrap();
        g.request(p(2), r(2), 1).unwrap();
        g.request(p(3), r(3), 1).unwrap();
        let cycles = g.report().process_cycles();
        assert_eq!(cycles, vec![vec![p(0), p(1)], vec![p(2), p(3)]]);
    }

    #[test]
    fn multi_instance_cycle_without_deadlock() {
        // P0 -> R0 (2 units, held by P1 and P2); P1 -> R1 held by P0.
        // A cycle exists, but P2 can finish and free a unit of R0.
        let mut g = ResourceGraph::new();
        for i in 0..3 {
            g.add_process(p(i), format!("P{i}")).unwrap();
        }
        g.add_resource(r(0), "R0", 2).unwrap();
        g.add_resource(r(1), "R1", 1).unwrap();
        g.allocate(p(1), r(0), 1).unwrap();
        g.allocate(p(2), r(0), 1).unwrap();
        g.allocate(p(0), r(1), 1).unwrap();
        g.request(p(0), r(0), 1).unwrap();
        g.request(p(1), r(1), 1).unwrap();

        assert!(g.is_deadlocked());
        let reduction = g.detect_by_reduction();
        assert!(!reduction.is_deadlocked());
        assert_eq!(reduction.completion_order, vec![p(2), p(0), p(1)]);
    }

    #[test]
    fn reduction_flags_single_instance_deadlock() {
        let g = two_process_deadlock();
        let reduction = g.detect_by_reduction();
        assert_eq!(reduction.deadlocked, vec![p(0), p(1)]);
        assert!(reduction.completion_order.is_empty());
    }

    #[test]
    fn detect_cycles_is_pure() {
        let g = two_process_deadlock();
        assert_eq!(g.detect_cycles(), g.detect_cycles());
        assert_eq!(&g.detect_cycles(), g.report());
    }
}
