//! Ordered process registry.
//!
//! Backed by an [`IndexMap`] so iteration follows insertion order, which
//! coincides with id order because ids are handed out sequentially.
//! Removal uses `shift_remove` to keep that property.

use indexmap::IndexMap;

use ossim_core::ProcessId;

use crate::process::{ProcessSpec, ProcessState, SimulatedProcess};

/// Owns every process of one scheduling engine.
#[derive(Clone, Debug, Default)]
pub struct ProcessRegistry {
    processes: IndexMap<ProcessId, SimulatedProcess>,
    next_id: u32,
}

impl ProcessRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated from `specs`, ids assigned in order from 0.
    pub fn from_specs(specs: &[ProcessSpec]) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.insert(spec);
        }
        registry
    }

    /// Add a process in state [`ProcessState::New`] and return its id.
    pub fn insert(&mut self, spec: &ProcessSpec) -> ProcessId {
        let id = ProcessId(self.next_id);
        self.next_id += 1;
        self.processes
            .insert(id, SimulatedProcess::from_spec(id, spec));
        id
    }

    /// Remove a process, preserving the order of the rest.
    pub fn remove(&mut self, id: ProcessId) -> Option<SimulatedProcess> {
        self.processes.shift_remove(&id)
    }

    /// Look up a process.
    pub fn get(&self, id: ProcessId) -> Option<&SimulatedProcess> {
        self.processes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ProcessId) -> Option<&mut SimulatedProcess> {
        self.processes.get_mut(&id)
    }

    /// Processes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SimulatedProcess> + '_ {
        self.processes.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut SimulatedProcess> + '_ {
        self.processes.values_mut()
    }

    /// Processes currently in `state`, in id order.
    pub fn in_state(&self, state: ProcessState) -> impl Iterator<Item = &SimulatedProcess> + '_ {
        self.processes.values().filter(move |p| p.state == state)
    }

    /// Number of registered processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Whether every registered process has terminated.
    pub fn all_terminated(&self) -> bool {
        self.processes.values().all(|p| p.state.is_terminal())
    }

    /// Owned copy of every process, in id order.
    pub fn to_vec(&self) -> Vec<SimulatedProcess> {
        self.processes.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ProcessSpec> {
        vec![
            ProcessSpec::cpu_bound("A", 0, 3),
            ProcessSpec::cpu_bound("B", 1, 2),
            ProcessSpec::cpu_bound("C", 2, 1),
        ]
    }

    #[test]
    fn ids_are_sequential() {
        let reg = ProcessRegistry::from_specs(&specs());
        let ids: Vec<_> = reg.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProcessId(0), ProcessId(1), ProcessId(2)]);
    }

    #[test]
    fn remove_keeps_order_and_ids_are_not_reused() {
        let mut reg = ProcessRegistry::from_specs(&specs());
        let removed = reg.remove(ProcessId(1)).unwrap();
        assert_eq!(removed.name, "B");
        let names: Vec<_> = reg.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        let id = reg.insert(&ProcessSpec::cpu_bound("D", 0, 1));
        assert_eq!(id, ProcessId(3));
        assert!(reg.remove(ProcessId(1)).is_none());
    }

    #[test]
    fn all_terminated_checks_every_process() {
        let mut reg = ProcessRegistry::from_specs(&specs());
        assert!(!reg.all_terminated());
        for p in reg.iter_mut() {
            p.state = ProcessState::Terminated;
        }
        assert!(reg.all_terminated());
    }
}
