//! Deadlock detection and avoidance for ossim.
//!
//! - [`ResourceGraph`]: a mutable resource-allocation graph that
//!   re-runs cycle detection after every change, with termination-based
//!   recovery and a multi-instance reduction check.
//! - [`BankerState`] / [`check_safety`]: the Banker's safety search with a
//!   full per-check trace, plus the resource-request algorithm.
//!
//! Both analyses are pure queries over their inputs; neither is ticked.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod banker;
pub mod graph;

pub use banker::{check_safety, BankerState, RequestOutcome, SafetyReport, SafetyStep};
pub use graph::{
    Cycle, CycleReport, Edge, NodeId, ProcessNode, ReductionReport, ResourceGraph, ResourceNode,
    MAX_REPORTED_CYCLES,
};
