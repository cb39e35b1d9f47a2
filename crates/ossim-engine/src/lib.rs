//! Simulation drivers for ossim.
//!
//! Wraps every tick-driven engine in one [`Simulation`] type and runs it
//! either in lockstep (caller-driven) or realtime (background thread)
//! mode:
//!
//! | Type | Role |
//! |------|------|
//! | [`SimulationConfig`] | which engine to build, with its config |
//! | [`Simulation`] | the engine itself; implements `Tickable` |
//! | [`LockstepSimulation`] | `step` / `run(n)` on the caller's thread |
//! | [`RealtimeSimulation`] | paced tick thread driven by commands |
//! | [`SimulationResult`] | summary handed to export collaborators |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod lockstep;
pub mod realtime;
pub mod result;
pub mod simulation;
mod tick_thread;

pub use config::{DriverConfig, SimulationConfig, SimulationKind};
pub use error::DriverError;
pub use lockstep::{LockstepSimulation, RunReport};
pub use realtime::RealtimeSimulation;
pub use result::{MetricsSummary, SimulationResult};
pub use simulation::{Simulation, SimulationSnapshot};
