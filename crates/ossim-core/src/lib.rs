//! Core types and traits for the ossim simulators.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! abstractions every engine in the workspace shares: strongly-typed IDs,
//! the tick clock, error types, the injectable random source, the bounded
//! event log, and the [`Tickable`] trait drivers step through.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod log;
pub mod rng;
pub mod traits;

pub use error::{BankerError, ConfigError, GraphError};
pub use id::{Clock, ProcessId, ResourceId, ThreadId, TickId};
pub use log::{EventLog, LogEntry, DEFAULT_LOG_CAPACITY};
pub use rng::{RandomSource, SeededRandom};
pub use traits::{TickOutcome, Tickable};
