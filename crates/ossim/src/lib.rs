//! ossim: tick-driven operating-system simulators.
//!
//! This is the facade crate that re-exports the public API from all ossim
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use ossim::prelude::*;
//!
//! let config = SimulationConfig::Cpu(SchedulerConfig::with_processes(vec![
//!     ProcessSpec::cpu_bound("A", 0, 3),
//!     ProcessSpec::cpu_bound("B", 1, 2),
//! ]));
//! let mut sim = LockstepSimulation::new(config).unwrap();
//! let report = sim.run(100);
//! assert_eq!(report.outcome, TickOutcome::Completed);
//!
//! // The Banker's algorithm on one resource type.
//! let safety = check_safety(&[vec![1], vec![2]], &[vec![3], vec![4]], &[2]).unwrap();
//! assert!(safety.is_safe);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ossim-core` | IDs, clock, event log, random sources, errors |
//! | [`sched`] | `ossim-sched` | SRTF lifecycle, batch schedulers, metrics |
//! | [`deadlock`] | `ossim-deadlock` | Resource graph and Banker's algorithm |
//! | [`sync`] | `ossim-sync` | Mutex, semaphore, readers-writers, philosophers |
//! | [`memory`] | `ossim-memory` | Contiguous allocation and paging |
//! | [`disk`] | `ossim-disk` | Disk-arm scheduling |
//! | [`engine`] | `ossim-engine` | Lockstep and realtime drivers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// IDs, clock, event log, random sources, and errors (`ossim-core`).
pub use ossim_core as types;

/// CPU scheduling (`ossim-sched`).
///
/// [`sched::CpuScheduler`] runs the tick-driven SRTF lifecycle;
/// [`sched::schedule`] runs a batch policy to completion.
pub use ossim_sched as sched;

/// Deadlock detection and avoidance (`ossim-deadlock`).
pub use ossim_deadlock as deadlock;

/// Synchronization simulators (`ossim-sync`).
pub use ossim_sync as sync;

/// Contiguous allocation and page replacement (`ossim-memory`).
pub use ossim_memory as memory;

/// Disk-arm scheduling (`ossim-disk`).
pub use ossim_disk as disk;

/// Simulation drivers (`ossim-engine`).
///
/// [`engine::LockstepSimulation`] for caller-driven stepping,
/// [`engine::RealtimeSimulation`] for a paced background thread.
pub use ossim_engine as engine;

/// Common imports for typical ossim usage.
///
/// ```rust
/// use ossim::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use ossim_core::{
        ConfigError, ProcessId, RandomSource, ResourceId, SeededRandom, ThreadId, TickId,
        TickOutcome, Tickable,
    };

    // Scheduling
    pub use ossim_sched::{schedule, Algorithm, CpuScheduler, ProcessSpec, SchedulerConfig};

    // Deadlock
    pub use ossim_deadlock::{check_safety, BankerState, ResourceGraph};

    // Synchronization
    pub use ossim_sync::{
        ForkPolicy, MutexConfig, PhilosophersConfig, ReadersWritersConfig, SemaphoreConfig,
    };

    // Memory and disk
    pub use ossim_disk::{schedule_disk, DiskPolicy, DiskQueue};
    pub use ossim_memory::{simulate_paging, FitStrategy, MemoryMap, ReplacementPolicy};

    // Engine
    pub use ossim_engine::{
        DriverConfig, LockstepSimulation, RealtimeSimulation, SimulationConfig, SimulationKind,
        SimulationResult,
    };
}
