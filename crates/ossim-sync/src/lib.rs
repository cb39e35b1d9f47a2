//! Synchronization-primitive simulators for ossim.
//!
//! One generic [`SyncEngine`] drives four modes through the same
//! tick / log / metrics / halt machinery:
//!
//! | Mode | Primitive | Alias |
//! |------|-----------|-------|
//! | [`MutexMode`] | lock with FIFO wait queue | [`MutexSim`] |
//! | [`SemaphoreMode`] | bounded buffer, `mutex` / `empty` / `full` | [`SemaphoreSim`] |
//! | [`ReadersWritersMode`] | shared/exclusive access, reader preference | [`ReadersWritersSim`] |
//! | [`PhilosophersMode`] | dining philosophers, deadlock detection | [`PhilosophersSim`] |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod machine;
pub mod metrics;
pub mod mutex;
pub mod philosophers;
pub mod readers_writers;
pub mod semaphore;
pub mod thread;

pub use config::{
    ForkPolicy, ModeConfig, MutexConfig, PhilosophersConfig, ReadersWritersConfig,
    SemaphoreConfig,
};
pub use machine::{SyncEngine, SyncMode, SyncSnapshot, TickContext};
pub use metrics::SyncMetrics;
pub use mutex::{MutexMode, MutexSnapshot, MutexState, MutexThread};
pub use philosophers::{
    Philosopher, PhilosopherState, PhilosophersMode, PhilosophersSnapshot, Seat,
};
pub use readers_writers::{Access, ReadersWritersMode, RwSnapshot, RwState, RwThread};
pub use semaphore::{Role, SemaphoreMode, SemaphoreSnapshot, SemaphoreState, SemaphoreThread};
pub use thread::SyncThread;

use ossim_core::SeededRandom;

/// Mutex simulation.
pub type MutexSim<R = SeededRandom> = SyncEngine<MutexMode, R>;
/// Bounded-buffer simulation.
pub type SemaphoreSim<R = SeededRandom> = SyncEngine<SemaphoreMode, R>;
/// Readers-writers simulation.
pub type ReadersWritersSim<R = SeededRandom> = SyncEngine<ReadersWritersMode, R>;
/// Dining-philosophers simulation.
pub type PhilosophersSim<R = SeededRandom> = SyncEngine<PhilosophersMode, R>;
