//! Disk-arm scheduling for ossim.
//!
//! [`schedule_disk`] runs one of six classic policies over a
//! [`DiskQueue`] and reports the service order, the head's path, and the
//! total seek distance.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod schedule;

pub use schedule::{schedule_disk, Direction, DiskPolicy, DiskQueue, DiskSchedule};
