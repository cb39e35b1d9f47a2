//! Error types shared by the ossim engines.
//!
//! Organized by subsystem: configuration (every engine), resource graph
//! mutation (deadlock detection), and Banker's matrices. Capacity and
//! no-fit conditions are *not* errors; engines report them as ordinary
//! outcomes.

use std::error::Error;
use std::fmt;

use crate::id::{ProcessId, ResourceId};

// ── ConfigError ────────────────────────────────────────────────────

/// Invalid parameters detected before a simulation starts.
///
/// Every engine validates its configuration at construction and refuses
/// to build on failure, so no tick ever runs against a bad config.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A probability was NaN or outside `[0, 1]`.
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A duration that must be at least one tick was zero.
    ZeroDuration {
        /// Parameter name.
        name: &'static str,
    },
    /// A `(min, max)` range had `min > max`.
    InvertedRange {
        /// Parameter name.
        name: &'static str,
        /// Lower bound as configured.
        min: u32,
        /// Upper bound as configured.
        max: u32,
    },
    /// A population that must be non-empty (threads, processes,
    /// producers, ...) had too few members.
    TooFew {
        /// What was counted.
        what: &'static str,
        /// Minimum accepted count.
        min: usize,
        /// Count as configured.
        found: usize,
    },
    /// Round-robin quantum must be at least one tick.
    ZeroQuantum,
    /// A capacity (buffer size, frame count, log capacity, memory size)
    /// was zero.
    ZeroCapacity {
        /// Parameter name.
        name: &'static str,
    },
    /// A requested block is larger than the whole memory.
    SizeExceedsMemory {
        /// Requested size.
        size: u64,
        /// Total memory size.
        total: u64,
    },
    /// A page reference string could not be parsed.
    MalformedReferenceString {
        /// Zero-based token position.
        position: usize,
        /// The offending token.
        token: String,
    },
    /// A disk request or head position lies outside the cylinder range.
    CylinderOutOfRange {
        /// The offending cylinder.
        cylinder: u32,
        /// Number of cylinders on the disk.
        cylinders: u32,
    },
    /// Two entities were configured with the same identifier.
    DuplicateId {
        /// Display form of the duplicated id.
        id: String,
    },
    /// tick_rate_hz is NaN, infinite, zero, or negative.
    InvalidTickRate {
        /// The invalid value.
        value: f64,
    },
    /// Catch-all for a parameter with a bespoke constraint.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the violated constraint.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProbability { name, value } => {
                write!(f, "{name} must be a probability in [0, 1], got {value}")
            }
            Self::ZeroDuration { name } => write!(f, "{name} must be at least one tick"),
            Self::InvertedRange { name, min, max } => {
                write!(f, "{name} range is inverted: min {min} > max {max}")
            }
            Self::TooFew { what, min, found } => {
                write!(f, "need at least {min} {what}, got {found}")
            }
            Self::ZeroQuantum => write!(f, "time quantum must be at least one tick"),
            Self::ZeroCapacity { name } => write!(f, "{name} must be at least 1"),
            Self::SizeExceedsMemory { size, total } => {
                write!(f, "block size {size} exceeds total memory {total}")
            }
            Self::MalformedReferenceString { position, token } => {
                write!(f, "malformed page reference '{token}' at position {position}")
            }
            Self::CylinderOutOfRange {
                cylinder,
                cylinders,
            } => write!(
                f,
                "cylinder {cylinder} outside disk range 0..{cylinders}"
            ),
            Self::DuplicateId { id } => write!(f, "duplicate id {id}"),
            Self::InvalidTickRate { value } => {
                write!(f, "tick_rate_hz must be finite and positive, got {value}")
            }
            Self::InvalidParameter { name, reason } => write!(f, "invalid {name}: {reason}"),
        }
    }
}

impl Error for ConfigError {}

impl ConfigError {
    /// Check that `value` is a finite probability.
    pub fn check_probability(name: &'static str, value: f64) -> Result<(), Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(Self::InvalidProbability { name, value })
        }
    }

    /// Check that a duration is at least one tick.
    pub fn check_duration(name: &'static str, value: u32) -> Result<(), Self> {
        if value == 0 {
            Err(Self::ZeroDuration { name })
        } else {
            Ok(())
        }
    }

    /// Check that `(min, max)` is a non-empty range of positive durations.
    pub fn check_duration_range(name: &'static str, (min, max): (u32, u32)) -> Result<(), Self> {
        Self::check_duration(name, min)?;
        if min > max {
            return Err(Self::InvertedRange { name, min, max });
        }
        Ok(())
    }
}

// ── GraphError ─────────────────────────────────────────────────────

/// Rejected mutations of a resource-allocation graph.
///
/// Idempotent no-ops (re-requesting an outstanding request, releasing a
/// resource that is not held) are not errors; the graph reports them as
/// `Ok(false)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// The process is not in the graph.
    UnknownProcess(ProcessId),
    /// The resource is not in the graph.
    UnknownResource(ResourceId),
    /// A process with this id already exists.
    DuplicateProcess(ProcessId),
    /// A resource with this id already exists.
    DuplicateResource(ResourceId),
    /// A resource must have at least one instance.
    ZeroInstances(ResourceId),
    /// An edge must carry at least one instance.
    ZeroAmount,
    /// Granting would push allocated instances past the resource total.
    CapacityExceeded {
        /// The resource.
        resource: ResourceId,
        /// Instances asked for.
        requested: u32,
        /// Instances currently free.
        free: u32,
    },
    /// A single edge asks for more instances than the resource will ever have.
    ExceedsTotal {
        /// The resource.
        resource: ResourceId,
        /// Instances asked for.
        requested: u32,
        /// The resource's total instances.
        total: u32,
    },
    /// The process has no outstanding request for this resource.
    NoSuchRequest {
        /// The process.
        process: ProcessId,
        /// The resource.
        resource: ResourceId,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProcess(p) => write!(f, "unknown process {p}"),
            Self::UnknownResource(r) => write!(f, "unknown resource {r}"),
            Self::DuplicateProcess(p) => write!(f, "process {p} already exists"),
            Self::DuplicateResource(r) => write!(f, "resource {r} already exists"),
            Self::ZeroInstances(r) => write!(f, "resource {r} needs at least one instance"),
            Self::ZeroAmount => write!(f, "edge must carry at least one instance"),
            Self::CapacityExceeded {
                resource,
                requested,
                free,
            } => write!(
                f,
                "{resource}: {requested} instance(s) requested but only {free} free"
            ),
            Self::ExceedsTotal {
                resource,
                requested,
                total,
            } => write!(
                f,
                "{resource}: {requested} instance(s) requested but the resource only has {total}"
            ),
            Self::NoSuchRequest { process, resource } => {
                write!(f, "{process} has no pending request for {resource}")
            }
        }
    }
}

impl Error for GraphError {}

// ── BankerError ────────────────────────────────────────────────────

/// Malformed Banker's matrices or requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BankerError {
    /// The system has no processes or no resource types.
    Empty,
    /// A matrix row or vector had the wrong length.
    DimensionMismatch {
        /// Which input was malformed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
    /// `max[process][resource] < allocation[process][resource]`, which would
    /// make the need matrix negative.
    MaxBelowAllocation {
        /// Process row.
        process: usize,
        /// Resource column.
        resource: usize,
    },
    /// Process index out of range.
    UnknownProcess {
        /// The offending index.
        index: usize,
    },
    /// A request asked for more than the process declared it would need.
    RequestExceedsNeed {
        /// Process row.
        process: usize,
        /// Resource column.
        resource: usize,
        /// Instances requested.
        requested: u32,
        /// Remaining need.
        need: u32,
    },
    /// A release returned more than the process holds.
    ReleaseExceedsAllocation {
        /// Process row.
        process: usize,
        /// Resource column.
        resource: usize,
        /// Instances released.
        released: u32,
        /// Instances held.
        held: u32,
    },
    /// `available + sum(allocation)` for a resource does not fit in a `u32`.
    Overflow {
        /// Resource column.
        resource: usize,
    },
}

impl fmt::Display for BankerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "banker state needs at least one process and one resource"),
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected length {expected}, got {found}"),
            Self::MaxBelowAllocation { process, resource } => write!(
                f,
                "max[{process}][{resource}] is below allocation[{process}][{resource}]"
            ),
            Self::UnknownProcess { index } => write!(f, "no process at index {index}"),
            Self::RequestExceedsNeed {
                process,
                resource,
                requested,
                need,
            } => write!(
                f,
                "P{process} requested {requested} of R{resource} but only needs {need}"
            ),
            Self::ReleaseExceedsAllocation {
                process,
                resource,
                released,
                held,
            } => write!(
                f,
                "P{process} released {released} of R{resource} but only holds {held}"
            ),
            Self::Overflow { resource } => {
                write!(f, "total instances of R{resource} exceed {}", u32::MAX)
            }
        }
    }
}

impl Error for BankerError {}
