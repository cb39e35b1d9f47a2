//! Memory-management simulators for ossim.
//!
//! - [`MemoryMap`]: contiguous allocation with first/best/worst/next-fit
//!   placement, coalescing frees, and compaction.
//! - [`simulate_paging`]: demand paging over a reference string with FIFO,
//!   LRU, optimal, and clock replacement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocation;
pub mod paging;

pub use allocation::{AllocationOutcome, Block, FitStrategy, FragmentationStats, MemoryMap};
pub use paging::{parse_reference_string, simulate_paging, PageStep, PagingResult, ReplacementPolicy};
