//! Contiguous memory allocation.
//!
//! Memory is a single address range `0..total` tiled by [`Block`]s, each
//! either a hole or owned by one process. Blocks are kept sorted by start
//! address and adjacent holes are always merged, so the block list is the
//! canonical memory map.

use std::fmt;
use std::ops::Range;

use tracing::debug;

use ossim_core::{ConfigError, ProcessId};

/// Hole-selection strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitStrategy {
    /// Lowest-addressed hole that fits.
    #[default]
    FirstFit,
    /// Smallest hole that fits.
    BestFit,
    /// Largest hole.
    WorstFit,
    /// First fit, resuming after the previous placement and wrapping.
    NextFit,
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstFit => "first-fit",
            Self::BestFit => "best-fit",
            Self::WorstFit => "worst-fit",
            Self::NextFit => "next-fit",
        })
    }
}

/// A contiguous run of addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// First address.
    pub start: u64,
    /// Length in address units.
    pub size: u64,
    /// Owning process; `None` for a hole.
    pub owner: Option<ProcessId>,
}

impl Block {
    /// One past the last address.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    /// Whether the block is free.
    pub fn is_hole(&self) -> bool {
        self.owner.is_none()
    }

    fn range(&self) -> Range<u64> {
        self.start..self.end()
    }
}

/// Result of an allocation request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AllocationOutcome {
    /// The block was placed at this address range.
    Placed(Range<u64>),
    /// No hole is large enough. Compaction may help.
    NoFit,
}

impl AllocationOutcome {
    /// The placed range, if any.
    pub fn range(&self) -> Option<&Range<u64>> {
        match self {
            Self::Placed(r) => Some(r),
            Self::NoFit => None,
        }
    }
}

/// Occupancy and fragmentation figures for a [`MemoryMap`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FragmentationStats {
    /// Total memory.
    pub total: u64,
    /// Allocated units.
    pub used: u64,
    /// Free units.
    pub free: u64,
    /// Number of holes.
    pub holes: usize,
    /// Size of the largest hole.
    pub largest_hole: u64,
    /// `1 - largest_hole / free`; zero when nothing is free.
    pub external_fragmentation: f64,
    /// `used / total`.
    pub utilization: f64,
}

/// A contiguous-allocation memory map.
#[derive(Clone, Debug)]
pub struct MemoryMap {
    total: u64,
    strategy: FitStrategy,
    blocks: Vec<Block>,
    cursor: u64,
}

impl MemoryMap {
    /// Empty memory of `total` units.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `total` is zero.
    pub fn new(total: u64, strategy: FitStrategy) -> Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "memory_size",
            });
        }
        Ok(Self {
            total,
            strategy,
            blocks: vec![Block {
                start: 0,
                size: total,
                owner: None,
            }],
            cursor: 0,
        })
    }

    /// Total memory.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Placement strategy.
    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    /// Switch strategy for future allocations.
    pub fn set_strategy(&mut self, strategy: FitStrategy) {
        self.strategy = strategy;
    }

    /// All blocks in address order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Holes in address order.
    pub fn holes(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter(|b| b.is_hole())
    }

    /// Range held by `owner`.
    pub fn allocation(&self, owner: ProcessId) -> Option<Range<u64>> {
        self.blocks
            .iter()
            .find(|b| b.owner == Some(owner))
            .map(Block::range)
    }

    /// Place a block of `size` units for `owner`.
    ///
    /// # Errors
    ///
    /// Fails if `size` is zero or larger than total memory, or if `owner`
    /// already holds a block. A request that simply does not fit any
    /// hole is `Ok(AllocationOutcome::NoFit)`.
    pub fn allocate(&mut self, owner: ProcessId, size: u64) -> Result<AllocationOutcome, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "size",
                reason: "block size must be at least 1".into(),
            });
        }
        if size > self.total {
            return Err(ConfigError::SizeExceedsMemory {
                size,
                total: self.total,
            });
        }
        if self.allocation(owner).is_some() {
            return Err(ConfigError::DuplicateId {
                id: owner.to_string(),
            });
        }

        let Some(index) = self.select_hole(size) else {
            debug!(%owner, size, strategy = %self.strategy, "no fit");
            return Ok(AllocationOutcome::NoFit);
        };
        let hole = self.blocks[index];
        self.blocks[index] = Block {
            start: hole.start,
            size,
            owner: Some(owner),
        };
        if hole.size > size {
            self.blocks.insert(
                index + 1,
                Block {
                    start: hole.start + size,
                    size: hole.size - size,
                    owner: None,
                },
            );
        }
        let placed = hole.start..hole.start + size;
        self.cursor = if placed.end == self.total { 0 } else { placed.end };
        debug!(%owner, start = placed.start, size, strategy = %self.strategy, "placed");
        Ok(AllocationOutcome::Placed(placed))
    }

    /// Release `owner`'s block, merging it with neighboring holes.
    ///
    /// Returns the freed range, or `None` if `owner` held nothing.
    pub fn free(&mut self, owner: ProcessId) -> Option<Range<u64>> {
        let index = self.blocks.iter().position(|b| b.owner == Some(owner))?;
        let freed = self.blocks[index].range();
        self.blocks[index].owner = None;
        self.coalesce();
        debug!(%owner, start = freed.start, end = freed.end, "freed");
        Some(freed)
    }

    /// Slide every allocated block toward address zero, leaving a single
    /// hole at the top. Returns how many blocks moved.
    pub fn compact(&mut self) -> usize {
        let mut next = 0;
        let mut moved = 0;
        let mut compacted: Vec<Block> = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.iter().filter(|b| !b.is_hole()) {
            if block.start != next {
                moved += 1;
            }
            compacted.push(Block {
                start: next,
                ..*block
            });
            next += block.size;
        }
        if next < self.total {
            compacted.push(Block {
                start: next,
                size: self.total - next,
                owner: None,
            });
        }
        self.blocks = compacted;
        self.cursor = if next == self.total { 0 } else { next };
        debug!(moved, used = next, "compacted");
        moved
    }

    /// Current fragmentation figures.
    pub fn stats(&self) -> FragmentationStats {
        let (mut free, mut holes, mut largest_hole) = (0, 0, 0);
        for hole in self.holes() {
            free += hole.size;
            holes += 1;
            largest_hole = largest_hole.max(hole.size);
        }
        let used = self.total - free;
        let external_fragmentation = if free == 0 {
            0.0
        } else {
            1.0 - largest_hole as f64 / free as f64
        };
        FragmentationStats {
            total: self.total,
            used,
            free,
            holes,
            largest_hole,
            external_fragmentation,
            utilization: used as f64 / self.total as f64,
        }
    }

    fn select_hole(&self, size: u64) -> Option<usize> {
        let fits = |&(_, b): &(usize, &Block)| b.is_hole() && b.size >= size;
        let mut candidates = self.blocks.iter().enumerate().filter(fits);
        match self.strategy {
            FitStrategy::FirstFit => candidates.next().map(|(i, _)| i),
            FitStrategy::BestFit => candidates
                .min_by_key(|(_, b)| (b.size, b.start))
                .map(|(i, _)| i),
            FitStrategy::WorstFit => candidates
                .max_by(|(_, a), (_, b)| a.size.cmp(&b.size).then(b.start.cmp(&a.start)))
                .map(|(i, _)| i),
            FitStrategy::NextFit => {
                let pivot = self
                    .blocks
                    .iter()
                    .position(|b| b.end() > self.cursor)
                    .unwrap_or(0);
                let n = self.blocks.len();
                (0..n)
                    .map(|k| (pivot + k) % n)
                    .find(|&i| fits(&(i, &self.blocks[i])))
            }
        }
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<Block> = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.is_hole() && block.is_hole() => prev.size += block.size,
                _ => merged.push(block),
            }
        }
        self.blocks = merged;
    }
}
