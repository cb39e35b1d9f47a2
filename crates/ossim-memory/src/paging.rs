//! Demand paging over a page reference string.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use ossim_core::ConfigError;

/// Page-replacement policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplacementPolicy {
    /// Evict the page loaded earliest.
    #[default]
    Fifo,
    /// Evict the page used least recently.
    Lru,
    /// Evict the page whose next use is farthest away (Belady's MIN).
    Optimal,
    /// Second chance: a circular hand clears reference bits until it
    /// finds an unreferenced frame.
    Clock,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fifo => "FIFO",
            Self::Lru => "LRU",
            Self::Optimal => "OPT",
            Self::Clock => "Clock",
        })
    }
}

/// Frame contents after one reference.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageStep {
    /// The referenced page.
    pub page: u32,
    /// Frame contents after servicing the reference.
    pub frames: Vec<Option<u32>>,
    /// Whether the page was already resident.
    pub hit: bool,
    /// Page evicted to make room, if any.
    pub evicted: Option<u32>,
}

/// Outcome of [`simulate_paging`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PagingResult {
    /// Policy simulated.
    pub policy: ReplacementPolicy,
    /// Number of frames.
    pub frame_count: usize,
    /// One entry per reference.
    pub steps: Vec<PageStep>,
    /// Page faults, cold misses included.
    pub faults: usize,
    /// Hits.
    pub hits: usize,
}

impl PagingResult {
    /// `hits / references`, zero for an empty string.
    pub fn hit_ratio(&self) -> f64 {
        match self.steps.len() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }

    /// `faults / references`, zero for an empty string.
    pub fn fault_ratio(&self) -> f64 {
        match self.steps.len() {
            0 => 0.0,
            n => self.faults as f64 / n as f64,
        }
    }
}

/// Parse page numbers separated by whitespace and/or commas.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedReferenceString`] for the first token
/// that is not a non-negative integer, and [`ConfigError::TooFew`] if the
/// input holds no references at all.
pub fn parse_reference_string(input: &str) -> Result<Vec<u32>, ConfigError> {
    let pages = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(position, token)| {
            token
                .parse::<u32>()
                .map_err(|_| ConfigError::MalformedReferenceString {
                    position,
                    token: token.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if pages.is_empty() {
        return Err(ConfigError::TooFew {
            what: "page references",
            min: 1,
            found: 0,
        });
    }
    Ok(pages)
}

/// Frame table plus the bookkeeping every policy needs.
struct Frames {
    pages: Vec<Option<u32>>,
    loaded: VecDeque<usize>,
    last_used: Vec<usize>,
    referenced: Vec<bool>,
    hand: usize,
}

impl Frames {
    fn new(count: usize) -> Self {
        Self {
            pages: vec![None; count],
            loaded: VecDeque::with_capacity(count),
            last_used: vec![0; count],
            referenced: vec![false; count],
            hand: 0,
        }
    }

    fn victim(&mut self, policy: ReplacementPolicy, refs: &[u32], now: usize) -> usize {
        match policy {
            ReplacementPolicy::Fifo => self.loaded.pop_front().unwrap_or(0),
            ReplacementPolicy::Lru => (0..self.pages.len())
                .min_by_key(|&slot| self.last_used[slot])
                .unwrap_or(0),
            ReplacementPolicy::Optimal => {
                let next_use = |slot: usize| {
                    self.pages[slot]
                        .and_then(|page| refs[now + 1..].iter().position(|&r| r == page))
                        .unwrap_or(usize::MAX)
                };
                // Ties go to the lowest slot.
                (0..self.pages.len())
                    .rev()
                    .max_by_key(|&slot| next_use(slot))
                    .unwrap_or(0)
            }
            ReplacementPolicy::Clock => {
                while self.referenced[self.hand] {
                    self.referenced[self.hand] = false;
                    self.hand = (self.hand + 1) % self.pages.len();
                }
                let slot = self.hand;
                self.hand = (self.hand + 1) % self.pages.len();
                slot
            }
        }
    }

    fn load(&mut self, slot: usize, page: u32, now: usize) -> Option<u32> {
        let evicted = self.pages[slot].replace(page);
        self.loaded.push_back(slot);
        self.touch(slot, now);
        evicted
    }

    fn touch(&mut self, slot: usize, now: usize) {
        self.last_used[slot] = now;
        self.referenced[slot] = true;
    }
}

/// Run `policy` over `refs` with `frames` page frames.
///
/// # Errors
///
/// Returns [`ConfigError::ZeroCapacity`] if `frames` is zero.
pub fn simulate_paging(
    policy: ReplacementPolicy,
    frames: usize,
    refs: &[u32],
) -> Result<PagingResult, ConfigError> {
    if frames == 0 {
        return Err(ConfigError::ZeroCapacity { name: "frames" });
    }
    let mut table = Frames::new(frames);
    let mut steps = Vec::with_capacity(refs.len());
    let mut faults = 0;

    for (now, &page) in refs.iter().enumerate() {
        if let Some(slot) = table.pages.iter().position(|&p| p == Some(page)) {
            table.touch(slot, now);
            steps.push(PageStep {
                page,
                frames: table.pages.clone(),
                hit: true,
                evicted: None,
            });
            continue;
        }
        faults += 1;
        let slot = match table.pages.iter().position(Option::is_none) {
            Some(free) => free,
            None => table.victim(policy, refs, now),
        };
        let evicted = table.load(slot, page, now);
        steps.push(PageStep {
            page,
            frames: table.pages.clone(),
            hit: false,
            evicted,
        });
    }

    let hits = refs.len() - faults;
    debug!(%policy, frames, references = refs.len(), faults, hits, "paging simulated");
    Ok(PagingResult {
        policy,
        frame_count: frames,
        steps,
        faults,
        hits,
    })
}
