//! Injectable randomness.
//!
//! Every stochastic decision in the engines (I/O interrupts, lock
//! contention, think times) goes through [`RandomSource`]. The default
//! [`SeededRandom`] wraps a ChaCha8 generator so identical seeds replay
//! identical runs; tests substitute scripted sources to force exact
//! interleavings.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of uniform random draws.
///
/// Implementors only need [`next_f64`](RandomSource::next_f64); the other
/// methods derive from it. `Send` so engines can move to a driver thread.
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Bernoulli trial: `true` with probability `p`.
    ///
    /// `p <= 0` never fires, `p >= 1` always fires.
    fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_f64() < p
    }

    /// Uniform integer in `[lo, hi]`. Returns `lo` when `hi <= lo`.
    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        let span = u64::from(hi - lo) + 1;
        let offset = (self.next_f64() * span as f64) as u64;
        lo + offset.min(span - 1) as u32
    }

    /// Rewind to the start of the stream, if the source supports it.
    ///
    /// Called by engine resets. The default is a no-op, so scripted or
    /// external sources simply continue where they left off.
    fn restart(&mut self) {}
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }

    fn chance(&mut self, p: f64) -> bool {
        (**self).chance(p)
    }

    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        (**self).range_inclusive(lo, hi)
    }

    fn restart(&mut self) {
        (**self).restart()
    }
}

/// Deterministic ChaCha8-backed random source.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }

    fn restart(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}
