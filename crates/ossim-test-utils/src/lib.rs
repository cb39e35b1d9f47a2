//! Test utilities for ossim development.
//!
//! Provides [`ScriptedRandom`], a [`RandomSource`] that replays a fixed
//! list of draws so tests can force exact interleavings, plus the shared
//! workloads and graphs in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use ossim_core::RandomSource;

/// Random source that replays `script`, then returns `fallback` forever.
///
/// [`restart`](RandomSource::restart) rewinds to the first scripted draw,
/// so engine resets replay the same interleaving.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    script: Vec<f64>,
    fallback: f64,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(script: Vec<f64>, fallback: f64) -> Self {
        Self {
            script,
            fallback,
            cursor: 0,
        }
    }

    /// Every draw returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(Vec::new(), value)
    }

    /// Number of draws taken since construction or the last restart.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        let value = self.script.get(self.cursor).copied().unwrap_or(self.fallback);
        self.cursor += 1;
        value
    }

    fn restart(&mut self) {
        self.cursor = 0;
    }
}

/// Install a `tracing` subscriber that writes to the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
