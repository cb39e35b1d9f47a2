//! Threads simulated by the synchronization engines.

use ossim_core::ThreadId;

use crate::metrics::SyncMetrics;

/// One simulated thread.
///
/// `S` is the mode's state enum; `K` carries mode-specific identity such
/// as a producer/consumer role or a philosopher's seat.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncThread<S, K = ()> {
    /// Identifier, equal to the thread's index.
    pub id: ThreadId,
    /// Display name.
    pub name: String,
    /// Current state.
    pub state: S,
    /// Mode-specific identity.
    pub kind: K,
    /// Ticks until the current timed activity ends.
    pub action_timer: u32,
    /// Length of the current timed activity.
    pub duration: u32,
    /// Ticks spent waiting since the last grant.
    pub wait_ticks: u64,
}

impl<S, K> SyncThread<S, K> {
    pub(crate) fn new(index: usize, name: String, state: S, kind: K) -> Self {
        Self {
            id: ThreadId(index as u32),
            name,
            state,
            kind,
            action_timer: 0,
            duration: 0,
            wait_ticks: 0,
        }
    }

    /// Percentage of the current timed activity completed, 0-100.
    pub fn progress(&self) -> u8 {
        if self.duration == 0 {
            return 0;
        }
        let done = self.duration.saturating_sub(self.action_timer);
        ((u64::from(done) * 100) / u64::from(self.duration)) as u8
    }

    /// Start a timed activity of `ticks`.
    pub(crate) fn start_timer(&mut self, ticks: u32) {
        self.action_timer = ticks;
        self.duration = ticks;
    }

    /// Count the timer down. Returns `true` when it expires.
    pub(crate) fn count_down(&mut self) -> bool {
        self.action_timer = self.action_timer.saturating_sub(1);
        self.action_timer == 0
    }
}

/// Charge one tick of waiting to every thread for which `waiting` holds.
///
/// A thread's first waited tick counts as a contention.
pub(crate) fn age_waiting<S: Copy, K>(
    threads: &mut [SyncThread<S, K>],
    waiting: impl Fn(S) -> bool,
    metrics: &mut SyncMetrics,
) {
    for t in threads.iter_mut().filter(|t| waiting(t.state)) {
        if t.wait_ticks == 0 {
            metrics.contentions += 1;
        }
        t.wait_ticks += 1;
    }
}
