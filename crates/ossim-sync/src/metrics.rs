//! Counters shared by every synchronization mode.

/// Contention and progress statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncMetrics {
    /// Grants of the contended resource (lock, slot, fork pair, ...).
    pub acquisitions: u64,
    /// Requests that had to wait at least one tick.
    pub contentions: u64,
    /// Critical sections (or meals) run to completion.
    pub completed_sections: u64,
    /// Waiting ticks summed over all grants.
    pub total_wait_ticks: u64,
    /// Longest single wait before a grant.
    pub max_wait_ticks: u64,
    /// Deadlocks detected.
    pub deadlocks: u64,
    /// Recoveries performed.
    pub recoveries: u64,
    /// Items pushed into the bounded buffer.
    pub items_produced: u64,
    /// Items taken out of the bounded buffer.
    pub items_consumed: u64,
}

impl SyncMetrics {
    /// Mean wait per grant, `0.0` before the first grant.
    pub fn avg_wait_ticks(&self) -> f64 {
        if self.acquisitions == 0 {
            0.0
        } else {
            self.total_wait_ticks as f64 / self.acquisitions as f64
        }
    }

    pub(crate) fn record_acquisition(&mut self, waited: u64) {
        self.acquisitions += 1;
        self.total_wait_ticks += waited;
        self.max_wait_ticks = self.max_wait_ticks.max(waited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisitions_feed_wait_stats() {
        let mut m = SyncMetrics::default();
        assert_eq!(m.avg_wait_ticks(), 0.0);
        m.record_acquisition(0);
        m.record_acquisition(4);
        assert_eq!(m.acquisitions, 2);
        assert_eq!(m.max_wait_ticks, 4);
        assert!((m.avg_wait_ticks() - 2.0).abs() < 1e-9);
    }
}
