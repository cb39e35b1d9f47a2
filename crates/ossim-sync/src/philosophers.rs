//! Dining philosophers with deadlock detection and recovery.
//!
//! Fork `i` lies between philosopher `i` and philosopher `(i + 1) mod N`:
//! philosopher `i` eats with fork `i` on the left and fork `i - 1` (mod N)
//! on the right. A hungry philosopher picks up at most one fork per tick.

use std::fmt;

use tracing::trace;

use ossim_core::{RandomSource, ThreadId, TickOutcome};

use crate::config::{ForkPolicy, PhilosophersConfig};
use crate::machine::{SyncMode, TickContext};
use crate::thread::{age_waiting, SyncThread};

/// State of a philosopher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhilosopherState {
    /// Counting down a thinking period.
    Thinking,
    /// Collecting forks.
    Hungry,
    /// Holding both forks.
    Eating,
}

impl fmt::Display for PhilosopherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Thinking => "THINKING",
            Self::Hungry => "HUNGRY",
            Self::Eating => "EATING",
        })
    }
}

/// The two forks a philosopher eats with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Seat {
    /// Left fork index.
    pub left: usize,
    /// Right fork index.
    pub right: usize,
}

impl Seat {
    fn at(index: usize, table: usize) -> Self {
        Self {
            left: index,
            right: (index + table - 1) % table,
        }
    }

    /// Forks in the order `policy` picks them up.
    pub fn pickup_order(self, policy: ForkPolicy) -> [usize; 2] {
        match policy {
            ForkPolicy::Naive => [self.left, self.right],
            ForkPolicy::Ordered => [self.left.min(self.right), self.left.max(self.right)],
        }
    }
}

/// A philosopher.
pub type Philosopher = SyncThread<PhilosopherState, Seat>;

/// Owned view of the table.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhilosophersSnapshot {
    /// Philosophers in seat order.
    pub philosophers: Vec<Philosopher>,
    /// Holder of each fork.
    pub forks: Vec<Option<ThreadId>>,
    /// Acquisition policy in effect.
    pub policy: ForkPolicy,
}

impl PhilosophersSnapshot {
    /// Number of forks held by `id`.
    pub fn forks_held(&self, id: ThreadId) -> usize {
        self.forks.iter().filter(|f| **f == Some(id)).count()
    }
}

/// Dining-philosophers mode state.
#[derive(Clone, Debug)]
pub struct PhilosophersMode {
    config: PhilosophersConfig,
    philosophers: Vec<Philosopher>,
    forks: Vec<Option<ThreadId>>,
}

impl PhilosophersMode {
    /// Philosophers in seat order.
    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    /// Holder of each fork.
    pub fn forks(&self) -> &[Option<ThreadId>] {
        &self.forks
    }

    fn held_by(&self, id: ThreadId) -> usize {
        self.forks.iter().filter(|f| **f == Some(id)).count()
    }

    /// Every philosopher hungry, each clutching exactly one fork.
    fn circular_wait(&self) -> bool {
        self.philosophers
            .iter()
            .all(|p| p.state == PhilosopherState::Hungry && self.held_by(p.id) == 1)
    }

    fn think(p: &mut Philosopher, config: &PhilosophersConfig, rng: &mut dyn RandomSource) {
        let (lo, hi) = config.think_time;
        p.state = PhilosopherState::Thinking;
        p.start_timer(rng.range_inclusive(lo, hi));
        p.wait_ticks = 0;
    }

    fn step_one(&mut self, index: usize, ctx: &mut TickContext<'_>) {
        let policy = self.config.policy;
        let Some(p) = self.philosophers.get_mut(index) else { return };
        match p.state {
            PhilosopherState::Thinking => {
                if p.count_down() {
                    p.state = PhilosopherState::Hungry;
                    ctx.record(format!("{} is hungry: THINKING -> HUNGRY", p.name));
                }
            }
            PhilosopherState::Hungry => {
                let order = p.kind.pickup_order(policy);
                let Some(&fork) = order.iter().find(|&&f| self.forks[f] != Some(p.id)) else {
                    return;
                };
                match self.forks[fork] {
                    Some(holder) => {
                        trace!(philosopher = %p.id, fork, %holder, "fork busy");
                    }
                    None => {
                        self.forks[fork] = Some(p.id);
                        ctx.record(format!("{} picks up fork {fork}", p.name));
                        if order.iter().all(|&f| self.forks[f] == Some(p.id)) {
                            let (lo, hi) = self.config.eat_time;
                            p.state = PhilosopherState::Eating;
                            p.start_timer(ctx.rng.range_inclusive(lo, hi));
                            ctx.metrics.record_acquisition(p.wait_ticks);
                            p.wait_ticks = 0;
                            ctx.record(format!("{} starts eating: HUNGRY -> EATING", p.name));
                        }
                    }
                }
            }
            PhilosopherState::Eating => {
                if p.count_down() {
                    let seat = p.kind;
                    for fork in [seat.left, seat.right] {
                        if self.forks[fork] == Some(p.id) {
                            self.forks[fork] = None;
                        }
                    }
                    ctx.metrics.completed_sections += 1;
                    Self::think(p, &self.config, ctx.rng);
                    ctx.record(format!(
                        "{} puts down forks {} and {}: EATING -> THINKING",
                        p.name, seat.left, seat.right
                    ));
                }
            }
        }
    }
}

impl SyncMode for PhilosophersMode {
    type Config = PhilosophersConfig;
    type Snapshot = PhilosophersSnapshot;

    const NAME: &'static str = "dining-philosophers";

    fn build(config: &PhilosophersConfig, rng: &mut dyn RandomSource) -> Self {
        let n = config.philosophers;
        let philosophers = (0..n)
            .map(|i| {
                let mut p = SyncThread::new(
                    i,
                    format!("Philosopher {i}"),
                    PhilosopherState::Thinking,
                    Seat::at(i, n),
                );
                Self::think(&mut p, config, rng);
                p
            })
            .collect();
        Self {
            config: config.clone(),
            philosophers,
            forks: vec![None; n],
        }
    }

    fn config(&self) -> &PhilosophersConfig {
        &self.config
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> TickOutcome {
        for index in 0..self.philosophers.len() {
            self.step_one(index, ctx);
        }
        if self.circular_wait() {
            return TickOutcome::Deadlocked;
        }
        age_waiting(
            &mut self.philosophers,
            |s| s == PhilosopherState::Hungry,
            ctx.metrics,
        );
        TickOutcome::Advanced
    }

    fn snapshot(&self) -> PhilosophersSnapshot {
        PhilosophersSnapshot {
            philosophers: self.philosophers.clone(),
            forks: self.forks.clone(),
            policy: self.config.policy,
        }
    }

    fn recover(&mut self, ctx: &mut TickContext<'_>) -> bool {
        self.forks.iter_mut().for_each(|f| *f = None);
        for p in &mut self.philosophers {
            Self::think(p, &self.config, ctx.rng);
        }
        ctx.record("recovery: all forks released, every philosopher back to THINKING");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncEngine;
    use ossim_core::Tickable;

    fn table(policy: ForkPolicy) -> SyncEngine<PhilosophersMode> {
        // Everyone thinks for exactly one tick, so all turn hungry together.
        SyncEngine::new(PhilosophersConfig {
            philosophers: 5,
            think_time: (1, 1),
            eat_time: (2, 2),
            policy,
            ..PhilosophersConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn seats_wrap_around() {
        assert_eq!(Seat::at(0, 5), Seat { left: 0, right: 4 });
        assert_eq!(Seat::at(3, 5), Seat { left: 3, right: 2 });
        assert_eq!(Seat::at(0, 5).pickup_order(ForkPolicy::Ordered), [0, 4]);
        assert_eq!(Seat::at(3, 5).pickup_order(ForkPolicy::Ordered), [2, 3]);
        assert_eq!(Seat::at(0, 5).pickup_order(ForkPolicy::Naive), [0, 4]);
    }

    #[test]
    fn naive_policy_deadlocks_and_freezes() {
        let mut e = table(ForkPolicy::Naive);
        assert_eq!(e.tick(), TickOutcome::Advanced); // all hungry
        assert_eq!(e.tick(), TickOutcome::Deadlocked); // all hold their left fork
        let snap = e.snapshot();
        assert!(snap.halted);
        assert_eq!(snap.metrics.deadlocks, 1);
        let owners: Vec<_> = snap.state.forks.iter().map(|f| f.unwrap()).collect();
        let distinct: std::collections::BTreeSet<_> = owners.iter().collect();
        assert_eq!(distinct.len(), 5);
        assert!(snap
            .state
            .philosophers
            .iter()
            .all(|p| p.state == PhilosopherState::Hungry));

        // Frozen: further ticks change nothing and do not recount.
        assert_eq!(e.tick(), TickOutcome::Deadlocked);
        assert_eq!(e.snapshot().state, snap.state);
        assert_eq!(e.metrics().deadlocks, 1);
    }

    #[test]
    fn recovery_releases_everything() {
        let mut e = table(ForkPolicy::Naive);
        e.tick();
        e.tick();
        assert!(e.recover());
        let snap = e.snapshot();
        assert!(!snap.halted);
        assert!(snap.state.forks.iter().all(Option::is_none));
        assert!(snap
            .state
            .philosophers
            .iter()
            .all(|p| p.state == PhilosopherState::Thinking));
        assert_eq!(snap.metrics.recoveries, 1);
        assert!(!e.recover());
    }

    #[test]
    fn ordered_policy_never_deadlocks() {
        let mut e = table(ForkPolicy::Ordered);
        for _ in 0..500 {
            assert_eq!(e.tick(), TickOutcome::Advanced);
        }
        assert_eq!(e.metrics().deadlocks, 0);
        assert!(e.metrics().completed_sections > 0);
    }
}
