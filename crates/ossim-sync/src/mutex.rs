//! Mutex contention with a FIFO wait queue.

use std::collections::VecDeque;
use std::fmt;

use ossim_core::{RandomSource, ThreadId, TickOutcome};

use crate::config::MutexConfig;
use crate::machine::{SyncMode, TickContext};
use crate::thread::{age_waiting, SyncThread};

/// State of a thread competing for the mutex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MutexState {
    /// Running outside the critical section.
    Idle,
    /// Queued for the lock.
    Waiting,
    /// Holding the lock.
    Active,
}

impl fmt::Display for MutexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Waiting => "WAITING",
            Self::Active => "ACTIVE",
        })
    }
}

/// A mutex-mode thread.
pub type MutexThread = SyncThread<MutexState>;

/// Owned view of the mutex simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MutexSnapshot {
    /// Threads in id order.
    pub threads: Vec<MutexThread>,
    /// Lock holder.
    pub owner: Option<ThreadId>,
    /// Wait queue, head first.
    pub queue: Vec<ThreadId>,
}

impl MutexSnapshot {
    /// Whether the lock is held.
    pub fn locked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Mutex mode state.
///
/// Per tick: idle threads request the lock, the holder counts down and
/// releases, then a free lock goes to the queue head.
#[derive(Clone, Debug)]
pub struct MutexMode {
    config: MutexConfig,
    threads: Vec<MutexThread>,
    owner: Option<ThreadId>,
    queue: VecDeque<ThreadId>,
}

impl MutexMode {
    /// Threads in id order.
    pub fn threads(&self) -> &[MutexThread] {
        &self.threads
    }

    /// Lock holder.
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    fn request(&mut self, ctx: &mut TickContext<'_>) {
        for t in &mut self.threads {
            if t.state == MutexState::Idle && ctx.rng.chance(self.config.contention_rate) {
                t.state = MutexState::Waiting;
                self.queue.push_back(t.id);
                ctx.record(format!("{} requests the lock: IDLE -> WAITING", t.name));
            }
        }
    }

    fn release(&mut self, ctx: &mut TickContext<'_>) {
        let Some(owner) = self.owner else { return };
        let Some(t) = self.threads.get_mut(owner.0 as usize) else {
            self.owner = None;
            return;
        };
        if t.count_down() {
            t.state = MutexState::Idle;
            self.owner = None;
            ctx.metrics.completed_sections += 1;
            ctx.record(format!("{} releases the lock: ACTIVE -> IDLE", t.name));
        }
    }

    fn grant(&mut self, ctx: &mut TickContext<'_>) {
        if self.owner.is_some() {
            return;
        }
        let Some(next) = self.queue.pop_front() else { return };
        let Some(t) = self.threads.get_mut(next.0 as usize) else { return };
        t.state = MutexState::Active;
        t.start_timer(self.config.critical_section);
        ctx.metrics.record_acquisition(t.wait_ticks);
        ctx.record(format!(
            "{} acquires the lock after {} tick(s): WAITING -> ACTIVE",
            t.name, t.wait_ticks
        ));
        t.wait_ticks = 0;
        self.owner = Some(next);
    }
}

impl SyncMode for MutexMode {
    type Config = MutexConfig;
    type Snapshot = MutexSnapshot;

    const NAME: &'static str = "mutex";

    fn build(config: &MutexConfig, _rng: &mut dyn RandomSource) -> Self {
        let threads = (0..config.threads)
            .map(|i| SyncThread::new(i, format!("T{i}"), MutexState::Idle, ()))
            .collect();
        Self {
            config: config.clone(),
            threads,
            owner: None,
            queue: VecDeque::new(),
        }
    }

    fn config(&self) -> &MutexConfig {
        &self.config
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> TickOutcome {
        self.request(ctx);
        self.release(ctx);
        self.grant(ctx);
        age_waiting(&mut self.threads, |s| s == MutexState::Waiting, ctx.metrics);
        TickOutcome::Advanced
    }

    fn snapshot(&self) -> MutexSnapshot {
        MutexSnapshot {
            threads: self.threads.clone(),
            owner: self.owner,
            queue: self.queue.iter().copied().collect(),
        }
    }
}
