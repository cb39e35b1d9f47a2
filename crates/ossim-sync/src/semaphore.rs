//! Bounded-buffer producer/consumer with counting semaphores.
//!
//! Three counters gate the buffer: `mutex` (binary, buffer access),
//! `empty` (free slots), and `full` (filled slots). A producer reserves a
//! slot when it starts and pushes its item when it finishes, so the buffer
//! never holds more than its capacity.

use std::collections::VecDeque;
use std::fmt;

use ossim_core::{RandomSource, TickOutcome};

use crate::config::SemaphoreConfig;
use crate::machine::{SyncMode, TickContext};
use crate::thread::{age_waiting, SyncThread};

/// Which side of the buffer a thread works.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Pushes items.
    Producer,
    /// Pops items.
    Consumer,
}

/// State of a producer or consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SemaphoreState {
    /// Not interested in the buffer.
    Idle,
    /// Blocked on `empty`/`full` or `mutex`.
    Waiting,
    /// Producing or consuming; holds `mutex`.
    Active,
}

impl fmt::Display for SemaphoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Waiting => "WAITING",
            Self::Active => "ACTIVE",
        })
    }
}

/// A semaphore-mode thread.
pub type SemaphoreThread = SyncThread<SemaphoreState, Role>;

/// Owned view of the bounded-buffer simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SemaphoreSnapshot {
    /// Producers first, then consumers.
    pub threads: Vec<SemaphoreThread>,
    /// Items in the buffer, oldest first.
    pub buffer: Vec<u64>,
    /// Buffer slots.
    pub capacity: usize,
    /// Binary access semaphore.
    pub mutex: u32,
    /// Free-slot semaphore.
    pub empty: u32,
    /// Filled-slot semaphore.
    pub full: u32,
}

/// Bounded-buffer mode state.
#[derive(Clone, Debug)]
pub struct SemaphoreMode {
    config: SemaphoreConfig,
    threads: Vec<SemaphoreThread>,
    buffer: VecDeque<u64>,
    mutex: u32,
    empty: u32,
    full: u32,
    next_item: u64,
}

impl SemaphoreMode {
    /// Threads, producers first.
    pub fn threads(&self) -> &[SemaphoreThread] {
        &self.threads
    }

    /// Items currently buffered.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn complete(&mut self, ctx: &mut TickContext<'_>) {
        for t in &mut self.threads {
            if t.state != SemaphoreState::Active || !t.count_down() {
                continue;
            }
            match t.kind {
                Role::Producer => {
                    let item = self.next_item;
                    self.next_item += 1;
                    self.buffer.push_back(item);
                    self.full += 1;
                    ctx.metrics.items_produced += 1;
                    ctx.record(format!("{} produced item #{item}: signal(full)", t.name));
                }
                Role::Consumer => {
                    let item = self.buffer.pop_front();
                    self.empty += 1;
                    ctx.metrics.items_consumed += 1;
                    match item {
                        Some(item) => {
                            ctx.record(format!("{} consumed item #{item}: signal(empty)", t.name))
                        }
                        None => ctx.record(format!("{} found the buffer empty", t.name)),
                    }
                }
            }
            self.mutex += 1;
            t.state = SemaphoreState::Idle;
            ctx.metrics.completed_sections += 1;
        }
    }

    fn attempt(&mut self, ctx: &mut TickContext<'_>) {
        for t in &mut self.threads {
            if t.state == SemaphoreState::Idle && ctx.rng.chance(self.config.activity_rate) {
                t.state = SemaphoreState::Waiting;
            }
            if t.state != SemaphoreState::Waiting {
                continue;
            }
            let (slots, time, verb) = match t.kind {
                Role::Producer => (&mut self.empty, self.config.produce_time, "produce"),
                Role::Consumer => (&mut self.full, self.config.consume_time, "consume"),
            };
            if *slots > 0 && self.mutex > 0 {
                *slots -= 1;
                self.mutex -= 1;
                t.state = SemaphoreState::Active;
                t.start_timer(time);
                ctx.metrics.record_acquisition(t.wait_ticks);
                t.wait_ticks = 0;
                ctx.record(format!("{} starts to {verb}: wait(mutex) -> ACTIVE", t.name));
            } else if t.wait_ticks == 0 {
                let blocker = match t.kind {
                    _ if self.mutex == 0 => "mutex",
                    Role::Producer => "empty",
                    Role::Consumer => "full",
                };
                ctx.record(format!("{} blocked on {blocker}: WAITING", t.name));
            }
        }
    }
}

impl SyncMode for SemaphoreMode {
    type Config = SemaphoreConfig;
    type Snapshot = SemaphoreSnapshot;

    const NAME: &'static str = "semaphore";

    fn build(config: &SemaphoreConfig, _rng: &mut dyn RandomSource) -> Self {
        let producers = (0..config.producers).map(|i| (format!("Producer {i}"), Role::Producer));
        let consumers = (0..config.consumers).map(|i| (format!("Consumer {i}"), Role::Consumer));
        let threads = producers
            .chain(consumers)
            .enumerate()
            .map(|(index, (name, role))| SyncThread::new(index, name, SemaphoreState::Idle, role))
            .collect();
        Self {
            config: config.clone(),
            threads,
            buffer: VecDeque::with_capacity(config.buffer_size),
            mutex: 1,
            empty: u32::try_from(config.buffer_size).unwrap_or(u32::MAX),
            full: 0,
            next_item: 1,
        }
    }

    fn config(&self) -> &SemaphoreConfig {
        &self.config
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> TickOutcome {
        self.complete(ctx);
        self.attempt(ctx);
        age_waiting(&mut self.threads, |s| s == SemaphoreState::Waiting, ctx.metrics);
        TickOutcome::Advanced
    }

    fn snapshot(&self) -> SemaphoreSnapshot {
        SemaphoreSnapshot {
            threads: self.threads.clone(),
            buffer: self.buffer.iter().copied().collect(),
            capacity: self.config.buffer_size,
            mutex: self.mutex,
            empty: self.empty,
            full: self.full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncEngine;
    use ossim_core::Tickable;
    use ossim_test_utils::ScriptedRandom;

    fn engine(buffer_size: usize) -> SyncEngine<SemaphoreMode, ScriptedRandom> {
        SyncEngine::with_random(
            SemaphoreConfig {
                producers: 1,
                consumers: 1,
                buffer_size,
                activity_rate: 0.5,
                produce_time: 1,
                consume_time: 1,
                ..SemaphoreConfig::default()
            },
            ScriptedRandom::constant(0.0),
        )
        .unwrap()
    }

    #[test]
    fn consumer_blocks_on_empty_buffer() {
        let mut e = engine(2);
        e.tick();
        let snap = e.snapshot().state;
        assert_eq!(snap.threads[0].state, SemaphoreState::Active);
        assert_eq!(snap.threads[1].state, SemaphoreState::Waiting);
        assert_eq!((snap.mutex, snap.empty, snap.full), (0, 1, 0));
    }

    #[test]
    fn items_flow_through_the_buffer_in_order() {
        let mut e = engine(2);
        e.tick(); // producer starts
        e.tick(); // item 1 pushed; the producer wins the mutex again (id order)
        assert_eq!(e.snapshot().state.buffer, vec![1]);
        e.tick(); // item 2 pushed; buffer full, so the consumer gets the mutex
        let s = e.snapshot().state;
        assert_eq!(s.buffer, vec![1, 2]);
        assert_eq!(s.threads[0].state, SemaphoreState::Waiting);
        assert_eq!(s.threads[1].state, SemaphoreState::Active);
        e.tick(); // item 1 consumed
        assert_eq!(e.snapshot().state.buffer, vec![2]);
        let metrics = e.metrics();
        assert_eq!(metrics.items_produced, 2);
        assert_eq!(metrics.items_consumed, 1);
    }

    #[test]
    fn counters_stay_consistent() {
        let mut e = engine(3);
        for _ in 0..50 {
            e.tick();
            let s = e.snapshot().state;
            let active_producers = s
                .threads
                .iter()
                .filter(|t| t.kind == Role::Producer && t.state == SemaphoreState::Active)
                .count() as u32;
            let active_consumers = s
                .threads
                .iter()
                .filter(|t| t.kind == Role::Consumer && t.state == SemaphoreState::Active)
                .count() as u32;
            assert!(s.buffer.len() <= s.capacity);
            assert_eq!(s.full + active_consumers, s.buffer.len() as u32);
            assert_eq!(s.empty + s.full + active_producers + active_consumers, 3);
            assert_eq!(s.mutex + active_producers + active_consumers, 1);
        }
    }
}
