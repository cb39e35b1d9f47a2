//! Readers-writers with reader preference.
//!
//! Requests join one FIFO queue tagged read or write. A scheduling pass
//! runs only while no writer is active: a writer at the head waits until
//! no reader is active, while every reader at the front of the queue is
//! admitted in one batch. Queued readers are therefore favored over a
//! queued writer, which can starve writers.

use std::collections::VecDeque;
use std::fmt;

use smallvec::SmallVec;

use ossim_core::{RandomSource, ThreadId, TickOutcome};

use crate::config::ReadersWritersConfig;
use crate::machine::{SyncMode, TickContext};
use crate::thread::{age_waiting, SyncThread};

/// Kind of access a thread asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// Shared access.
    Read,
    /// Exclusive access.
    Write,
}

impl Access {
    /// One-letter queue tag.
    pub fn tag(self) -> char {
        match self {
            Self::Read => 'R',
            Self::Write => 'W',
        }
    }
}

/// State of a reader or writer thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RwState {
    /// Not using the shared data.
    Idle,
    /// Queued.
    Waiting,
    /// Reading alongside other readers.
    Reading,
    /// Writing exclusively.
    Writing,
}

impl fmt::Display for RwState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Waiting => "WAITING",
            Self::Reading => "READING",
            Self::Writing => "WRITING",
        })
    }
}

/// A readers-writers thread; `kind` is the access it always requests.
pub type RwThread = SyncThread<RwState, Access>;

/// Owned view of the readers-writers simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RwSnapshot {
    /// Readers first, then writers.
    pub threads: Vec<RwThread>,
    /// Readers currently reading.
    pub active_readers: u32,
    /// Writer currently writing.
    pub writer: Option<ThreadId>,
    /// Request queue, head first.
    pub queue: Vec<(ThreadId, Access)>,
}

/// Readers-writers mode state.
#[derive(Clone, Debug)]
pub struct ReadersWritersMode {
    config: ReadersWritersConfig,
    threads: Vec<RwThread>,
    active_readers: u32,
    writer: Option<ThreadId>,
    queue: VecDeque<(ThreadId, Access)>,
}

impl ReadersWritersMode {
    /// Threads, readers first.
    pub fn threads(&self) -> &[RwThread] {
        &self.threads
    }

    fn finish(&mut self, ctx: &mut TickContext<'_>) {
        for t in &mut self.threads {
            let reading = match t.state {
                RwState::Reading => true,
                RwState::Writing => false,
                RwState::Idle | RwState::Waiting => continue,
            };
            if !t.count_down() {
                continue;
            }
            t.state = RwState::Idle;
            ctx.metrics.completed_sections += 1;
            if reading {
                self.active_readers = self.active_readers.saturating_sub(1);
                ctx.record(format!("{} finished reading: READING -> IDLE", t.name));
            } else {
                self.writer = None;
                ctx.record(format!("{} finished writing: WRITING -> IDLE", t.name));
            }
        }
    }

    fn request(&mut self, ctx: &mut TickContext<'_>) {
        for t in &mut self.threads {
            if t.state == RwState::Idle && ctx.rng.chance(self.config.request_rate) {
                t.state = RwState::Waiting;
                self.queue.push_back((t.id, t.kind));
                ctx.record(format!("{} queued [{}]: IDLE -> WAITING", t.name, t.kind.tag()));
            }
        }
    }

    fn schedule(&mut self, ctx: &mut TickContext<'_>) {
        if self.writer.is_some() {
            return;
        }
        match self.queue.front() {
            Some(&(id, Access::Write)) => {
                if self.active_readers > 0 {
                    return;
                }
                self.queue.pop_front();
                let Some(t) = self.threads.get_mut(id.0 as usize) else { return };
                t.state = RwState::Writing;
                t.start_timer(self.config.write_time);
                ctx.metrics.record_acquisition(t.wait_ticks);
                t.wait_ticks = 0;
                self.writer = Some(id);
                ctx.record(format!("{} granted exclusive access: WAITING -> WRITING", t.name));
            }
            Some(&(_, Access::Read)) => {
                let mut batch: SmallVec<[ThreadId; 8]> = SmallVec::new();
                while let Some(&(id, Access::Read)) = self.queue.front() {
                    self.queue.pop_front();
                    batch.push(id);
                }
                for id in batch {
                    let Some(t) = self.threads.get_mut(id.0 as usize) else { continue };
                    t.state = RwState::Reading;
                    t.start_timer(self.config.read_time);
                    ctx.metrics.record_acquisition(t.wait_ticks);
                    t.wait_ticks = 0;
                    self.active_readers += 1;
                    ctx.record(format!(
                        "{} granted shared access ({} reading): WAITING -> READING",
                        t.name, self.active_readers
                    ));
                }
            }
            None => {}
        }
    }
}

impl SyncMode for ReadersWritersMode {
    type Config = ReadersWritersConfig;
    type Snapshot = RwSnapshot;

    const NAME: &'static str = "readers-writers";

    fn build(config: &ReadersWritersConfig, _rng: &mut dyn RandomSource) -> Self {
        let readers = (0..config.readers).map(|i| (format!("Reader {i}"), Access::Read));
        let writers = (0..config.writers).map(|i| (format!("Writer {i}"), Access::Write));
        let threads = readers
            .chain(writers)
            .enumerate()
            .map(|(index, (name, access))| SyncThread::new(index, name, RwState::Idle, access))
            .collect();
        Self {
            config: config.clone(),
            threads,
            active_readers: 0,
            writer: None,
            queue: VecDeque::new(),
        }
    }

    fn config(&self) -> &ReadersWritersConfig {
        &self.config
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> TickOutcome {
        self.finish(ctx);
        self.request(ctx);
        self.schedule(ctx);
        age_waiting(&mut self.threads, |s| s == RwState::Waiting, ctx.metrics);
        TickOutcome::Advanced
    }

    fn snapshot(&self) -> RwSnapshot {
        RwSnapshot {
            threads: self.threads.clone(),
            active_readers: self.active_readers,
            writer: self.writer,
            queue: self.queue.iter().copied().collect(),
        }
    }
}
