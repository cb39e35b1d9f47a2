//! Configuration for the four synchronization modes.
//!
//! Each config is validated when an engine is built; an invalid config
//! never produces an engine. Changing any field of a running simulation
//! means building a new engine (or calling
//! [`reconfigure`](crate::SyncEngine::reconfigure)
//! with the new config), never mutating live threads.

use ossim_core::{ConfigError, DEFAULT_LOG_CAPACITY};

/// Settings every mode shares.
pub trait ModeConfig: Clone + Send {
    /// Check structural invariants.
    fn validate(&self) -> Result<(), ConfigError>;
    /// Seed for the default random source.
    fn seed(&self) -> u64;
    /// Retained event-log entries.
    fn log_capacity(&self) -> usize;
}

fn check_common(log_capacity: usize) -> Result<(), ConfigError> {
    if log_capacity == 0 {
        return Err(ConfigError::ZeroCapacity {
            name: "log_capacity",
        });
    }
    Ok(())
}

fn check_count(what: &'static str, min: usize, found: usize) -> Result<(), ConfigError> {
    if found < min {
        return Err(ConfigError::TooFew { what, min, found });
    }
    Ok(())
}

macro_rules! impl_mode_config {
    ($ty:ty) => {
        impl ModeConfig for $ty {
            fn validate(&self) -> Result<(), ConfigError> {
                <$ty>::validate(self)
            }

            fn seed(&self) -> u64 {
                self.seed
            }

            fn log_capacity(&self) -> usize {
                self.log_capacity
            }
        }
    };
}

// ── MutexConfig ────────────────────────────────────────────────────

/// Mutex contention simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MutexConfig {
    /// Number of threads. At least 1. Default: 4.
    pub threads: usize,
    /// Per-tick probability that an idle thread requests the lock.
    /// Default: 0.3.
    pub contention_rate: f64,
    /// Ticks the lock is held per critical section. Default: 3.
    pub critical_section: u32,
    /// Seed for the default random source.
    pub seed: u64,
    /// Retained event-log entries. Default: 200.
    pub log_capacity: usize,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            contention_rate: 0.3,
            critical_section: 3,
            seed: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl MutexConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_common(self.log_capacity)?;
        check_count("threads", 1, self.threads)?;
        ConfigError::check_probability("contention_rate", self.contention_rate)?;
        ConfigError::check_duration("critical_section", self.critical_section)
    }
}

impl_mode_config!(MutexConfig);

// ── SemaphoreConfig ────────────────────────────────────────────────

/// Bounded-buffer producer/consumer simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SemaphoreConfig {
    /// Producer threads. At least 1. Default: 2.
    pub producers: usize,
    /// Consumer threads. At least 1. Default: 2.
    pub consumers: usize,
    /// Buffer slots. At least 1. Default: 5.
    pub buffer_size: usize,
    /// Per-tick probability that an idle thread wants to act. Default: 0.5.
    pub activity_rate: f64,
    /// Ticks to produce one item. Default: 2.
    pub produce_time: u32,
    /// Ticks to consume one item. Default: 3.
    pub consume_time: u32,
    /// Seed for the default random source.
    pub seed: u64,
    /// Retained event-log entries. Default: 200.
    pub log_capacity: usize,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            buffer_size: 5,
            activity_rate: 0.5,
            produce_time: 2,
            consume_time: 3,
            seed: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl SemaphoreConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_common(self.log_capacity)?;
        check_count("producers", 1, self.producers)?;
        check_count("consumers", 1, self.consumers)?;
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "buffer_size",
            });
        }
        ConfigError::check_probability("activity_rate", self.activity_rate)?;
        ConfigError::check_duration("produce_time", self.produce_time)?;
        ConfigError::check_duration("consume_time", self.consume_time)
    }
}

impl_mode_config!(SemaphoreConfig);

// ── ReadersWritersConfig ───────────────────────────────────────────

/// Readers-writers simulation (reader preference).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadersWritersConfig {
    /// Reader threads. Default: 3.
    pub readers: usize,
    /// Writer threads. Default: 2.
    pub writers: usize,
    /// Per-tick probability that an idle thread requests access.
    /// Default: 0.3.
    pub request_rate: f64,
    /// Ticks per read. Default: 2.
    pub read_time: u32,
    /// Ticks per write. Default: 3.
    pub write_time: u32,
    /// Seed for the default random source.
    pub seed: u64,
    /// Retained event-log entries. Default: 200.
    pub log_capacity: usize,
}

impl Default for ReadersWritersConfig {
    fn default() -> Self {
        Self {
            readers: 3,
            writers: 2,
            request_rate: 0.3,
            read_time: 2,
            write_time: 3,
            seed: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl ReadersWritersConfig {
    /// Validate all structural invariants. At least one thread overall.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_common(self.log_capacity)?;
        check_count("threads", 1, self.readers + self.writers)?;
        ConfigError::check_probability("request_rate", self.request_rate)?;
        ConfigError::check_duration("read_time", self.read_time)?;
        ConfigError::check_duration("write_time", self.write_time)
    }
}

impl_mode_config!(ReadersWritersConfig);

// ── PhilosophersConfig ─────────────────────────────────────────────

/// Order in which a hungry philosopher picks up forks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForkPolicy {
    /// Left then right. Admits circular wait.
    #[default]
    Naive,
    /// Lower-numbered fork first, which breaks circular wait.
    Ordered,
}

/// Dining philosophers simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhilosophersConfig {
    /// Philosophers (and forks). At least 2. Default: 5.
    pub philosophers: usize,
    /// Inclusive thinking-time range in ticks. Default: (2, 6).
    pub think_time: (u32, u32),
    /// Inclusive eating-time range in ticks. Default: (2, 4).
    pub eat_time: (u32, u32),
    /// Fork acquisition order. Default: [`ForkPolicy::Naive`].
    pub policy: ForkPolicy,
    /// Seed for the default random source.
    pub seed: u64,
    /// Retained event-log entries. Default: 200.
    pub log_capacity: usize,
}

impl Default for PhilosophersConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            think_time: (2, 6),
            eat_time: (2, 4),
            policy: ForkPolicy::Naive,
            seed: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl PhilosophersConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_common(self.log_capacity)?;
        check_count("philosophers", 2, self.philosophers)?;
        ConfigError::check_duration_range("think_time", self.think_time)?;
        ConfigError::check_duration_range("eat_time", self.eat_time)
    }
}

impl_mode_config!(PhilosophersConfig);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MutexConfig::default().validate().is_ok());
        assert!(SemaphoreConfig::default().validate().is_ok());
        assert!(ReadersWritersConfig::default().validate().is_ok());
        assert!(PhilosophersConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = MutexConfig {
            threads: 0,
            ..MutexConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooFew {
                what: "threads",
                min: 1,
                found: 0
            })
        );

        let cfg = SemaphoreConfig {
            buffer_size: 0,
            ..SemaphoreConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroCapacity { .. })));

        let cfg = ReadersWritersConfig {
            request_rate: f64::NAN,
            ..ReadersWritersConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));

        let cfg = PhilosophersConfig {
            think_time: (5, 2),
            ..PhilosophersConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvertedRange {
                name: "think_time",
                min: 5,
                max: 2
            })
        );

        let cfg = PhilosophersConfig {
            philosophers: 1,
            ..PhilosophersConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
