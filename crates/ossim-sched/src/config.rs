//! Scheduler configuration and validation.

use ossim_core::{ConfigError, DEFAULT_LOG_CAPACITY};

use crate::process::ProcessSpec;

/// Complete configuration for a [`CpuScheduler`](crate::CpuScheduler).
///
/// `validate()` is called by the engine constructor; an invalid config
/// never produces an engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Initial process set, registered in order.
    pub processes: Vec<ProcessSpec>,
    /// Idle ticks spent switching between processes. 0 = immediate dispatch.
    pub context_switch_time: u32,
    /// Seed for the I/O interrupt draws.
    pub seed: u64,
    /// Retained event-log entries. Default: 200.
    pub log_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            processes: Vec::new(),
            context_switch_time: 1,
            seed: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Config with the given processes and defaults elsewhere.
    pub fn with_processes(processes: Vec<ProcessSpec>) -> Self {
        Self {
            processes,
            ..Self::default()
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "log_capacity",
            });
        }
        for spec in &self.processes {
            spec.validate()?;
        }
        Ok(())
    }
}
