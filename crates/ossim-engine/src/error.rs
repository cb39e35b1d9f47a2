//! Driver errors.

use std::error::Error;
use std::fmt;

use ossim_core::ConfigError;

/// Failure to build or command a simulation driver.
#[derive(Debug, PartialEq)]
pub enum DriverError {
    /// The simulation or driver configuration is invalid.
    Config(ConfigError),
    /// The tick thread has shut down.
    Shutdown,
    /// The command channel is full (back-pressure).
    ChannelFull,
    /// The operating system refused to spawn the tick thread.
    Spawn {
        /// The spawn error's message.
        reason: String,
    },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Shutdown => write!(f, "tick thread has shut down"),
            Self::ChannelFull => write!(f, "command channel full"),
            Self::Spawn { reason } => write!(f, "failed to spawn tick thread: {reason}"),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for DriverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
