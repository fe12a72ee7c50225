//! Crate-level error type.
//!
//! Library layers carry typed error enums; this umbrella type collects
//! them at module boundaries. The binary converts into `anyhow::Error`
//! at the very top.

use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::hw_init::HwInitError;
use crate::scheduler::QueueFull;

/// Top-level firmware error.
#[derive(Debug)]
pub enum Error {
    /// Peripheral initialization failed.
    Init(HwInitError),
    /// Configuration load/save/validation failure.
    Config(ConfigError),
    /// Raw key-value storage failure.
    Storage(StorageError),
    /// Event queue rejected a submission.
    Scheduler(QueueFull),
    /// Lux measurement unavailable or out of range.
    Sensor(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {}", e),
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Storage(e) => write!(f, "storage: {}", e),
            Self::Scheduler(e) => write!(f, "scheduler: {}", e),
            Self::Sensor(msg) => write!(f, "sensor: {}", msg),
        }
    }
}

impl core::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<QueueFull> for Error {
    fn from(e: QueueFull) -> Self {
        Self::Scheduler(e)
    }
}
