//! Port traits — the boundary between the control core and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LampService (domain)
//! ```
//!
//! Driven adapters (the lux front-end, the LEDC register, the sense
//! capture buffer, NVS, the log sink) implement these traits. The
//! [`LampService`](super::service::LampService) consumes them via
//! generics, so the control core never touches FFI and every test runs
//! against mocks.

use crate::config::LampConfig;
use crate::events::LuxKind;
use crate::lightcode::SENSE_WINDOW;

// ───────────────────────────────────────────────────────────────
// Measurement port (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// One lux measurement, compensated for the current fade level.
/// `None` means the reading was invalid and must be discarded.
pub trait LuxProbe {
    fn measure(&mut self, kind: LuxKind, level: u16) -> Option<u32>;
}

// ───────────────────────────────────────────────────────────────
// Output port (domain → lamp hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the 13-bit lamp duty register.
pub trait DutySink {
    fn apply(&mut self, hw_duty: u32);
}

// ───────────────────────────────────────────────────────────────
// Sense capture port (sampler → domain)
// ───────────────────────────────────────────────────────────────

/// Hands over the completed optical capture window and re-arms the
/// sampler for the next one.
pub trait SenseWindowSource {
    fn take_window(&mut self) -> [u8; SENSE_WINDOW];
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, mesh
/// status publish, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the lamp configuration.
///
/// Implementations MUST validate before persisting: a corrupted or
/// hostile mesh command must not plant an out-of-range efficiency or a
/// zero distance that the model would divide by.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<LampConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &LampConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage. Keys are namespaced per device so two
/// nodes flashed from the same image never collide.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. `Ok(())` even if the key didn't exist.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored record failed the CRC or deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
