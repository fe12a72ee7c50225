//! Outbound application events.
//!
//! The [`LampService`](super::service::LampService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them — log to serial, publish a
//! mesh status, record in a test.

use crate::scheduler::SchedulerStats;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The regulation loop (or a command) moved the duty target.
    DutyChanged { from: u16, to: u16 },

    /// The illuminance target changed (mesh suggestion or set-target).
    TargetChanged { lux: u32 },

    /// A mesh override took control of the lamp.
    OverrideStarted { level: u8 },

    /// The override window elapsed and regulation resumed.
    OverrideExpired,

    /// Calibration mode was entered via the magic set-target value.
    CalibrationEntered,

    /// A neighbor lightcode was decoded during the exchange slot.
    CodeDetected { code: u8 },

    /// A live converted reading from the regulation step.
    Illuminance { natural: f32, env: f32, lamp: f32 },

    /// Periodic queue accounting snapshot.
    QueueStats(SchedulerStats),
}
