//! Event payloads carried through the scheduler.
//!
//! Every variant is `Copy` and bounded in size: submissions deep-copy
//! the payload into the queue, so producers (ISRs, timer callbacks)
//! never share references with the consumer.

/// Which optical measurement a lux sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuxKind {
    /// Lamp-off measurement: daylight plus neighbor contribution.
    Natural,
    /// Lamp-on measurement: total illuminance at the surface.
    Environment,
}

/// Events dispatched by the main loop. Dispatch is a typed match —
/// no function pointers, no type-erased payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Periodic slot timer fired; advance the synchronizer.
    SlotTick,
    /// A lux measurement completed.
    LuxSample { kind: LuxKind, lux: u32 },
    /// The exchange window closed; the sense buffer holds a fresh capture.
    SenseWindowReady,
    /// A dimming command arrived from the mesh gateway.
    MeshCommand { level: u8, is_override: bool },
    /// A set-target command (serial console or gateway).
    SetTarget { target: i32 },
}

impl Event {
    /// Short tag for log lines and drop diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SlotTick => "slot_tick",
            Self::LuxSample { .. } => "lux_sample",
            Self::SenseWindowReady => "sense_window",
            Self::MeshCommand { .. } => "mesh_cmd",
            Self::SetTarget { .. } => "set_target",
        }
    }
}
