//! Mock adapters for integration tests.
//!
//! `SimRoom` models the optics: the sensor sees daylight plus the
//! lamp's own contribution, proportional to the live fade level, so a
//! closed regulation loop forms without any hardware.

use luxnode::app::events::AppEvent;
use luxnode::app::ports::{
    ConfigError, ConfigPort, DutySink, EventSink, LuxProbe, SenseWindowSource,
};
use luxnode::config::LampConfig;
use luxnode::events::LuxKind;
use luxnode::lightcode::SENSE_WINDOW;

// ── SimRoom ───────────────────────────────────────────────────

pub struct SimRoom {
    /// Daylight at the work surface (lux).
    pub natural_lux: u32,
    /// Lamp contribution per fade level step (lux).
    pub lamp_gain: f32,
    /// Sense capture handed out on pickup.
    pub window: [u8; SENSE_WINDOW],
    /// Every 13-bit duty value written to the lamp channel.
    pub applied: Vec<u32>,
    pub windows_taken: usize,
}

#[allow(dead_code)]
impl SimRoom {
    pub fn new(natural_lux: u32) -> Self {
        Self {
            natural_lux,
            lamp_gain: 18.75,
            window: [0; SENSE_WINDOW],
            applied: Vec::new(),
            windows_taken: 0,
        }
    }

    pub fn last_hw_duty(&self) -> Option<u32> {
        self.applied.last().copied()
    }
}

impl LuxProbe for SimRoom {
    fn measure(&mut self, kind: LuxKind, level: u16) -> Option<u32> {
        match kind {
            // The natural slot compensates the lamp out of the reading.
            LuxKind::Natural => Some(self.natural_lux),
            LuxKind::Environment => {
                let lamp = f32::from(level) * self.lamp_gain;
                Some(self.natural_lux + (lamp + 0.5) as u32)
            }
        }
    }
}

impl DutySink for SimRoom {
    fn apply(&mut self, hw_duty: u32) {
        self.applied.push(hw_duty);
    }
}

impl SenseWindowSource for SimRoom {
    fn take_window(&mut self) -> [u8; SENSE_WINDOW] {
        self.windows_taken += 1;
        self.window
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// In-memory config store; no framing, no CRC — the real store has its
/// own tests.
pub struct MemStore {
    config: Option<LampConfig>,
    pub saves: usize,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self {
            config: None,
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&LampConfig> {
        self.config.as_ref()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for MemStore {
    fn load(&self) -> Result<LampConfig, ConfigError> {
        self.config.clone().ok_or(ConfigError::NotFound)
    }

    fn save(&mut self, config: &LampConfig) -> Result<(), ConfigError> {
        self.config = Some(config.clone());
        self.saves += 1;
        Ok(())
    }
}

// ── Recorder ──────────────────────────────────────────────────

pub struct Recorder {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn any(&self, f: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(f)
    }

    pub fn count(&self, f: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
