//! Lamp configuration parameters and hardware constants.
//!
//! All tunable parameters for the illumination control loop.
//! Values are persisted to NVS and can be overridden via mesh commands.

use serde::{Deserialize, Serialize};

// ── Hardware constants ────────────────────────────────────────

/// Number of discrete dimming levels (duty range is `0..=MAX_DUTY`).
pub const MAX_DUTY: u16 = 32;

/// Slots per synchronizer cycle.
pub const SLOT_COUNT: u8 = 10;

/// Duration of one slot (drives the periodic slot timer).
pub const SLOT_TIME_MS: u32 = 500;

/// Length of the on/off output pattern derived from the duty level.
pub const PWM_SEQUENCE_LEN: usize = 32;

/// Full-scale value of the 13-bit LEDC duty register.
pub const PWM_MAX_VALUE: u32 = 8191;

/// Mains half-cycle length at 50 Hz, for phase-cut delay computation.
pub const HALF_CYCLE_US: u32 = 10_000;

/// Mesh dimming levels map to lux targets in steps of 25.
pub const LUX_PER_MESH_LEVEL: u32 = 25;

/// How long a direct mesh command pins the duty before control resumes.
pub const MESH_OVERRIDE_MS: u64 = 30_000;

/// Magic set-target value that enters forced-calibration mode.
pub const CALIBRATION_MAGIC_TARGET: i32 = -0x1E0E_55F0;

// ── Persistent configuration ──────────────────────────────────

/// Algorithm and lamp-model parameters, persisted across reboots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LampConfig {
    /// Illuminance setpoint at the work surface (lux).
    pub target_lux: u32,
    /// Lamp luminous efficiency (lux per duty step at 1 m).
    pub efficiency: f32,
    /// Lamp-to-surface distance (metres).
    pub distance: f32,
    /// Transmission factor of any diffuser between lamp and surface.
    pub transparency: f32,
    /// Fraction of the computed correction applied per algorithm step.
    pub dimm_step: f32,
    /// Floor for lamp intensity, as a fraction of full scale.
    pub min_fraction: f32,
    /// Last applied duty level, restored on boot.
    pub current_duty: u16,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            target_lux: 400,
            efficiency: 18.75,
            distance: 1.0,
            transparency: 1.0,
            dimm_step: 0.1,
            min_fraction: 0.01,
            current_duty: 0,
        }
    }
}

impl LampConfig {
    /// Range-check every field. Invalid configs are rejected before
    /// persisting, never silently clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.efficiency <= 0.0 || !self.efficiency.is_finite() {
            return Err("efficiency must be positive and finite");
        }
        if self.distance <= 0.0 || !self.distance.is_finite() {
            return Err("distance must be positive and finite");
        }
        if self.transparency <= 0.0 || self.transparency > 1.0 {
            return Err("transparency must be in (0, 1]");
        }
        if self.dimm_step <= 0.0 || self.dimm_step > 1.0 {
            return Err("dimm_step must be in (0, 1]");
        }
        if self.min_fraction < 0.0 || self.min_fraction > 1.0 {
            return Err("min_fraction must be in [0, 1]");
        }
        if self.current_duty > MAX_DUTY {
            return Err("current_duty out of range");
        }
        Ok(())
    }

    /// Intensity (lux at the surface) produced by a given duty level
    /// under this lamp model.
    pub fn duty_to_intensity(&self, duty: u16) -> f32 {
        f32::from(duty) * self.efficiency * self.transparency / (self.distance * self.distance)
    }

    /// Duty level required to produce a given surface intensity.
    /// Rounds to nearest and clamps into `0..=MAX_DUTY`.
    pub fn intensity_to_duty(&self, intensity: f32) -> u16 {
        let raw = intensity * self.distance * self.distance / (self.efficiency * self.transparency);
        if !raw.is_finite() || raw <= 0.0 {
            return 0;
        }
        let rounded = (raw + 0.5) as u16;
        rounded.min(MAX_DUTY)
    }

    /// Maximum intensity the lamp can deliver (duty at full scale).
    pub fn intensity_max(&self) -> f32 {
        self.duty_to_intensity(MAX_DUTY)
    }

    /// Minimum allowed lamp intensity.
    pub fn intensity_min(&self) -> f32 {
        self.min_fraction * self.intensity_max()
    }
}
