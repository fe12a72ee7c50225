//! Board pin map and peripheral routing.
//!
//! Single source of truth for GPIO assignments. Changing the board
//! revision means changing this file only.

/// Lamp driver PWM output (LEDC channel 0).
pub const LAMP_PWM_GPIO: i32 = 18;

/// Mains zero-cross detector input (optocoupler, rising edge per
/// half-cycle).
pub const ZERO_CROSS_GPIO: i32 = 4;

/// Optical lightcode receiver, digital comparator output.
pub const SENSE_GPIO: i32 = 5;

/// Lux meter analog input: ADC1 channel 6 (GPIO7 on ESP32-S3).
pub const LUX_ADC_CHANNEL: u32 = 6;

/// LEDC base frequency for the lamp channel.
pub const LAMP_PWM_FREQ_HZ: u32 = 1_000;
