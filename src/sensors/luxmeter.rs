//! Photoresistor lux front-end.
//!
//! The sensor is a photoresistor in a 22 kΩ divider read by ADC1. One
//! measurement is 45 raw samples; the mean of samples 20..=42 (the
//! settled middle of the burst) goes through the divider model to a
//! log-domain value, and the lux conversion exponentiates it back.
//!
//! Low fade levels leak lamp light into the sensor; a per-level offset
//! table, calibrated on the reference fixture, compensates the reading.

/// Raw samples per measurement burst.
pub const SAMPLES_PER_WINDOW: usize = 45;

/// Settled sample range the mean is taken over.
const MEAN_FIRST: usize = 20;
const MEAN_LAST: usize = 42;

/// 12-bit ADC against the 3.3 V rail.
const ADC_FULL_SCALE: u32 = 4095;
const ADC_LSB_VOLTS: f64 = 3.3 / 4096.0;

/// Divider conversion resistance in ohms.
const SENSE_RESISTANCE: f64 = 22_000.0;

/// The log-domain value is in units of 10 µV per decade.
const LUX_DECADE_SCALE: f64 = 1e5;

/// Reading the caller must discard.
pub const MEASURE_INVALID: u32 = 0xFFFF;

/// Lamp leakage into the sensor, indexed by fade level 0..=32.
/// Calibrated on the reference fixture.
const OFFSET_MAP: [u8; 33] = [
    0, 8, 10, 12, 11, 14, 17, 11, 14, 15, 18, 19, 21, 22, 22, 22, //
    22, 22, 22, 21, 21, 22, 23, 24, 25, 26, 27, 28, 30, 31, 33, 34, 38,
];

/// Accumulates one measurement burst and converts it to lux.
pub struct Luxmeter {
    samples: [u16; SAMPLES_PER_WINDOW],
    count: usize,
}

impl Luxmeter {
    pub const fn new() -> Self {
        Self {
            samples: [0; SAMPLES_PER_WINDOW],
            count: 0,
        }
    }

    /// Append one raw ADC sample. Returns true once the burst is full.
    pub fn push_sample(&mut self, raw: u16) -> bool {
        if self.count < SAMPLES_PER_WINDOW {
            self.samples[self.count] = raw;
            self.count += 1;
        }
        self.count == SAMPLES_PER_WINDOW
    }

    pub fn is_full(&self) -> bool {
        self.count == SAMPLES_PER_WINDOW
    }

    /// Discard the burst and start over.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Divider model over the settled samples: mean ADC counts → volts
    /// across the photoresistor → log-domain conductance value.
    fn log_value(&self) -> f64 {
        let sum: u32 = self.samples[MEAN_FIRST..=MEAN_LAST]
            .iter()
            .map(|&s| u32::from(s))
            .sum();
        let mean = sum / (MEAN_LAST - MEAN_FIRST + 1) as u32;
        f64::from(ADC_FULL_SCALE - mean.min(ADC_FULL_SCALE)) * ADC_LSB_VOLTS / SENSE_RESISTANCE
    }

    /// Convert the burst to lux, compensating the lamp's own leakage at
    /// the given fade level. `None` when the reading hits the invalid
    /// sentinel and must be discarded.
    pub fn pickup(&mut self, level: u16) -> Option<u32> {
        let raw = 10f64.powf(self.log_value() * LUX_DECADE_SCALE);
        self.reset();

        let lux = if raw >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            raw as u32
        };

        let offset = OFFSET_MAP
            .get(usize::from(level))
            .map_or(0, |&o| u32::from(o).min(lux));
        let lux = lux - offset;

        (lux != MEASURE_INVALID).then_some(lux)
    }
}

impl Default for Luxmeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Measurement entry point ───────────────────────────────────

/// Take one lux measurement for the given fade level.
///
/// On hardware this bursts the ADC at 1 kHz from the slot context; the
/// 45 ms it takes fits well inside the 500 ms measurement slot. On the
/// host the reading comes from the sim injection atomics.
#[cfg(target_os = "espidf")]
pub fn measure(_kind: crate::events::LuxKind, level: u16) -> Option<u32> {
    let mut meter = Luxmeter::new();
    loop {
        let raw = crate::drivers::hw_init::adc1_read(crate::pins::LUX_ADC_CHANNEL);
        if meter.push_sample(raw) {
            return meter.pickup(level);
        }
        std::thread::sleep(core::time::Duration::from_millis(1));
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::MEASURE_INVALID;
    use crate::events::LuxKind;

    static SIM_NATURAL_LUX: AtomicU32 = AtomicU32::new(0);
    static SIM_ENV_LUX: AtomicU32 = AtomicU32::new(0);

    fn slot(kind: LuxKind) -> &'static AtomicU32 {
        match kind {
            LuxKind::Natural => &SIM_NATURAL_LUX,
            LuxKind::Environment => &SIM_ENV_LUX,
        }
    }

    /// Inject the lux value the next `measure()` of this kind returns.
    pub fn sim_set_lux(kind: LuxKind, lux: u32) {
        slot(kind).store(lux, Ordering::Relaxed);
    }

    /// Make the next `measure()` of this kind fail.
    pub fn sim_set_invalid(kind: LuxKind) {
        slot(kind).store(MEASURE_INVALID, Ordering::Relaxed);
    }

    pub fn measure(kind: LuxKind, _level: u16) -> Option<u32> {
        let lux = slot(kind).load(Ordering::Relaxed);
        (lux != MEASURE_INVALID).then_some(lux)
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{measure, sim_set_invalid, sim_set_lux};
