//! Optical lightcode decoder.
//!
//! Neighbor nodes modulate their lamps during the exchange slot; this
//! node samples its light sensor every 15 µs into a 120-entry window,
//! smooths it with a causal 4-tap moving average, and recovers a
//! 6–7 bit code from run-length transitions.
//!
//! A window that yields no valid code is the normal idle outcome, not
//! an error: most exchange slots see no neighbor transmitting.

/// Samples captured per exchange window.
pub const SENSE_WINDOW: usize = 120;

/// Moving-average filter order.
pub const MEAN_SIZE: usize = 4;

/// Decoded codes are masked to this pattern.
pub const CODE_MASK: u8 = 0x7E;

/// Code a broadcasting master transmits.
pub const MASTER_CODE: u8 = 0x55 & CODE_MASK;

/// Decode scans this index range (leading/trailing samples are slot
/// boundary noise).
const SCAN_START: usize = 20;
const SCAN_END: usize = 80;

/// Consecutive equal samples that encode one bit.
const RUN_LEN: u32 = 5;

/// Stateful decoder. The filter taps persist across captures, matching
/// the continuous sampling of the sensor front-end.
pub struct LightcodeDecoder {
    window: [u8; SENSE_WINDOW],
    write_idx: usize,
    taps: [u8; MEAN_SIZE],
}

impl LightcodeDecoder {
    pub const fn new() -> Self {
        Self {
            window: [0; SENSE_WINDOW],
            write_idx: 0,
            taps: [0; MEAN_SIZE],
        }
    }

    /// Append one raw sensor sample (0/1). Samples past the window size
    /// are discarded until [`reset`](Self::reset).
    pub fn push_sample(&mut self, level: bool) {
        if self.write_idx < SENSE_WINDOW {
            self.window[self.write_idx] = u8::from(level);
            self.write_idx += 1;
        }
    }

    /// Load a complete captured window (hardware path: the ISR sampler
    /// fills a shared buffer and the service copies it in at pickup).
    pub fn load_window(&mut self, window: &[u8; SENSE_WINDOW]) {
        self.window = *window;
        self.write_idx = SENSE_WINDOW;
    }

    /// Re-arm for the next capture. Filter taps are kept.
    pub fn reset(&mut self) {
        self.write_idx = 0;
    }

    /// Samples captured so far.
    pub fn len(&self) -> usize {
        self.write_idx
    }

    pub fn is_empty(&self) -> bool {
        self.write_idx == 0
    }

    /// Smooth the window in place: each sample becomes the rounded mean
    /// of itself and the three preceding samples.
    pub fn filter(&mut self) {
        for i in 0..SENSE_WINDOW {
            self.taps.rotate_left(1);
            self.taps[MEAN_SIZE - 1] = self.window[i];
            let sum: u16 = self.taps.iter().map(|&t| u16::from(t)).sum();
            self.window[i] = ((f32::from(sum) / MEAN_SIZE as f32) + 0.5) as u8;
        }
    }

    /// Run-length decode the (filtered) window.
    ///
    /// Starting from a reference level of 0, every run of 5 consecutive
    /// samples equal to the reference emits one bit (MSB first) and
    /// flips the reference; a mismatch re-anchors the reference and
    /// resets the run. Exactly 6 or 7 bits make a valid code.
    pub fn decode(&self) -> Option<u8> {
        let mut reference: u8 = 0;
        let mut count: u32 = 0;
        let mut bits: u32 = 0;
        let mut code: u8 = 0;

        for &sample in &self.window[SCAN_START..SCAN_END] {
            if sample == reference {
                count += 1;
            } else {
                count = 0;
                reference = sample;
            }

            if count >= RUN_LEN {
                if bits < 8 {
                    code |= reference << (7 - bits);
                }
                bits += 1;
                reference ^= 1;
                count = 0;
            }
        }

        (6..=7).contains(&bits).then_some(code & CODE_MASK)
    }

    /// Pickup: smooth, decode, and re-arm in one go.
    pub fn pickup(&mut self) -> Option<u8> {
        self.filter();
        let code = self.decode();
        self.reset();
        code
    }
}

impl Default for LightcodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
