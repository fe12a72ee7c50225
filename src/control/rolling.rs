//! Fixed-window averaging primitives for the lux sample streams.

/// Accumulating average over a fixed number of samples.
///
/// `push` returns `true` exactly when the window completes; the mean of
/// the completed window stays available through [`mean`](Self::mean)
/// until the next window completes. A freshly constructed window reports
/// a mean of 0.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    sum: u64,
    count: u16,
    size: u16,
    mean: u32,
}

impl RollingAverage {
    pub fn new(size: u16) -> Self {
        debug_assert!(size > 0);
        Self {
            sum: 0,
            count: 0,
            size,
            mean: 0,
        }
    }

    /// Feed one sample. Returns `true` when this sample completed the
    /// window and the mean was refreshed.
    pub fn push(&mut self, sample: u32) -> bool {
        self.sum += u64::from(sample);
        self.count += 1;
        if self.count < self.size {
            return false;
        }
        self.mean = (self.sum / u64::from(self.size)) as u32;
        self.sum = 0;
        self.count = 0;
        true
    }

    /// Mean of the most recently completed window.
    pub fn mean(&self) -> u32 {
        self.mean
    }

    /// Samples accumulated toward the next completion.
    pub fn pending(&self) -> u16 {
        self.count
    }
}

/// Paired natural/environment accumulator used by the algorithm step
/// (one live instance for telemetry, one stable instance for the model).
#[derive(Debug, Clone)]
pub struct LuxWindow {
    natural_sum: u64,
    env_sum: u64,
    count: u16,
    size: u16,
}

impl LuxWindow {
    pub fn new(size: u16) -> Self {
        debug_assert!(size > 0);
        Self {
            natural_sum: 0,
            env_sum: 0,
            count: 0,
            size,
        }
    }

    /// Accumulate one (natural, environment) pair. On completion the
    /// window resets and the two means are returned.
    pub fn push(&mut self, natural: u32, env: u32) -> Option<(f32, f32)> {
        self.natural_sum += u64::from(natural);
        self.env_sum += u64::from(env);
        self.count += 1;
        if self.count < self.size {
            return None;
        }
        let n = f64::from(self.count);
        let natural_mean = (self.natural_sum as f64 / n) as f32;
        let env_mean = (self.env_sum as f64 / n) as f32;
        self.natural_sum = 0;
        self.env_sum = 0;
        self.count = 0;
        Some((natural_mean, env_mean))
    }
}
