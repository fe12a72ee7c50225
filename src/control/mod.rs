//! Closed-loop illumination control.
//!
//! [`rolling`] provides the fixed-window averaging primitives;
//! [`algorithm`] owns the lamp model and produces duty updates from
//! averaged lux measurements.

pub mod algorithm;
pub mod rolling;

pub use algorithm::{IlluminationController, LiveReading, StepOutcome};
pub use rolling::{LuxWindow, RollingAverage};
