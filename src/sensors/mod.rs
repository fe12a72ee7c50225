//! Sensor front-ends.

pub mod luxmeter;

pub use luxmeter::{Luxmeter, MEASURE_INVALID, measure};

#[cfg(not(target_os = "espidf"))]
pub use luxmeter::{sim_set_invalid, sim_set_lux};
