//! Hardware-facing drivers.
//!
//! `slot_driver` and `phase_cut` hold the portable control logic;
//! `hw_init` and `hw_timer` wrap the raw ESP-IDF peripherals behind
//! dual-target functions so the rest of the crate never touches FFI.

pub mod hw_init;
pub mod hw_timer;
pub mod phase_cut;
pub mod slot_driver;
pub mod watchdog;
