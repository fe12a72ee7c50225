//! Application core — pure control logic, zero I/O.
//!
//! Business rules for the lighting node: the regulation loop, the slot
//! synchronizer, lightcode pickup, and command handling. All hardware
//! interaction happens through the **port traits** in [`ports`], so
//! this layer runs unchanged in tests and on the device.

pub mod events;
pub mod ports;
pub mod service;
