//! LuxNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod events;
pub mod lightcode;
pub mod scheduler;

pub mod error;
pub mod pins;

pub use error::{Error, Result};

// The hardware-facing modules compile on the host too; the actual
// FFI implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;
