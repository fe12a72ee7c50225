//! Driven adapters: implementations of the `app::ports` traits.

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
