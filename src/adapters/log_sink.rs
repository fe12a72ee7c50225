//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). A mesh status
//! publisher would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::DutyChanged { from, to } => {
                info!("DUTY  | {} -> {}", from, to);
            }
            AppEvent::TargetChanged { lux } => {
                info!("TARGET| {} lux", lux);
            }
            AppEvent::OverrideStarted { level } => {
                info!("OVRD  | start, level={}", level);
            }
            AppEvent::OverrideExpired => {
                info!("OVRD  | expired, regulation resumed");
            }
            AppEvent::CalibrationEntered => {
                info!("CAL   | forced calibration active");
            }
            AppEvent::CodeDetected { code } => {
                info!("CODE  | 0x{:02X}", code);
            }
            AppEvent::Illuminance { natural, env, lamp } => {
                info!(
                    "LUX   | natural={:.1} env={:.1} lamp={:.1}",
                    natural, env, lamp
                );
            }
            AppEvent::QueueStats(stats) => {
                info!(
                    "QUEUE | submitted={} processed={} dropped={} queued={}",
                    stats.submitted, stats.processed, stats.dropped, stats.queued
                );
            }
        }
    }
}
