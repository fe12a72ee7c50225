//! Phase-cut dimming synchronized to the mains zero-cross.
//!
//! A rising edge on the zero-cross input marks the start of a half
//! cycle. The lamp triac fires after a delay proportional to the
//! inverse duty:
//!
//! ```text
//!   delay_us = (32 − level) · 10000 / 32
//!   level 32 → fire immediately
//!   level  0 → full half-cycle delay, output stays dark
//! ```
//!
//! The ISR is kept minimal: debounce via a timestamp compare-and-swap,
//! read the published level, and either apply the duty or (re)arm the
//! one-shot phase timer. A fresh edge always wins over a pending timer.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};

use crate::config::{HALF_CYCLE_US, MAX_DUTY};

/// Edges closer together than this are detector chatter.
pub const DEBOUNCE_US: u64 = 1_000;

/// Firing delay after the zero cross for a given fade level.
pub fn phase_delay_us(level: u16) -> u32 {
    let level = u32::from(level.min(MAX_DUTY));
    (u32::from(MAX_DUTY) - level) * HALF_CYCLE_US / u32::from(MAX_DUTY)
}

/// What the zero-cross handler should do for the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    /// Full duty: write the output right at the zero cross.
    ApplyNow,
    /// Arm (or re-arm) the one-shot timer.
    Arm { delay_us: u32 },
}

pub fn edge_action(level: u16) -> PhaseAction {
    match phase_delay_us(level) {
        0 => PhaseAction::ApplyNow,
        delay_us => PhaseAction::Arm { delay_us },
    }
}

/// Timestamp-CAS debounce filter, safe to call from ISR context.
pub struct EdgeDebounce {
    last_edge_us: AtomicU64,
}

impl EdgeDebounce {
    pub const fn new() -> Self {
        Self {
            last_edge_us: AtomicU64::new(0),
        }
    }

    /// Accept the edge at `now_us` unless one was already accepted less
    /// than [`DEBOUNCE_US`] ago. Lock-free; concurrent edges race on the
    /// CAS and exactly one wins.
    pub fn accept(&self, now_us: u64) -> bool {
        let mut last = self.last_edge_us.load(Ordering::Relaxed);
        loop {
            if now_us.saturating_sub(last) < DEBOUNCE_US {
                return false;
            }
            match self.last_edge_us.compare_exchange_weak(
                last,
                now_us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }
}

// ── Level/duty mailbox (service → ISR) ────────────────────────

static PUBLISHED_LEVEL: AtomicU16 = AtomicU16::new(0);
static PUBLISHED_HW_DUTY: AtomicU32 = AtomicU32::new(0);

/// Publish the live fade level and its 13-bit register value for the
/// zero-cross path. Called from the slot tick handler whenever the
/// hardware duty changes.
pub fn publish(level: u16, hw_duty: u32) {
    PUBLISHED_LEVEL.store(level, Ordering::Relaxed);
    PUBLISHED_HW_DUTY.store(hw_duty, Ordering::Relaxed);
}

pub fn published_level() -> u16 {
    PUBLISHED_LEVEL.load(Ordering::Relaxed)
}

// ── ESP-IDF glue ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_svc::sys::*;

    use super::{EdgeDebounce, Ordering, PhaseAction, edge_action};
    use crate::drivers::hw_init::{self, HwInitError};

    static DEBOUNCE: EdgeDebounce = EdgeDebounce::new();
    static mut PHASE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

    /// SAFETY: PHASE_TIMER is written once in `init_phase_timer()` from
    /// the main task before the zero-cross ISR is enabled.
    unsafe fn phase_timer() -> esp_timer_handle_t {
        unsafe { PHASE_TIMER }
    }

    unsafe extern "C" fn phase_timer_cb(_arg: *mut core::ffi::c_void) {
        apply_published_duty();
    }

    fn apply_published_duty() {
        hw_init::lamp_duty_write(super::PUBLISHED_HW_DUTY.load(Ordering::Relaxed));
    }

    /// Create the one-shot phase timer. Must run before
    /// [`hw_init::init_isr_service`] enables the zero-cross interrupt.
    pub fn init_phase_timer() -> Result<(), HwInitError> {
        let args = esp_timer_create_args_t {
            callback: Some(phase_timer_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"phase_cut\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        // SAFETY: single write at boot from the main task.
        let ret = unsafe { esp_timer_create(&args, &raw mut PHASE_TIMER) };
        if ret != ESP_OK {
            return Err(HwInitError::TimerInitFailed(ret));
        }
        Ok(())
    }

    /// Zero-cross edge handler. Runs in ISR context: no logging, no
    /// blocking, just debounce + timer arm.
    pub fn handle_edge_from_isr() {
        // SAFETY: esp_timer_get_time is an RTC counter read, ISR-safe.
        let now_us = unsafe { esp_timer_get_time() } as u64;
        if !DEBOUNCE.accept(now_us) {
            return;
        }

        match edge_action(super::published_level()) {
            PhaseAction::ApplyNow => apply_published_duty(),
            PhaseAction::Arm { delay_us } => {
                // SAFETY: phase_timer() is valid after init_phase_timer();
                // stop+start_once makes the latest edge win.
                unsafe {
                    let timer = phase_timer();
                    if !timer.is_null() {
                        esp_timer_stop(timer);
                        esp_timer_start_once(timer, u64::from(delay_us));
                    }
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::{handle_edge_from_isr, init_phase_timer};

#[cfg(not(target_os = "espidf"))]
pub fn init_phase_timer() -> Result<(), crate::drivers::hw_init::HwInitError> {
    log::info!("phase_cut(sim): phase timer skipped");
    Ok(())
}
