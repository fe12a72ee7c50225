//! Periodic timers feeding the event queue.
//!
//! Two esp_timer instances drive the whole node:
//!
//! * slot timer, 500 ms periodic, submits [`Event::SlotTick`];
//! * sense sampler, 15 µs periodic, fills the shared capture buffer and
//!   submits [`Event::SenseWindowReady`] once per full window.
//!
//! The queue handle is bound once at boot before either timer starts;
//! timer callbacks only see it afterwards. On the host build the timers
//! do not exist and tests drive the queue (and the capture buffer via
//! the `sim_` helpers) directly.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use crate::events::Event;
use crate::lightcode::SENSE_WINDOW;
use crate::scheduler::EventQueue;

/// Slot tick period.
pub const SLOT_PERIOD_US: u64 = 500_000;

/// Sense sampler period.
pub const SENSE_PERIOD_US: u64 = 15;

// ── Queue handle ──────────────────────────────────────────────

static mut EVENT_QUEUE: Option<&'static EventQueue> = None;

/// Bind the event queue the timer callbacks submit into. Must run once
/// from the main task before any timer is started.
pub fn bind_queue(queue: &'static EventQueue) {
    // SAFETY: single write at boot, before start_slot_timer() or
    // start_sense_sampler() create the readers.
    unsafe {
        EVENT_QUEUE = Some(queue);
    }
}

/// SAFETY: EVENT_QUEUE is written once in `bind_queue()` before the
/// timers start; afterwards it is only read.
fn queue() -> Option<&'static EventQueue> {
    unsafe { EVENT_QUEUE }
}

fn submit(event: Event) {
    if let Some(q) = queue() {
        // A full queue is already accounted in the drop counter; the
        // timer path must never block or log.
        let _ = q.submit(event);
    }
}

// ── Sense capture buffer (sampler → service) ──────────────────

static SENSE_BUF: [AtomicU8; SENSE_WINDOW] = [const { AtomicU8::new(0) }; SENSE_WINDOW];
static SENSE_IDX: AtomicUsize = AtomicUsize::new(0);
static SENSE_ARMED: AtomicBool = AtomicBool::new(false);

/// Start (or restart) a capture. The sampler ignores ticks while
/// disarmed, so the buffer is stable between window-ready and pickup.
pub fn arm_sense_capture() {
    SENSE_IDX.store(0, Ordering::Relaxed);
    SENSE_ARMED.store(true, Ordering::Release);
}

/// Snapshot the completed window and re-arm for the next capture.
pub fn take_sense_window() -> [u8; SENSE_WINDOW] {
    let mut window = [0u8; SENSE_WINDOW];
    for (dst, src) in window.iter_mut().zip(SENSE_BUF.iter()) {
        *dst = src.load(Ordering::Acquire);
    }
    arm_sense_capture();
    window
}

/// One sampler tick: record the sense line level, disarm and signal
/// when the window fills. Shared by the hardware callback and the sim.
fn sense_sample(level: bool) {
    if !SENSE_ARMED.load(Ordering::Acquire) {
        return;
    }
    let idx = SENSE_IDX.fetch_add(1, Ordering::Relaxed);
    if idx < SENSE_WINDOW {
        SENSE_BUF[idx].store(u8::from(level), Ordering::Release);
        if idx + 1 == SENSE_WINDOW {
            SENSE_ARMED.store(false, Ordering::Release);
            submit(Event::SenseWindowReady);
        }
    }
}

// ── ESP-IDF timers ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_svc::sys::*;

    use super::{SENSE_PERIOD_US, SLOT_PERIOD_US, sense_sample, submit};
    use crate::drivers::hw_init::{self, HwInitError};
    use crate::events::Event;
    use crate::pins;

    static mut SLOT_TIMER: esp_timer_handle_t = core::ptr::null_mut();
    static mut SENSE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

    unsafe extern "C" fn slot_timer_cb(_arg: *mut core::ffi::c_void) {
        submit(Event::SlotTick);
    }

    unsafe extern "C" fn sense_timer_cb(_arg: *mut core::ffi::c_void) {
        sense_sample(hw_init::gpio_read(pins::SENSE_GPIO));
    }

    unsafe fn create_and_start(
        callback: esp_timer_cb_t,
        name: *const core::ffi::c_char,
        handle: *mut esp_timer_handle_t,
        period_us: u64,
    ) -> Result<(), HwInitError> {
        let args = esp_timer_create_args_t {
            callback,
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name,
            skip_unhandled_events: true,
        };
        // SAFETY: handle points at a static written once at boot.
        unsafe {
            let ret = esp_timer_create(&args, handle);
            if ret != ESP_OK {
                return Err(HwInitError::TimerInitFailed(ret));
            }
            let ret = esp_timer_start_periodic(*handle, period_us);
            if ret != ESP_OK {
                return Err(HwInitError::TimerInitFailed(ret));
            }
        }
        Ok(())
    }

    pub fn start_slot_timer() -> Result<(), HwInitError> {
        // SAFETY: single call at boot from the main task.
        unsafe {
            create_and_start(
                Some(slot_timer_cb),
                b"slot_tick\0".as_ptr() as *const _,
                &raw mut SLOT_TIMER,
                SLOT_PERIOD_US,
            )
        }
    }

    pub fn start_sense_sampler() -> Result<(), HwInitError> {
        super::arm_sense_capture();
        // SAFETY: single call at boot from the main task.
        unsafe {
            create_and_start(
                Some(sense_timer_cb),
                b"sense_15us\0".as_ptr() as *const _,
                &raw mut SENSE_TIMER,
                SENSE_PERIOD_US,
            )
        }
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::{start_sense_sampler, start_slot_timer};

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub fn start_slot_timer() -> Result<(), crate::drivers::hw_init::HwInitError> {
    log::info!("hw_timer(sim): slot timer not started, ticks are injected");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_sense_sampler() -> Result<(), crate::drivers::hw_init::HwInitError> {
    arm_sense_capture();
    log::info!("hw_timer(sim): sense sampler not started, windows are injected");
    Ok(())
}

/// Feed a full capture into the shared buffer as the hardware sampler
/// would, sample by sample.
#[cfg(not(target_os = "espidf"))]
pub fn sim_feed_sense_window(window: &[u8; SENSE_WINDOW]) {
    arm_sense_capture();
    for &sample in window {
        sense_sample(sample != 0);
    }
}
