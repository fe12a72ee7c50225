//! Task watchdog for the main event loop.
//!
//! The loop feeds the TWDT once per drain pass; a stall anywhere in the
//! control path (timer task wedged, NVS write hung) reboots the node
//! after 10 s instead of leaving the lamp frozen at its last duty.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;

/// Watchdog timeout in seconds.
pub const WDT_TIMEOUT_S: u32 = 10;

/// Reconfigure the TWDT and subscribe the calling task.
#[cfg(target_os = "espidf")]
pub fn init() {
    // SAFETY: called once from the main task at boot. The TWDT may
    // already be running from the bootloader config; reconfigure is the
    // documented way to change its timeout.
    unsafe {
        let config = esp_task_wdt_config_t {
            timeout_ms: WDT_TIMEOUT_S * 1_000,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        let ret = esp_task_wdt_reconfigure(&config);
        if ret != ESP_OK {
            log::warn!("watchdog: reconfigure failed (rc={}), keeping defaults", ret);
        }
        let ret = esp_task_wdt_add(core::ptr::null_mut());
        if ret != ESP_OK {
            log::warn!("watchdog: task subscribe failed (rc={})", ret);
            return;
        }
    }
    info!("watchdog: armed ({} s)", WDT_TIMEOUT_S);
}

#[cfg(not(target_os = "espidf"))]
pub fn init() {
    info!("watchdog(sim): not armed");
}

#[cfg(target_os = "espidf")]
pub fn feed() {
    // SAFETY: the calling task subscribed in init(); a reset on an
    // unsubscribed task returns an error we deliberately ignore.
    unsafe {
        esp_task_wdt_reset();
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn feed() {}
