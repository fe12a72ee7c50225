//! LuxNode Firmware — Main Entry Point
//!
//! Event-driven execution around a single lock-free queue.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  Hardware          LogEventSink     ConfigStore              │
//! │  (Lux+Duty+Sense)  (EventSink)      (Config+Storage)         │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            LampService (pure logic)                │      │
//! │  │  regulation · slot sync · lightcode                │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  EventQueue (ISR/timer → main loop) · phase_cut (ISR)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use luxnode::adapters::device_id;
use luxnode::adapters::hardware::Hardware;
use luxnode::adapters::log_sink::LogEventSink;
use luxnode::adapters::nvs::ConfigStore;
use luxnode::app::events::AppEvent;
use luxnode::app::ports::{ConfigPort, EventSink};
use luxnode::app::service::LampService;
use luxnode::config::LampConfig;
use luxnode::control::IlluminationController;
use luxnode::drivers::{hw_init, hw_timer, phase_cut, watchdog};
use luxnode::scheduler::EventQueue;

/// Shared by the timer callbacks and the main loop.
static EVENTS: EventQueue = EventQueue::new();

/// Queue accounting log cadence.
const STATS_PERIOD_MS: u64 = 30_000;

/// Events handled per drain pass; a burst never starves the watchdog.
const DRAIN_BUDGET: usize = 16;

#[cfg(target_os = "espidf")]
fn now_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a monotonic counter read.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1000) as u64
}

#[cfg(not(target_os = "espidf"))]
fn now_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  LuxNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware init ──────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // The lamp channel is the whole point of the node; without it
        // there is nothing to degrade to. The watchdog resets us.
        error!("peripheral init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // Phase-cut path is best-effort: without it the lamp still dims
    // through plain PWM, just not synchronized to the mains.
    if let Err(e) = phase_cut::init_phase_timer() {
        warn!("phase timer init failed: {} — running unsynchronized", e);
    } else if let Err(e) = hw_init::init_isr_service() {
        warn!("zero-cross ISR init failed: {} — running unsynchronized", e);
    }

    watchdog::init();

    // ── 3. Device identity + persisted config ─────────────────
    let mac = device_id::read_mac();
    let key = device_id::config_key(&mac);
    info!("device record key: {}", key);

    let mut store =
        ConfigStore::new(key).map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;

    let (mut config, first_boot) = match store.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            (cfg, false)
        }
        Err(luxnode::app::ports::ConfigError::NotFound) => {
            info!("first boot, using defaults");
            (LampConfig::default(), true)
        }
        Err(e) => {
            warn!("stored config unusable ({}), using defaults", e);
            (LampConfig::default(), true)
        }
    };

    if first_boot {
        // Seed the duty so the first regulation window doesn't start
        // from darkness under a bright target.
        config.current_duty = IlluminationController::initial_duty_estimate(&config);
        if let Err(e) = store.save(&config) {
            warn!("initial config save failed: {}", e);
        }
    }

    if let Ok(dump) = serde_json::to_string(&config) {
        info!("active config: {}", dump);
    }

    // ── 4. Event sources ──────────────────────────────────────
    hw_timer::bind_queue(&EVENTS);
    hw_timer::start_slot_timer()?;
    if let Err(e) = hw_timer::start_sense_sampler() {
        warn!("sense sampler init failed: {} — lightcode disabled", e);
    }

    // ── 5. Service + adapters ─────────────────────────────────
    let mut hw = Hardware::new();
    let mut sink = LogEventSink::new();
    let mut service = LampService::new(config);

    info!(
        "system ready: target {} lux, resuming duty {}",
        service.target_lux(),
        service.duty()
    );

    // ── 6. Event loop ─────────────────────────────────────────
    let mut last_stats_ms = now_ms();

    loop {
        // Timers fill the queue; yield between drain passes.
        std::thread::sleep(std::time::Duration::from_millis(10));

        let now = now_ms();
        EVENTS.drain(DRAIN_BUDGET, |event| {
            let follow_ups = service.dispatch(event, now, &mut hw, &mut store, &mut sink);
            for e in follow_ups {
                // Drops are accounted in the queue stats.
                let _ = EVENTS.submit(e);
            }
        });

        if now.saturating_sub(last_stats_ms) >= STATS_PERIOD_MS {
            last_stats_ms = now;
            sink.emit(&AppEvent::QueueStats(EVENTS.stats()));
        }

        watchdog::feed();
    }
}
