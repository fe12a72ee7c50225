//! Application service — the control core.
//!
//! [`LampService`] owns the illumination controller, the slot
//! synchronizer, and the lightcode decoder. The main loop drains the
//! event queue into [`dispatch`](LampService::dispatch); all I/O flows
//! through port traits injected at the call site, so the whole service
//! runs against mocks in tests.
//!
//! ```text
//!  LuxProbe ──────▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  SenseWindow ───▶ │         LampService          │
//!      DutySink ◀── │ controller · slots · decoder │ ──▶ ConfigPort
//!                   └──────────────────────────────┘
//! ```

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::LampConfig;
use crate::control::IlluminationController;
use crate::drivers::phase_cut;
use crate::drivers::slot_driver::{SlotAction, SlotDriver};
use crate::events::{Event, LuxKind};
use crate::lightcode::LightcodeDecoder;

use super::events::AppEvent;
use super::ports::{ConfigPort, DutySink, EventSink, LuxProbe, SenseWindowSource};

/// Follow-up events one dispatch may produce (at most one slot action
/// yields one lux sample).
pub type FollowUps = Vec<Event, 2>;

/// The application service orchestrates the control loop.
pub struct LampService {
    controller: IlluminationController,
    slots: SlotDriver,
    decoder: LightcodeDecoder,
    /// The sampler finished a capture that has not been picked up yet.
    capture_ready: bool,
}

impl LampService {
    /// Build from a validated configuration. The persisted duty becomes
    /// the fade target so the lamp resumes where it left off.
    pub fn new(config: LampConfig) -> Self {
        let controller = IlluminationController::new(config);
        let mut slots = SlotDriver::new();
        slots.set_target(controller.duty());
        Self {
            controller,
            slots,
            decoder: LightcodeDecoder::new(),
            capture_ready: false,
        }
    }

    /// Handle one queue event. Returns follow-up events the caller must
    /// submit back into the queue (measurements round-trip through it so
    /// dispatch stays single-entry).
    pub fn dispatch(
        &mut self,
        event: Event,
        now_ms: u64,
        hw: &mut (impl LuxProbe + DutySink + SenseWindowSource),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> FollowUps {
        match event {
            Event::SlotTick => self.on_slot_tick(hw, sink),
            Event::LuxSample { kind, lux } => {
                self.on_lux_sample(kind, lux, now_ms, store, sink);
                FollowUps::new()
            }
            Event::SenseWindowReady => {
                self.capture_ready = true;
                FollowUps::new()
            }
            Event::MeshCommand { level, is_override } => {
                self.on_mesh_command(level, is_override, now_ms, store, sink);
                FollowUps::new()
            }
            Event::SetTarget { target } => {
                self.on_set_target(target, store, sink);
                FollowUps::new()
            }
        }
    }

    // ── Slot tick ─────────────────────────────────────────────

    fn on_slot_tick(
        &mut self,
        hw: &mut (impl LuxProbe + DutySink + SenseWindowSource),
        sink: &mut impl EventSink,
    ) -> FollowUps {
        let mut follow_ups = FollowUps::new();
        let out = self.slots.tick();

        for action in &out.actions {
            match action {
                SlotAction::DecodeLightcode => self.pickup_lightcode(hw, sink),
                SlotAction::SampleNatural => {
                    if let Some(lux) = hw.measure(LuxKind::Natural, self.slots.level()) {
                        // Infallible: capacity 2, at most one sample per tick.
                        let _ = follow_ups.push(Event::LuxSample {
                            kind: LuxKind::Natural,
                            lux,
                        });
                    }
                }
                SlotAction::SampleEnvironment => {
                    if let Some(lux) = hw.measure(LuxKind::Environment, self.slots.level()) {
                        let _ = follow_ups.push(Event::LuxSample {
                            kind: LuxKind::Environment,
                            lux,
                        });
                    }
                }
            }
        }

        if let Some(hw_duty) = out.apply_duty {
            hw.apply(hw_duty);
            phase_cut::publish(self.slots.level(), hw_duty);
        }

        follow_ups
    }

    fn pickup_lightcode(&mut self, hw: &mut impl SenseWindowSource, sink: &mut impl EventSink) {
        if !self.capture_ready {
            return;
        }
        self.capture_ready = false;

        let window = hw.take_window();
        self.decoder.load_window(&window);
        if let Some(code) = self.decoder.pickup() {
            info!("lightcode: decoded 0x{:02X}", code);
            sink.emit(&AppEvent::CodeDetected { code });
        }
    }

    // ── Measurements ──────────────────────────────────────────

    fn on_lux_sample(
        &mut self,
        kind: LuxKind,
        lux: u32,
        now_ms: u64,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let prev_duty = self.controller.duty();
        let Some(outcome) = self.controller.ingest_sample(kind, lux, now_ms) else {
            return;
        };

        if outcome.override_expired {
            info!("override expired, regulation resumed");
            sink.emit(&AppEvent::OverrideExpired);
        }

        if let Some(live) = outcome.live {
            debug!(
                "illuminance: natural={:.1} env={:.1} lamp={:.1} duty={}",
                live.natural, live.env, live.lamp, live.duty
            );
            sink.emit(&AppEvent::Illuminance {
                natural: live.natural,
                env: live.env,
                lamp: live.lamp,
            });
        }

        if let Some(new_duty) = outcome.new_duty {
            self.slots.set_target(new_duty);
            sink.emit(&AppEvent::DutyChanged {
                from: prev_duty,
                to: new_duty,
            });
            self.persist(store);
        }
    }

    // ── Commands ──────────────────────────────────────────────

    fn on_mesh_command(
        &mut self,
        level: u8,
        is_override: bool,
        now_ms: u64,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let prev_duty = self.controller.duty();
        let outcome = self.controller.handle_mesh(level, is_override, now_ms);

        if outcome.override_started {
            info!("mesh override: level {} for 30 s", level);
            sink.emit(&AppEvent::OverrideStarted { level });
        }

        if let Some(duty) = outcome.apply_duty {
            self.slots.set_target(duty);
            sink.emit(&AppEvent::DutyChanged {
                from: prev_duty,
                to: duty,
            });
            self.persist(store);
        }

        if outcome.persist {
            info!("mesh suggestion: target {} lux", self.controller.target_lux());
            sink.emit(&AppEvent::TargetChanged {
                lux: self.controller.target_lux(),
            });
            self.persist(store);
        }
    }

    fn on_set_target(&mut self, target: i32, store: &mut impl ConfigPort, sink: &mut impl EventSink) {
        let prev_duty = self.controller.duty();
        let outcome = self.controller.set_target(target);

        if outcome.calibration_entered {
            info!("forced calibration entered");
            sink.emit(&AppEvent::CalibrationEntered);
            return;
        }

        if let Some(duty) = outcome.direct_duty {
            self.slots.set_target(duty);
            if duty != prev_duty {
                sink.emit(&AppEvent::DutyChanged {
                    from: prev_duty,
                    to: duty,
                });
            }
        }

        if outcome.persist {
            sink.emit(&AppEvent::TargetChanged {
                lux: self.controller.target_lux(),
            });
            self.persist(store);
        }
    }

    fn persist(&self, store: &mut impl ConfigPort) {
        if self.controller.calibration_active() {
            // Bench constants are pinned, never written back.
            return;
        }
        if let Err(e) = store.save(self.controller.config()) {
            warn!("config save failed: {}", e);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Live fade level, for status dumps.
    pub fn level(&self) -> u16 {
        self.slots.level()
    }

    /// Regulated duty target (0..=32).
    pub fn duty(&self) -> u16 {
        self.controller.duty()
    }

    pub fn target_lux(&self) -> u32 {
        self.controller.target_lux()
    }

    pub fn override_active(&self, now_ms: u64) -> bool {
        self.controller.override_active(now_ms)
    }

    pub fn config(&self) -> &LampConfig {
        self.controller.config()
    }
}
