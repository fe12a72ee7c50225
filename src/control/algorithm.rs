//! Illumination control algorithm.
//!
//! Holds ambient illuminance at the configured target by steering the
//! lamp duty through a physical lamp model:
//!
//! ```text
//!   lux samples ──▶ 50-sample pre-averages ──▶ 10-entry windows
//!                                               │ live   → telemetry
//!                                               │ stable → model step
//!   model: e_lamp = duty·η·τ/d²
//!          variation = (target − (e_lamp + e_env)) · weight · dimm_step
//!          e_new = max(e_lamp + variation, e_min)
//!          duty' = clamp(round(e_new·d²/(η·τ)), 0, 32)
//! ```
//!
//! A direct mesh command pins the duty for 30 s and suspends the model;
//! a mesh suggestion retunes the target and re-runs the model at once
//! (unless a direct command currently holds the lamp). Forced
//! calibration pins bench constants without persisting them.

use crate::config::{
    CALIBRATION_MAGIC_TARGET, LUX_PER_MESH_LEVEL, LampConfig, MAX_DUTY, MESH_OVERRIDE_MS,
};
use crate::control::rolling::{LuxWindow, RollingAverage};
use crate::events::LuxKind;

/// Pre-average window sizes (samples per completed mean).
pub const NATURAL_WINDOW: u16 = 50;
pub const ENV_WINDOW: u16 = 50;

/// Algorithm window sizes (completed pre-averages per step output).
pub const LIVE_WINDOW: u16 = 10;
pub const STABLE_WINDOW: u16 = 10;

// Bench-calibration constants, pinned while forced calibration is active.
const CAL_TARGET_LUX: u32 = 400;
const CAL_EFFICIENCY: f32 = 18.75;
const CAL_DISTANCE: f32 = 2.5;
const CAL_TRANSPARENCY: f32 = 1.0;
const CAL_DIMM_STEP: f32 = 0.3;
const CAL_MIN_FRACTION: f32 = 0.01;
const CAL_E_MAX: f32 = 2000.0;

/// Telemetry snapshot produced when the live window completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveReading {
    pub natural: f32,
    pub env: f32,
    pub lamp: f32,
    pub duty: u16,
}

/// Result of one algorithm step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    /// New duty to apply and persist, when it differs from the current one.
    pub new_duty: Option<u16>,
    /// Fresh live reading, when the live window completed.
    pub live: Option<LiveReading>,
    /// A mesh override lapsed during this step.
    pub override_expired: bool,
}

/// Result of a mesh command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshOutcome {
    /// Duty to apply right now (direct override with a different level).
    pub apply_duty: Option<u16>,
    /// The persisted config changed (target retune).
    pub persist: bool,
    /// A direct override was started or refreshed.
    pub override_started: bool,
}

/// Result of a set-target command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetOutcome {
    /// Duty to force immediately (negative/zero targets).
    pub direct_duty: Option<u16>,
    /// The persisted config changed.
    pub persist: bool,
    /// The magic value switched forced calibration on.
    pub calibration_entered: bool,
}

#[derive(Debug, Clone, Copy)]
struct MeshOverride {
    level: u16,
    expires_at_ms: u64,
}

/// Model parameters for one step: the working config, or the pinned
/// calibration constants.
#[derive(Debug, Clone)]
struct ModelParams {
    cfg: LampConfig,
    e_max: f32,
}

impl ModelParams {
    fn e_min(&self) -> f32 {
        self.cfg.min_fraction * self.e_max
    }
}

/// Closed-loop illumination controller. One owned instance, mutated only
/// from the event dispatch path.
pub struct IlluminationController {
    config: LampConfig,
    natural: RollingAverage,
    env: RollingAverage,
    live: LuxWindow,
    stable: LuxWindow,
    duty: u16,
    override_state: Option<MeshOverride>,
    calibration: bool,
    // Latest converted means, for status queries.
    e_natural: f32,
    e_env: f32,
}

impl IlluminationController {
    /// Build from a (validated) stored config; the persisted duty seeds
    /// the loop so the lamp resumes where it left off.
    pub fn new(config: LampConfig) -> Self {
        let duty = config.current_duty.min(MAX_DUTY);
        Self {
            config,
            natural: RollingAverage::new(NATURAL_WINDOW),
            env: RollingAverage::new(ENV_WINDOW),
            live: LuxWindow::new(LIVE_WINDOW),
            stable: LuxWindow::new(STABLE_WINDOW),
            duty,
            override_state: None,
            calibration: false,
            e_natural: 0.0,
            e_env: 0.0,
        }
    }

    /// First-boot duty estimate when no stored config exists: half the
    /// ideal duty for the target, kept inside a conservative band.
    pub fn initial_duty_estimate(config: &LampConfig) -> u16 {
        let base = config.target_lux as f32 / (config.efficiency * 2.0);
        (base.clamp(3.0, 20.0) + 0.5) as u16
    }

    /// Feed one lux sample. An environment sample that completes its
    /// pre-average window triggers one algorithm step.
    pub fn ingest_sample(&mut self, kind: LuxKind, lux: u32, now_ms: u64) -> Option<StepOutcome> {
        let completed = match kind {
            LuxKind::Natural => {
                self.natural.push(lux);
                false
            }
            LuxKind::Environment => self.env.push(lux),
        };
        completed.then(|| self.step(now_ms))
    }

    /// One algorithm step: accumulate the current pre-average means into
    /// the live and stable windows, and run the model when the stable
    /// window completes.
    fn step(&mut self, now_ms: u64) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        if let Some(ov) = self.override_state {
            if now_ms < ov.expires_at_ms {
                // Model suspended while the gateway holds the lamp.
                return outcome;
            }
            self.override_state = None;
            outcome.override_expired = true;
        }

        let params = self.params();
        let natural_mean = self.natural.mean();
        let env_mean = self.env.mean();

        if let Some((n, e)) = self.live.push(natural_mean, env_mean) {
            let (e_natural, e_env) = Self::convert_means(&params, n, e);
            self.e_natural = e_natural;
            self.e_env = e_env;
            outcome.live = Some(LiveReading {
                natural: e_natural,
                env: e_env,
                lamp: params.cfg.duty_to_intensity(self.duty),
                duty: self.duty,
            });
        }

        if let Some((n, e)) = self.stable.push(natural_mean, env_mean) {
            let (e_natural, e_env) = Self::convert_means(&params, n, e);
            let new_duty = self.run_model(&params, e_natural, e_env);
            if new_duty != self.duty {
                self.duty = new_duty;
                self.config.current_duty = new_duty;
                outcome.new_duty = Some(new_duty);
            }
        }

        outcome
    }

    /// Pre-average means → surface illuminance, with the environment
    /// reading clamped to at least the natural one (the lamp cannot make
    /// the room darker).
    fn convert_means(params: &ModelParams, natural_mean: f32, env_mean: f32) -> (f32, f32) {
        let cfg = &params.cfg;
        let e_natural = natural_mean / cfg.transparency;
        let e_env = env_mean * (cfg.distance * cfg.distance) / cfg.transparency;
        (e_natural, e_env.max(e_natural))
    }

    fn run_model(&self, params: &ModelParams, e_natural: f32, e_env: f32) -> u16 {
        let cfg = &params.cfg;
        let target = cfg.target_lux as f32;
        let e_lamp = cfg.duty_to_intensity(self.duty);

        // Daylight-proportional gain; unity when either term is zero.
        let weight = if e_natural > 0.0 && cfg.target_lux > 0 {
            e_natural / target
        } else {
            1.0
        };

        let variation = (target - (e_lamp + e_env)) * weight * cfg.dimm_step;
        let e_new = (e_lamp + variation).max(params.e_min());
        cfg.intensity_to_duty(e_new)
    }

    fn params(&self) -> ModelParams {
        if self.calibration {
            ModelParams {
                cfg: LampConfig {
                    target_lux: CAL_TARGET_LUX,
                    efficiency: CAL_EFFICIENCY,
                    distance: CAL_DISTANCE,
                    transparency: CAL_TRANSPARENCY,
                    dimm_step: CAL_DIMM_STEP,
                    min_fraction: CAL_MIN_FRACTION,
                    current_duty: self.duty,
                },
                e_max: CAL_E_MAX,
            }
        } else {
            ModelParams {
                cfg: self.config.clone(),
                e_max: self.config.intensity_max(),
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Handle a gateway dimming command. Direct commands pin the duty
    /// for [`MESH_OVERRIDE_MS`]; suggestions retune the target and run
    /// one control cycle immediately when no override is active.
    pub fn handle_mesh(&mut self, level: u8, is_override: bool, now_ms: u64) -> MeshOutcome {
        let level = u16::from(level).min(MAX_DUTY);
        let mut outcome = MeshOutcome::default();

        if is_override {
            self.override_state = Some(MeshOverride {
                level,
                expires_at_ms: now_ms + MESH_OVERRIDE_MS,
            });
            outcome.override_started = true;
            if level != self.duty {
                self.duty = level;
                self.config.current_duty = level;
                outcome.apply_duty = Some(level);
            }
        } else {
            let new_target = u32::from(level) * LUX_PER_MESH_LEVEL;
            if new_target != self.config.target_lux {
                self.config.target_lux = new_target;
                outcome.persist = true;
            }
            // A suggestion re-runs the model right away with the current
            // pre-average means instead of waiting out the stable window,
            // unless a direct command holds the lamp.
            if !self.override_active(now_ms) {
                let params = self.params();
                let (e_natural, e_env) = Self::convert_means(
                    &params,
                    self.natural.mean() as f32,
                    self.env.mean() as f32,
                );
                let new_duty = self.run_model(&params, e_natural, e_env);
                if new_duty != self.duty {
                    self.duty = new_duty;
                    self.config.current_duty = new_duty;
                    outcome.apply_duty = Some(new_duty);
                }
            }
        }

        outcome
    }

    /// Handle a set-target command:
    /// the magic constant enters forced calibration; positive values set
    /// the target; negative values force duty `|t|` with target 0; zero
    /// turns the lamp off.
    pub fn set_target(&mut self, target: i32) -> TargetOutcome {
        if target == CALIBRATION_MAGIC_TARGET {
            self.calibration = true;
            return TargetOutcome {
                calibration_entered: true,
                ..TargetOutcome::default()
            };
        }

        let mut outcome = TargetOutcome {
            persist: true,
            ..TargetOutcome::default()
        };
        if target > 0 {
            self.config.target_lux = target as u32;
        } else {
            self.config.target_lux = 0;
            let forced = (target.unsigned_abs() as u16).min(MAX_DUTY);
            self.duty = forced;
            self.config.current_duty = forced;
            outcome.direct_duty = Some(forced);
        }
        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn target_lux(&self) -> u32 {
        self.config.target_lux
    }

    pub fn config(&self) -> &LampConfig {
        &self.config
    }

    pub fn calibration_active(&self) -> bool {
        self.calibration
    }

    pub fn override_active(&self, now_ms: u64) -> bool {
        self.override_state
            .is_some_and(|ov| now_ms < ov.expires_at_ms)
    }

    /// Seconds until an active override lapses.
    pub fn override_remaining_secs(&self, now_ms: u64) -> u32 {
        match self.override_state {
            Some(ov) if now_ms < ov.expires_at_ms => ((ov.expires_at_ms - now_ms) / 1000) as u32,
            _ => 0,
        }
    }

    pub fn override_level(&self) -> Option<u16> {
        self.override_state.map(|ov| ov.level)
    }

    /// Latest converted means, for status dumps.
    pub fn illuminance(&self) -> (f32, f32) {
        (self.e_natural, self.e_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed enough interleaved samples to produce `steps` algorithm
    /// steps, with the environment reading simulating a lamp of gain
    /// `18.75 lux/duty` on top of `natural` lux. Returns every outcome.
    fn run_steps(
        ctrl: &mut IlluminationController,
        natural: u32,
        steps: usize,
        now_ms: u64,
    ) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..steps {
            let env = natural + (f32::from(ctrl.duty()) * 18.75) as u32;
            for _ in 0..NATURAL_WINDOW {
                assert!(
                    ctrl.ingest_sample(LuxKind::Natural, natural, now_ms)
                        .is_none()
                );
            }
            for i in 0..ENV_WINDOW {
                let out = ctrl.ingest_sample(LuxKind::Environment, env, now_ms);
                if i == ENV_WINDOW - 1 {
                    outcomes.push(out.expect("env window completion must step"));
                } else {
                    assert!(out.is_none());
                }
            }
        }
        outcomes
    }

    #[test]
    fn dark_room_ramps_duty_up_toward_target() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        assert_eq!(ctrl.duty(), 0);

        // Each stable-window completion (every STABLE_WINDOW steps) may
        // move the duty. Run enough steps for several updates.
        let outcomes = run_steps(&mut ctrl, 0, STABLE_WINDOW as usize * 6, 0);
        let updates: Vec<u16> = outcomes.iter().filter_map(|o| o.new_duty).collect();

        assert!(!updates.is_empty(), "duty never moved");
        assert!(ctrl.duty() > 0);
        assert!(ctrl.duty() <= MAX_DUTY);
        // First update must move up, never jump negative.
        assert!(updates[0] > 0);
    }

    #[test]
    fn duty_always_within_range() {
        let mut ctrl = IlluminationController::new(LampConfig {
            target_lux: 100_000,
            ..LampConfig::default()
        });
        let outcomes = run_steps(&mut ctrl, 50_000, STABLE_WINDOW as usize * 4, 0);
        for o in outcomes {
            if let Some(d) = o.new_duty {
                assert!(d <= MAX_DUTY);
            }
        }
        assert!(ctrl.duty() <= MAX_DUTY);
    }

    #[test]
    fn zero_target_decays_to_minimum() {
        let mut ctrl = IlluminationController::new(LampConfig {
            target_lux: 0,
            current_duty: 20,
            ..LampConfig::default()
        });
        run_steps(&mut ctrl, 0, STABLE_WINDOW as usize * 12, 0);
        // Rounding gives the decay a fixed point at duty 2 (≈6 % light),
        // right at the configured minimum intensity.
        assert!(ctrl.duty() <= 2, "duty {} did not decay", ctrl.duty());
    }

    #[test]
    fn live_reading_arrives_with_window_completion() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        let outcomes = run_steps(&mut ctrl, 120, LIVE_WINDOW as usize, 0);

        let live = outcomes
            .last()
            .unwrap()
            .live
            .expect("live window must complete");
        // Natural pre-average is 120 lux; transparency 1, so it passes
        // through unchanged.
        assert!((live.natural - 120.0).abs() < 1.0);
        assert!(live.env >= live.natural, "env clamped to natural");
    }

    #[test]
    fn override_suspends_model_and_expiry_restores_it() {
        let mut ctrl = IlluminationController::new(LampConfig::default());

        let out = ctrl.handle_mesh(15, true, 1_000);
        assert!(out.override_started);
        assert_eq!(out.apply_duty, Some(15));
        assert!(ctrl.override_active(1_000));
        assert_eq!(ctrl.override_level(), Some(15));

        // While active: steps produce nothing.
        let during = run_steps(&mut ctrl, 0, STABLE_WINDOW as usize * 2, 2_000);
        assert!(during.iter().all(|o| *o == StepOutcome::default()));
        assert_eq!(ctrl.duty(), 15);

        // After 30 s: the first step reports expiry and control resumes.
        let after = run_steps(&mut ctrl, 0, STABLE_WINDOW as usize * 2, 1_000 + MESH_OVERRIDE_MS);
        assert!(after[0].override_expired);
        assert!(!ctrl.override_active(1_000 + MESH_OVERRIDE_MS));
        assert!(after.iter().any(|o| o.new_duty.is_some()));
    }

    #[test]
    fn override_refresh_extends_deadline() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        ctrl.handle_mesh(10, true, 0);
        ctrl.handle_mesh(10, true, 25_000);
        assert!(ctrl.override_active(40_000));
        assert_eq!(ctrl.override_remaining_secs(25_000), 30);
    }

    #[test]
    fn suggestion_retunes_target_without_override() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        let out = ctrl.handle_mesh(20, false, 0);
        assert!(!out.override_started);
        assert!(out.persist);
        assert_eq!(ctrl.target_lux(), 500);
        assert!(!ctrl.override_active(0));

        // Same suggestion again: nothing to persist.
        let again = ctrl.handle_mesh(20, false, 0);
        assert!(!again.persist);
    }

    #[test]
    fn suggestion_runs_a_control_cycle_at_once() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        // Accumulate pre-average means well short of a stable-window
        // completion; the model has not run yet.
        run_steps(&mut ctrl, 0, 3, 0);
        assert_eq!(ctrl.duty(), 0);

        // The retune must not sit idle until the next stable window:
        // the model re-runs on the spot with the new target.
        let out = ctrl.handle_mesh(20, false, 0);
        assert!(out.persist);
        assert_eq!(ctrl.target_lux(), 500);
        let applied = out.apply_duty.expect("retune must move the duty now");
        assert_eq!(applied, ctrl.duty());
        assert!(ctrl.duty() > 0);
        assert!(ctrl.duty() <= MAX_DUTY);
    }

    #[test]
    fn suggestion_during_override_defers_to_the_hold() {
        let mut ctrl = IlluminationController::new(LampConfig::default());
        ctrl.handle_mesh(15, true, 0);

        // Target retunes, but the pinned duty stays until expiry.
        let out = ctrl.handle_mesh(20, false, 1_000);
        assert!(out.persist);
        assert_eq!(out.apply_duty, None);
        assert_eq!(ctrl.duty(), 15);
        assert_eq!(ctrl.target_lux(), 500);
    }

    #[test]
    fn set_target_variants() {
        let mut ctrl = IlluminationController::new(LampConfig::default());

        let out = ctrl.set_target(650);
        assert!(out.persist);
        assert_eq!(ctrl.target_lux(), 650);
        assert_eq!(out.direct_duty, None);

        let out = ctrl.set_target(-12);
        assert_eq!(out.direct_duty, Some(12));
        assert_eq!(ctrl.target_lux(), 0);
        assert_eq!(ctrl.duty(), 12);

        let out = ctrl.set_target(0);
        assert_eq!(out.direct_duty, Some(0));
        assert_eq!(ctrl.duty(), 0);

        let out = ctrl.set_target(CALIBRATION_MAGIC_TARGET);
        assert!(out.calibration_entered);
        assert!(!out.persist);
        assert!(ctrl.calibration_active());
    }

    #[test]
    fn initial_duty_estimate_band() {
        let cfg = LampConfig::default();
        let est = IlluminationController::initial_duty_estimate(&cfg);
        // 400 / (18.75 * 2) ≈ 10.7
        assert_eq!(est, 11);

        let dim = LampConfig {
            target_lux: 10,
            ..LampConfig::default()
        };
        assert_eq!(IlluminationController::initial_duty_estimate(&dim), 3);

        let bright = LampConfig {
            target_lux: 100_000,
            ..LampConfig::default()
        };
        assert_eq!(IlluminationController::initial_duty_estimate(&bright), 20);
    }

    #[test]
    fn persisted_duty_seeds_the_loop() {
        let ctrl = IlluminationController::new(LampConfig {
            current_duty: 17,
            ..LampConfig::default()
        });
        assert_eq!(ctrl.duty(), 17);
    }
}
