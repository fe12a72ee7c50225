//! Slot-based lamp synchronizer.
//!
//! One cycle is 10 slots of 500 ms. Slots interleave the lamp output
//! with the windows the optical subsystems need:
//!
//! ```text
//!   slot 0: lightcode exchange (every 4th cycle)
//!   slot 2: natural measurement, lamp contribution compensated (every 2nd cycle)
//!   slot 6: environment measurement (every cycle)
//!   all slots: fade step every 4 ticks, pattern refresh every 2 ticks
//! ```
//!
//! The driver is a single owned struct mutated only from the slot tick
//! handler; everything it decides comes out through [`TickOutput`].

use heapless::Vec;

use crate::config::{MAX_DUTY, PWM_MAX_VALUE, PWM_SEQUENCE_LEN, SLOT_COUNT};

/// Slot assignments within the cycle.
pub const EXCHANGE_SLOT: u8 = 0;
pub const NATURAL_SLOT: u8 = 2;
pub const ENV_SLOT: u8 = 6;

/// Cycle prescalers: how many visits to a slot pass between actions.
pub const EXCHANGE_PRESCALER: u8 = 4;
pub const NATURAL_PRESCALER: u8 = 2;

/// Ticks between fade steps (one ±1 move per 2 s).
pub const FADE_PRESCALER: u8 = 4;

/// Ticks between pattern refreshes.
pub const PATTERN_PRESCALER: u8 = 2;

/// Work the service must carry out for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    /// Pick up and decode the lightcode capture, then re-arm it.
    DecodeLightcode,
    /// Measure lux with the lamp contribution compensated out.
    SampleNatural,
    /// Measure total lux at the surface.
    SampleEnvironment,
}

/// Result of one slot tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutput {
    pub actions: Vec<SlotAction, 2>,
    /// New 13-bit hardware duty, present only when it changed.
    pub apply_duty: Option<u32>,
}

/// Owned synchronizer state: slot cursor, fade level, output pattern.
pub struct SlotDriver {
    current_slot: u8,
    level: u16,
    target: u16,
    pattern: [bool; PWM_SEQUENCE_LEN],
    last_hw_duty: Option<u32>,
    fade_counter: u8,
    pattern_counter: u8,
    exchange_counter: u8,
    natural_counter: u8,
}

impl SlotDriver {
    pub fn new() -> Self {
        Self {
            current_slot: 0,
            level: 0,
            target: 0,
            pattern: [false; PWM_SEQUENCE_LEN],
            last_hw_duty: None,
            fade_counter: 0,
            pattern_counter: 0,
            exchange_counter: 0,
            natural_counter: 0,
        }
    }

    /// Set the fade target. The live level only ever moves toward it by
    /// ±1 per fade step; it never jumps.
    pub fn set_target(&mut self, duty: u16) {
        self.target = duty.min(MAX_DUTY);
    }

    /// Live fade level (0..=32). Published to the zero-cross ISR.
    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    pub fn current_slot(&self) -> u8 {
        self.current_slot
    }

    /// Advance one slot. Runs the fade, schedules the slot's action, and
    /// refreshes the output pattern on its own cadence.
    pub fn tick(&mut self) -> TickOutput {
        let mut out = TickOutput::default();

        self.fade_counter += 1;
        if self.fade_counter >= FADE_PRESCALER {
            self.fade_counter = 0;
            self.fade_step();
        }

        match self.current_slot {
            EXCHANGE_SLOT => {
                self.exchange_counter += 1;
                if self.exchange_counter >= EXCHANGE_PRESCALER {
                    self.exchange_counter = 0;
                    // Infallible: capacity 2, at most one action per tick.
                    let _ = out.actions.push(SlotAction::DecodeLightcode);
                }
            }
            NATURAL_SLOT => {
                self.natural_counter += 1;
                if self.natural_counter >= NATURAL_PRESCALER {
                    self.natural_counter = 0;
                    let _ = out.actions.push(SlotAction::SampleNatural);
                }
            }
            ENV_SLOT => {
                let _ = out.actions.push(SlotAction::SampleEnvironment);
            }
            _ => {}
        }

        self.pattern_counter += 1;
        if self.pattern_counter >= PATTERN_PRESCALER {
            self.pattern_counter = 0;
            out.apply_duty = self.refresh_pattern();
        }

        self.current_slot = (self.current_slot + 1) % SLOT_COUNT;
        out
    }

    fn fade_step(&mut self) {
        if self.level < self.target {
            self.level += 1;
        } else if self.level > self.target {
            self.level -= 1;
        }
    }

    /// Rebuild the on/off pattern from the live level and scale the
    /// on-count to the 13-bit register range. Returns the new value only
    /// when it differs from the last one written.
    fn refresh_pattern(&mut self) -> Option<u32> {
        for (i, slot) in self.pattern.iter_mut().enumerate() {
            *slot = i < usize::from(self.level);
        }

        let on_count = self.pattern.iter().filter(|&&on| on).count() as u32;
        let duty = on_count * PWM_MAX_VALUE / PWM_SEQUENCE_LEN as u32;

        if self.last_hw_duty == Some(duty) {
            None
        } else {
            self.last_hw_duty = Some(duty);
            Some(duty)
        }
    }
}

impl Default for SlotDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cycle(d: &mut SlotDriver) -> Vec<(u8, TickOutput), 10> {
        let mut outs = Vec::new();
        for _ in 0..SLOT_COUNT {
            let slot = d.current_slot();
            let _ = outs.push((slot, d.tick()));
        }
        outs
    }

    #[test]
    fn fade_moves_one_step_per_prescaled_tick() {
        let mut d = SlotDriver::new();
        d.set_target(3);

        let mut levels = std::vec::Vec::new();
        for _ in 0..(FADE_PRESCALER as usize * 5) {
            d.tick();
            levels.push(d.level());
        }

        // One step every FADE_PRESCALER ticks, holding once on target.
        assert_eq!(d.level(), 3);
        for pair in levels.windows(2) {
            assert!(pair[1].abs_diff(pair[0]) <= 1, "fade jumped: {pair:?}");
        }
    }

    #[test]
    fn fade_descends_symmetrically() {
        let mut d = SlotDriver::new();
        d.set_target(2);
        for _ in 0..(FADE_PRESCALER as usize * 4) {
            d.tick();
        }
        assert_eq!(d.level(), 2);

        d.set_target(0);
        for _ in 0..(FADE_PRESCALER as usize * 4) {
            d.tick();
        }
        assert_eq!(d.level(), 0);
    }

    #[test]
    fn target_is_clamped() {
        let mut d = SlotDriver::new();
        d.set_target(200);
        assert_eq!(d.target(), MAX_DUTY);
    }

    #[test]
    fn hardware_duty_written_only_on_change() {
        let mut d = SlotDriver::new();

        let mut writes = std::vec::Vec::new();
        for _ in 0..(SLOT_COUNT as usize * 2) {
            if let Some(duty) = d.tick().apply_duty {
                writes.push(duty);
            }
        }
        // Level stays 0: exactly the initial write of duty 0.
        assert_eq!(writes, vec![0]);
    }

    #[test]
    fn duty_scaling_matches_level() {
        let mut d = SlotDriver::new();
        d.set_target(MAX_DUTY);

        let mut last = 0;
        for _ in 0..(FADE_PRESCALER as usize * MAX_DUTY as usize + 8) {
            if let Some(duty) = d.tick().apply_duty {
                last = duty;
            }
        }
        assert_eq!(d.level(), MAX_DUTY);
        assert_eq!(last, PWM_MAX_VALUE);
    }

    #[test]
    fn env_sample_fires_every_cycle() {
        let mut d = SlotDriver::new();
        for cycle in 0..3 {
            let outs = run_cycle(&mut d);
            let env_hits: std::vec::Vec<_> = outs
                .iter()
                .filter(|(_, o)| o.actions.contains(&SlotAction::SampleEnvironment))
                .collect();
            assert_eq!(env_hits.len(), 1, "cycle {cycle}");
            assert_eq!(env_hits[0].0, ENV_SLOT);
        }
    }

    #[test]
    fn natural_and_exchange_respect_prescalers() {
        let mut d = SlotDriver::new();
        let mut natural = 0;
        let mut exchange = 0;
        for _ in 0..(SLOT_COUNT as usize * 8) {
            let out = d.tick();
            if out.actions.contains(&SlotAction::SampleNatural) {
                natural += 1;
            }
            if out.actions.contains(&SlotAction::DecodeLightcode) {
                exchange += 1;
            }
        }
        // 8 cycles: natural every 2nd, exchange every 4th.
        assert_eq!(natural, 4);
        assert_eq!(exchange, 2);
    }

    #[test]
    fn slot_cursor_wraps() {
        let mut d = SlotDriver::new();
        for _ in 0..SLOT_COUNT {
            d.tick();
        }
        assert_eq!(d.current_slot(), 0);
    }
}
