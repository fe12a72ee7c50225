//! Real-hardware port bundle.
//!
//! One zero-sized adapter implements every hardware-facing port by
//! delegating to the dual-target driver functions, so `main()` hands a
//! single value to the service and the sim build picks up the injection
//! backends automatically.

use crate::app::ports::{DutySink, LuxProbe, SenseWindowSource};
use crate::drivers::{hw_init, hw_timer};
use crate::events::LuxKind;
use crate::lightcode::SENSE_WINDOW;
use crate::sensors;

pub struct Hardware;

impl Hardware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Hardware {
    fn default() -> Self {
        Self::new()
    }
}

impl LuxProbe for Hardware {
    fn measure(&mut self, kind: LuxKind, level: u16) -> Option<u32> {
        sensors::measure(kind, level)
    }
}

impl DutySink for Hardware {
    fn apply(&mut self, hw_duty: u32) {
        hw_init::lamp_duty_write(hw_duty);
    }
}

impl SenseWindowSource for Hardware {
    fn take_window(&mut self) -> [u8; SENSE_WINDOW] {
        hw_timer::take_sense_window()
    }
}
