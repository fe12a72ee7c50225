//! Sense capture flow: sampler sim → event queue → service pickup →
//! decode, through the real `Hardware` adapter and a static queue, the
//! same wiring `main` uses.
//!
//! Single test: the capture buffer and the queue binding are
//! process-wide statics.

use luxnode::adapters::hardware::Hardware;
use luxnode::app::events::AppEvent;
use luxnode::app::service::LampService;
use luxnode::config::LampConfig;
use luxnode::drivers::hw_timer;
use luxnode::events::{Event, LuxKind};
use luxnode::lightcode::{MASTER_CODE, SENSE_WINDOW};
use luxnode::scheduler::EventQueue;
use luxnode::sensors;

use crate::mock_hw::{MemStore, Recorder};

static EVENTS: EventQueue = EventQueue::new();

/// Raw master-code transmission as a neighbor lamp would emit it:
/// alternating bits with the 1-runs pre-compensated for the receive
/// filter's stretch, then a sub-threshold flicker tail.
fn master_window() -> [u8; SENSE_WINDOW] {
    let mut window = [0u8; SENSE_WINDOW];
    for k in [1usize, 3, 5] {
        let a = 19 + 5 * k;
        for s in &mut window[a..a + 4] {
            *s = 1;
        }
    }
    for idx in 55..SENSE_WINDOW {
        window[idx] = u8::from(((idx - 20) / 3) % 2 == 1);
    }
    window
}

#[test]
fn capture_flows_from_sampler_to_code_detection() {
    hw_timer::bind_queue(&EVENTS);
    hw_timer::start_sense_sampler().expect("sampler");

    // The sampler fills the buffer and queues the window-ready signal.
    hw_timer::sim_feed_sense_window(&master_window());

    sensors::sim_set_lux(LuxKind::Natural, 100);
    sensors::sim_set_lux(LuxKind::Environment, 100);

    let mut svc = LampService::new(LampConfig::default());
    let mut hw = Hardware::new();
    let mut store = MemStore::new();
    let mut sink = Recorder::new();

    // Drive the loop exactly like main: ticks in through the queue,
    // follow-ups submitted back.
    for _ in 0..40 {
        EVENTS.submit(Event::SlotTick).expect("queue has headroom");
        EVENTS.drain(8, |event| {
            let ups = svc.dispatch(event, 0, &mut hw, &mut store, &mut sink);
            for e in ups {
                let _ = EVENTS.submit(e);
            }
        });
    }

    // The exchange slot's 4th visit picked the capture up and decoded
    // the neighbor's code.
    assert!(sink.any(|e| matches!(e, AppEvent::CodeDetected { code } if *code == MASTER_CODE)));
    assert_eq!(EVENTS.stats().dropped, 0);
}
