//! End-to-end regulation loop: service + simulated room, driven the way
//! the main loop drives it (slot ticks in, follow-up measurements fed
//! straight back, the wall clock advancing one slot per tick).

use luxnode::app::events::AppEvent;
use luxnode::app::service::LampService;
use luxnode::config::{LampConfig, MAX_DUTY, PWM_MAX_VALUE, PWM_SEQUENCE_LEN, SLOT_TIME_MS};
use luxnode::events::Event;

use crate::mock_hw::{MemStore, Recorder, SimRoom};

fn pump(
    svc: &mut LampService,
    room: &mut SimRoom,
    store: &mut MemStore,
    sink: &mut Recorder,
    clock: &mut u64,
    ticks: usize,
) {
    for _ in 0..ticks {
        *clock += u64::from(SLOT_TIME_MS);
        let ups = svc.dispatch(Event::SlotTick, *clock, room, store, sink);
        for e in ups {
            svc.dispatch(e, *clock, room, store, sink);
        }
    }
}

#[test]
fn dark_room_regulation_settles_near_the_target() {
    let mut svc = LampService::new(LampConfig::default());
    let mut room = SimRoom::new(0);
    let mut store = MemStore::new();
    let mut sink = Recorder::new();
    let mut clock = 0u64;

    pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 80_000);

    // The model's resting band: sensed + modelled lamp light within one
    // dimm step of the 400 lux target.
    let duty = svc.duty();
    assert!((8..=13).contains(&duty), "duty {duty} outside resting band");

    // The fade tracked the regulated duty all the way to the hardware.
    assert_eq!(svc.level(), duty);
    assert_eq!(
        room.last_hw_duty(),
        Some(u32::from(duty) * PWM_MAX_VALUE / PWM_SEQUENCE_LEN as u32)
    );

    // Every duty move was reported and the last one persisted.
    assert!(sink.any(|e| matches!(e, AppEvent::DutyChanged { .. })));
    assert!(sink.any(|e| matches!(e, AppEvent::Illuminance { .. })));
    assert_eq!(store.stored().map(|c| c.current_duty), Some(duty));
}

#[test]
fn daylight_keeps_the_lamp_dimmed() {
    let mut svc = LampService::new(LampConfig::default());
    let mut room = SimRoom::new(300);
    let mut store = MemStore::new();
    let mut sink = Recorder::new();
    let mut clock = 0u64;

    pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 80_000);

    // 300 lux of daylight toward a 400 lux target: the lamp only tops
    // up, it never ramps anywhere near the dark-room duty.
    assert!(svc.duty() <= 3, "duty {} under daylight", svc.duty());
    assert!(svc.duty() <= MAX_DUTY);
}

#[test]
fn gateway_override_holds_the_duty_until_it_lapses() {
    let mut svc = LampService::new(LampConfig::default());
    let mut room = SimRoom::new(0);
    let mut store = MemStore::new();
    let mut sink = Recorder::new();
    let mut clock = 0u64;

    pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 100);

    svc.dispatch(
        Event::MeshCommand { level: 15, is_override: true },
        clock,
        &mut room,
        &mut store,
        &mut sink,
    );
    assert!(svc.override_active(clock));
    assert_eq!(svc.duty(), 15);

    // Keep refreshing faster than the 30 s deadline; regulation stays
    // suspended across completed measurement windows.
    for _ in 0..10 {
        svc.dispatch(
            Event::MeshCommand { level: 15, is_override: true },
            clock,
            &mut room,
            &mut store,
            &mut sink,
        );
        pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 55);
    }
    assert_eq!(svc.duty(), 15);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::DutyChanged { .. })),
        1,
        "only the initial pin may move the duty while held"
    );

    // Stop refreshing: the next completed window reports the expiry and
    // regulation pulls the lamp back into its resting band.
    pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 80_000);
    assert!(!svc.override_active(clock));
    assert!(sink.any(|e| matches!(e, AppEvent::OverrideExpired)));
    assert!(
        (8..=13).contains(&svc.duty()),
        "duty {} did not re-regulate",
        svc.duty()
    );
}

#[test]
fn forced_duty_command_bypasses_regulation() {
    let mut svc = LampService::new(LampConfig {
        current_duty: 20,
        ..LampConfig::default()
    });
    let mut room = SimRoom::new(0);
    let mut store = MemStore::new();
    let mut sink = Recorder::new();
    let mut clock = 0u64;

    svc.dispatch(
        Event::SetTarget { target: -6 },
        clock,
        &mut room,
        &mut store,
        &mut sink,
    );
    assert_eq!(svc.duty(), 6);
    assert_eq!(svc.target_lux(), 0);
    assert!(sink.any(|e| matches!(e, AppEvent::TargetChanged { lux: 0 })));
    assert!(sink.any(|e| matches!(e, AppEvent::DutyChanged { from: 20, to: 6 })));

    // The fade walks to the forced level and the hardware write follows.
    pump(&mut svc, &mut room, &mut store, &mut sink, &mut clock, 200);
    assert_eq!(svc.level(), 6);
    assert_eq!(
        room.last_hw_duty(),
        Some(6 * PWM_MAX_VALUE / PWM_SEQUENCE_LEN as u32)
    );
}
