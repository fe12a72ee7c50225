//! Persistence flows through the real store (host backend): the service
//! writes duty changes under the MAC-derived record key, and a later
//! boot resumes from what was written.

use luxnode::adapters::device_id;
use luxnode::adapters::nvs::ConfigStore;
use luxnode::app::ports::{ConfigError, ConfigPort, StoragePort};
use luxnode::app::service::LampService;
use luxnode::config::LampConfig;
use luxnode::events::Event;

use crate::mock_hw::{Recorder, SimRoom};

fn fresh_store() -> ConfigStore {
    let key = device_id::config_key(&device_id::read_mac());
    ConfigStore::new(key).expect("store init")
}

#[test]
fn service_writes_duty_changes_through_the_store() {
    let mut store = fresh_store();
    let mut svc = LampService::new(LampConfig::default());
    let mut room = SimRoom::new(0);
    let mut sink = Recorder::new();

    svc.dispatch(
        Event::MeshCommand { level: 18, is_override: true },
        0,
        &mut room,
        &mut store,
        &mut sink,
    );

    let reloaded = store.load().expect("persisted");
    assert_eq!(reloaded.current_duty, 18);
}

#[test]
fn next_boot_resumes_the_persisted_duty() {
    let mut store = fresh_store();
    let mut svc = LampService::new(LampConfig::default());
    let mut room = SimRoom::new(0);
    let mut sink = Recorder::new();

    svc.dispatch(
        Event::SetTarget { target: -12 },
        0,
        &mut room,
        &mut store,
        &mut sink,
    );
    assert_eq!(svc.duty(), 12);

    // A new service built from the stored record picks up where the
    // previous boot left off.
    let resumed = LampService::new(store.load().expect("record present"));
    assert_eq!(resumed.duty(), 12);
    assert_eq!(resumed.target_lux(), 0);
}

#[test]
fn deleted_record_behaves_like_first_boot() {
    let mut store = fresh_store();
    store.save(&LampConfig::default()).expect("save");

    let key = device_id::config_key(&device_id::read_mac());
    assert!(store.exists(&key));
    store.delete(&key).expect("delete");
    assert!(!store.exists(&key));
    assert_eq!(store.load(), Err(ConfigError::NotFound));
}
