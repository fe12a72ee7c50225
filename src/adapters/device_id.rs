//! Device identity derived from the ESP32 factory MAC address.
//!
//! The config record is keyed per device (`CG_` + 12 hex digits, 15
//! chars — the NVS key limit) so two nodes flashed from one image and
//! later moved between fixtures never read each other's calibration.

/// NVS config key: "CG_XXXXXXXXXXXX" (15 chars + null).
pub type ConfigKey = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xC0, 0x4E, 0x30, 0x12, 0x34, 0x56]
}

/// Derive the device-scoped config key from the full MAC.
pub fn config_key(mac: &MacAddress) -> ConfigKey {
    let mut key = ConfigKey::new();
    use core::fmt::Write;
    let _ = write!(
        key,
        "CG_{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    key
}
