//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable ID in the form `GATE-XXYYZZ`
//! (last 3 bytes of the 6-byte MAC in uppercase hex). It is the default
//! QR payload until one is provisioned in NVS, and the BLE advertising
//! name is derived the same way (`relaygate-xxyyzz`).

use core::fmt::Write;

use crate::config::DeviceIdentity;

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
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `GATE-XXYYZZ` (e.g. `GATE-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdentity {
    let mut id = DeviceIdentity::new();
    let _ = write!(id, "GATE-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// BLE advertising name. Format: `relaygate-xxyyzz`.
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "relaygate-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
