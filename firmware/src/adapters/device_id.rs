//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID of the form `AukeyPet-xx:xx:xx:xx:xx:xx`
//! (the full 6-byte MAC, lowercase hex).  It doubles as the broker client
//! identifier and is logged on every successful broker connect.

use core::fmt::Write;

/// "AukeyPet-" (9) + 17 chars of MAC.
pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

pub const DEVICE_ID_PREFIX: &str = "AukeyPet-";

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly six bytes into `mac`.
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

pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = id.push_str(DEVICE_ID_PREFIX);
    for (i, byte) in mac.iter().enumerate() {
        if i > 0 {
            let _ = id.push(':');
        }
        let _ = write!(id, "{:02x}", byte);
    }
    id
}
