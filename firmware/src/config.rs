//! System configuration parameters
//!
//! All tunable parameters for the PetFeeder.  Nothing here is persisted:
//! defaults are compiled in and may be overridden at build time with a JSON
//! document (see [`FeederConfig::from_json`]).

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::sensors::ultrasonic::NO_ECHO_CM;

/// Upper bound for `steps_per_unit`; keeps a reversed level-10 dispense
/// well inside `u32` step counts.
pub const MAX_STEPS_PER_UNIT: u32 = 10_000;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    // --- Stepper / dispensing ---
    /// Stepper steps per dispense unit (~10 g of dry food).
    pub steps_per_unit: u32,
    /// Delay after each coil phase (milliseconds).
    pub step_delay_ms: u32,
    /// Rotate back by the same step count after dispensing to close the gate.
    pub reverse_close: bool,
    /// Publish a `Moving...` heartbeat at most once per this many steps.
    pub heartbeat_every_steps: u32,
    /// Portion level in effect at boot (1-10).
    pub default_level: u8,

    // --- Proximity ---
    /// Distance (cm) under which the pet counts as present.
    pub proximity_threshold_cm: u32,
    /// Give up waiting for an echo after this long (microseconds).
    pub echo_timeout_us: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Delay between broker reconnect attempts (milliseconds)
    pub reconnect_delay_ms: u32,

    // --- Network ---
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    pub ntp_server: heapless::String<64>,
    /// Local time offset from UTC (seconds).
    pub utc_offset_secs: i32,
    /// Name of the provisioning access point.
    pub provisioning_ap: heapless::String<32>,
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // Stepper
            steps_per_unit: 515,
            step_delay_ms: 1,
            reverse_close: false,
            heartbeat_every_steps: 64,
            default_level: 1,

            // Proximity
            proximity_threshold_cm: 10,
            echo_timeout_us: 25_000,

            // Timing
            tick_interval_ms: 200,
            reconnect_delay_ms: 5_000,

            // Network
            broker_host: fixed("52.74.155.78"),
            broker_port: 1883,
            ntp_server: fixed("pool.ntp.org"),
            utc_offset_secs: 7 * 3600,
            provisioning_ap: fixed("SAF_AP"),
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
        }
    }
}

impl FeederConfig {
    /// Parse a JSON override document.  Fields that are absent keep their
    /// defaults.  The result is validated before it is returned.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON document"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the feeder misbehave.
    pub fn validate(&self) -> Result<(), Error> {
        if self.steps_per_unit == 0 || self.steps_per_unit > MAX_STEPS_PER_UNIT {
            return Err(Error::Config("steps_per_unit must be within 1..=10000"));
        }
        if self.heartbeat_every_steps == 0 {
            return Err(Error::Config("heartbeat_every_steps must be non-zero"));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be non-zero"));
        }
        if !(1..=10).contains(&self.default_level) {
            return Err(Error::Config("default_level must be within 1..=10"));
        }
        if self.proximity_threshold_cm == 0 || self.proximity_threshold_cm >= NO_ECHO_CM {
            return Err(Error::Config("proximity_threshold_cm must be within 1..999"));
        }
        if chrono::FixedOffset::east_opt(self.utc_offset_secs).is_none() {
            return Err(Error::Config("utc_offset_secs must be under one day"));
        }
        if self.broker_host.is_empty() {
            return Err(Error::Config("broker_host must not be empty"));
        }
        Ok(())
    }
}

/// Build a fixed-capacity string from a literal that is known to fit.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
