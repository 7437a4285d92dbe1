//! Fuzz target: `FeederConfig::from_json`
//!
//! Arbitrary override documents must either be rejected or produce a
//! configuration that passes its own validation.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::config::FeederConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = FeederConfig::from_json(text) {
        assert!(config.validate().is_ok());
        assert!((1..=10).contains(&config.default_level));
    }
});
