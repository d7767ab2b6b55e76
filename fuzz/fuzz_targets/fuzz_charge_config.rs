//! Fuzz target: `ChargeConfig::from_json`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted document yields a config that passes `validate()`
//!
//! cargo fuzz run fuzz_charge_config

#![no_main]

use charge_manager::config::ChargeConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ChargeConfig::from_json(text) {
        assert!(config.validate().is_ok());
        assert!(config.max_connect_attempts >= 1);
        assert!(!config.tick_interval().is_zero());
    }
});
