//! Fuzz target for pwclean.json parsing and validation.
//!
//! Parsing must never panic, and every config that validates must build a
//! cleaner.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pwc_config::validate::validate_config;
use pwc_config::{CleanConfig, ResolvedConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<CleanConfig>(data) else {
        return;
    };
    if validate_config(&config).is_err() {
        return;
    }
    let resolved = ResolvedConfig {
        config,
        ..ResolvedConfig::builtin()
    };
    let cleaner = resolved.build_cleaner().unwrap();
    assert_eq!(cleaner.len(), resolved.config.secrets.len());
});
