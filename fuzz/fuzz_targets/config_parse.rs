//! Fuzz test for configuration parsing
//!
//! Arbitrary TOML input must be rejected cleanly, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use natprobe::DetectorConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = DetectorConfig::from_toml_str(s);
    }
});
