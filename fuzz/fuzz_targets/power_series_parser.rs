#![no_main]

use libfuzzer_sys::fuzz_target;
use vatio::power_profile::PowerProfile;
use vatio::timeline::ClockAlignment;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(power) = PowerProfile::from_json(input, ClockAlignment::identity()) {
            for sample in power.samples() {
                assert_eq!(power.power_at(sample.timestamp).ok(), Some(sample.watts));
            }
        }
    }
});
