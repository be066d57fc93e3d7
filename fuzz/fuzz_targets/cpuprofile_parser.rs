#![no_main]

use libfuzzer_sys::fuzz_target;
use vatio::cpu_profile::{CpuProfile, ProfileOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed node tables and sample lists must surface as errors
        if let Ok(profile) = CpuProfile::from_json(input, ProfileOptions::default()) {
            assert_eq!(profile.post_order().len(), profile.node_count());
            assert_eq!(profile.intervals().len(), profile.samples().len() - 1);
        }
    }
});
