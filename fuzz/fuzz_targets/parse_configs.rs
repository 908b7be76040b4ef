#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(configs) = odoh_hpke::parse_configs(data) {
        // Whatever parses must re-serialize and parse back to the same set.
        let raw = odoh_hpke::compose_configs(&configs).unwrap();
        assert_eq!(odoh_hpke::parse_configs(&raw).unwrap(), configs);
    }
});
