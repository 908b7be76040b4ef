#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use odoh_hpke::{ObliviousMessage, ResolverKeyPair, Suite};

static TARGET: Lazy<ResolverKeyPair> =
    Lazy::new(|| ResolverKeyPair::from_seed(Suite::DEFAULT, &[0x5a; 32]).unwrap());

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = ObliviousMessage::from_bytes(data) {
        let _ = TARGET.decrypt_query(&msg);
    }
});
