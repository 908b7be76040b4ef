#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use odoh_hpke::{decrypt_response, ObliviousMessage, OdohCodec, ResolverKeyPair, Suite};

static TARGET: Lazy<ResolverKeyPair> =
    Lazy::new(|| ResolverKeyPair::from_seed(Suite::DEFAULT, &[0x5a; 32]).unwrap());

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split = 1 + (data[0] as usize) % data.len();
    let (query, response) = data[1..].split_at(split - 1);

    let codec = OdohCodec::from_config(TARGET.config().clone()).unwrap();
    let Ok((_, secret)) = codec.encrypt_query(query) else {
        return;
    };

    if let Ok(msg) = ObliviousMessage::from_bytes(response) {
        // Forged responses must never authenticate.
        assert!(decrypt_response(secret, query, &msg).is_err());
    }
});
