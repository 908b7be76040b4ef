//! HKDF over the suite's hash.
//!
//! key_id        = Expand(Extract("", config_contents), "odoh key id", Nh)
//! response prk  = Extract(Q_plain || len(nonce) || nonce, secret)

use hkdf::{Hkdf, InvalidLength};
use sha2::{Sha256, Sha384, Sha512};

use crate::suite::KdfId;

/// A pseudorandom key bound to one KDF.
pub(crate) enum Prk {
    Sha256(Hkdf<Sha256>),
    Sha384(Hkdf<Sha384>),
    Sha512(Hkdf<Sha512>),
}

impl Prk {
    /// `Extract(salt, ikm)`. An empty salt is equivalent to Nh zero bytes.
    pub(crate) fn extract(kdf: KdfId, salt: &[u8], ikm: &[u8]) -> Self {
        match kdf {
            KdfId::HkdfSha256 => Prk::Sha256(Hkdf::new(Some(salt), ikm)),
            KdfId::HkdfSha384 => Prk::Sha384(Hkdf::new(Some(salt), ikm)),
            KdfId::HkdfSha512 => Prk::Sha512(Hkdf::new(Some(salt), ikm)),
        }
    }

    /// `Expand(prk, info, out.len())`.
    pub(crate) fn expand(&self, info: &[u8], out: &mut [u8]) -> Result<(), InvalidLength> {
        match self {
            Prk::Sha256(hk) => hk.expand(info, out),
            Prk::Sha384(hk) => hk.expand(info, out),
            Prk::Sha512(hk) => hk.expand(info, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 5869 test case 1.
    #[test]
    fn rfc5869_sha256_case_1() {
        let ikm = [0x0bu8; 22];
        let salt: [u8; 13] = core::array::from_fn(|i| i as u8);
        let info: [u8; 10] = core::array::from_fn(|i| 0xf0 + i as u8);

        let prk = Prk::extract(KdfId::HkdfSha256, &salt, &ikm);
        let mut okm = [0u8; 42];
        prk.expand(&info, &mut okm).unwrap();

        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn empty_salt_matches_zero_salt() {
        let ikm = b"input keying material";
        let mut a = [0u8; 48];
        let mut b = [0u8; 48];
        Prk::extract(KdfId::HkdfSha384, &[], ikm).expand(b"x", &mut a).unwrap();
        Prk::extract(KdfId::HkdfSha384, &[0u8; 48], ikm).expand(b"x", &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_oversized_output() {
        let prk = Prk::extract(KdfId::HkdfSha256, &[], b"ikm");
        let mut out = [0u8; 255 * 32 + 1];
        assert!(prk.expand(b"", &mut out).is_err());
    }
}
