//! HPKE algorithm identifiers (RFC 9180 section 7) and their sizes.
//!
//! Registered ids parse even when this crate cannot run them; only
//! [`Suite::is_supported`] decides whether a config can be used.

use core::fmt;

use crate::error::OdohError;

/// KEM identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KemId {
    P256HkdfSha256,
    P384HkdfSha384,
    P521HkdfSha512,
    X25519HkdfSha256,
    X448HkdfSha512,
}

impl KemId {
    pub const fn to_u16(self) -> u16 {
        match self {
            KemId::P256HkdfSha256 => 0x0010,
            KemId::P384HkdfSha384 => 0x0011,
            KemId::P521HkdfSha512 => 0x0012,
            KemId::X25519HkdfSha256 => 0x0020,
            KemId::X448HkdfSha512 => 0x0021,
        }
    }

    /// Serialized public key length (Npk).
    pub const fn public_key_len(self) -> usize {
        match self {
            KemId::P256HkdfSha256 => 65,
            KemId::P384HkdfSha384 => 97,
            KemId::P521HkdfSha512 => 133,
            KemId::X25519HkdfSha256 => 32,
            KemId::X448HkdfSha512 => 56,
        }
    }

    /// Encapsulated key length (Nenc). Equal to Npk for every DHKEM.
    pub const fn encapsulated_key_len(self) -> usize {
        self.public_key_len()
    }

    pub const fn name(self) -> &'static str {
        match self {
            KemId::P256HkdfSha256 => "DHKEM(P-256, HKDF-SHA256)",
            KemId::P384HkdfSha384 => "DHKEM(P-384, HKDF-SHA384)",
            KemId::P521HkdfSha512 => "DHKEM(P-521, HKDF-SHA512)",
            KemId::X25519HkdfSha256 => "DHKEM(X25519, HKDF-SHA256)",
            KemId::X448HkdfSha512 => "DHKEM(X448, HKDF-SHA512)",
        }
    }
}

impl TryFrom<u16> for KemId {
    type Error = OdohError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0010 => Ok(KemId::P256HkdfSha256),
            0x0011 => Ok(KemId::P384HkdfSha384),
            0x0012 => Ok(KemId::P521HkdfSha512),
            0x0020 => Ok(KemId::X25519HkdfSha256),
            0x0021 => Ok(KemId::X448HkdfSha512),
            _ => Err(OdohError::MalformedConfig),
        }
    }
}

/// KDF identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KdfId {
    HkdfSha256,
    HkdfSha384,
    HkdfSha512,
}

impl KdfId {
    pub const fn to_u16(self) -> u16 {
        match self {
            KdfId::HkdfSha256 => 0x0001,
            KdfId::HkdfSha384 => 0x0002,
            KdfId::HkdfSha512 => 0x0003,
        }
    }

    /// Hash output length (Nh).
    pub const fn hash_len(self) -> usize {
        match self {
            KdfId::HkdfSha256 => 32,
            KdfId::HkdfSha384 => 48,
            KdfId::HkdfSha512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            KdfId::HkdfSha256 => "HKDF-SHA256",
            KdfId::HkdfSha384 => "HKDF-SHA384",
            KdfId::HkdfSha512 => "HKDF-SHA512",
        }
    }
}

impl TryFrom<u16> for KdfId {
    type Error = OdohError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(KdfId::HkdfSha256),
            0x0002 => Ok(KdfId::HkdfSha384),
            0x0003 => Ok(KdfId::HkdfSha512),
            _ => Err(OdohError::MalformedConfig),
        }
    }
}

/// AEAD identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadId {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    /// Export-only mode. Registered, but useless for ODoH since nothing
    /// can be sealed with it.
    ExportOnly,
}

impl AeadId {
    pub const fn to_u16(self) -> u16 {
        match self {
            AeadId::Aes128Gcm => 0x0001,
            AeadId::Aes256Gcm => 0x0002,
            AeadId::ChaCha20Poly1305 => 0x0003,
            AeadId::ExportOnly => 0xFFFF,
        }
    }

    /// Key length (Nk).
    pub const fn key_len(self) -> usize {
        match self {
            AeadId::Aes128Gcm => 16,
            AeadId::Aes256Gcm | AeadId::ChaCha20Poly1305 => 32,
            AeadId::ExportOnly => 0,
        }
    }

    /// Nonce length (Nn).
    pub const fn nonce_len(self) -> usize {
        match self {
            AeadId::ExportOnly => 0,
            _ => 12,
        }
    }

    /// Tag length (Nt).
    pub const fn tag_len(self) -> usize {
        match self {
            AeadId::ExportOnly => 0,
            _ => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AeadId::Aes128Gcm => "AES-128-GCM",
            AeadId::Aes256Gcm => "AES-256-GCM",
            AeadId::ChaCha20Poly1305 => "ChaCha20Poly1305",
            AeadId::ExportOnly => "Export-only",
        }
    }
}

impl TryFrom<u16> for AeadId {
    type Error = OdohError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(AeadId::Aes128Gcm),
            0x0002 => Ok(AeadId::Aes256Gcm),
            0x0003 => Ok(AeadId::ChaCha20Poly1305),
            0xFFFF => Ok(AeadId::ExportOnly),
            _ => Err(OdohError::MalformedConfig),
        }
    }
}

/// An HPKE cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Suite {
    pub kem: KemId,
    pub kdf: KdfId,
    pub aead: AeadId,
}

/// KEMs this crate can encapsulate against.
pub const SUPPORTED_KEMS: &[KemId] = &[KemId::X25519HkdfSha256, KemId::P256HkdfSha256];

/// KDFs this crate can run.
pub const SUPPORTED_KDFS: &[KdfId] = &[KdfId::HkdfSha256, KdfId::HkdfSha384, KdfId::HkdfSha512];

/// AEADs this crate can seal and open with.
pub const SUPPORTED_AEADS: &[AeadId] = &[
    AeadId::Aes128Gcm,
    AeadId::Aes256Gcm,
    AeadId::ChaCha20Poly1305,
];

impl Suite {
    /// X25519 + HKDF-SHA256 + AES-128-GCM, the suite deployed resolvers publish.
    pub const DEFAULT: Suite = Suite {
        kem: KemId::X25519HkdfSha256,
        kdf: KdfId::HkdfSha256,
        aead: AeadId::Aes128Gcm,
    };

    pub const fn new(kem: KemId, kdf: KdfId, aead: AeadId) -> Self {
        Self { kem, kdf, aead }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_KEMS.contains(&self.kem)
            && SUPPORTED_KDFS.contains(&self.kdf)
            && SUPPORTED_AEADS.contains(&self.aead)
    }

    /// Length of the secret exported for the response (Nk).
    pub const fn secret_len(&self) -> usize {
        self.aead.key_len()
    }

    /// Length of the response nonce: max(Nk, Nn).
    pub const fn response_nonce_len(&self) -> usize {
        let nk = self.aead.key_len();
        let nn = self.aead.nonce_len();
        if nk > nn {
            nk
        } else {
            nn
        }
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {} + {}", self.kem.name(), self.kdf.name(), self.aead.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_u16() {
        for kem in [
            KemId::P256HkdfSha256,
            KemId::P384HkdfSha384,
            KemId::P521HkdfSha512,
            KemId::X25519HkdfSha256,
            KemId::X448HkdfSha512,
        ] {
            assert_eq!(KemId::try_from(kem.to_u16()), Ok(kem));
        }
        for kdf in SUPPORTED_KDFS {
            assert_eq!(KdfId::try_from(kdf.to_u16()), Ok(*kdf));
        }
        assert_eq!(AeadId::try_from(0xFFFF), Ok(AeadId::ExportOnly));
        assert_eq!(KemId::try_from(0x0030), Err(OdohError::MalformedConfig));
        assert_eq!(KdfId::try_from(0x0000), Err(OdohError::MalformedConfig));
        assert_eq!(AeadId::try_from(0x0004), Err(OdohError::MalformedConfig));
    }

    #[test]
    fn default_suite_sizes() {
        let suite = Suite::DEFAULT;
        assert!(suite.is_supported());
        assert_eq!(suite.kem.public_key_len(), 32);
        assert_eq!(suite.secret_len(), 16);
        assert_eq!(suite.response_nonce_len(), 16);
    }

    #[test]
    fn chacha_nonce_len_is_key_len() {
        let suite = Suite::new(KemId::X25519HkdfSha256, KdfId::HkdfSha256, AeadId::ChaCha20Poly1305);
        assert_eq!(suite.response_nonce_len(), 32);
    }

    #[test]
    fn registered_but_unimplemented_is_unsupported() {
        let x448 = Suite::new(KemId::X448HkdfSha512, KdfId::HkdfSha512, AeadId::Aes256Gcm);
        assert!(!x448.is_supported());
        let export_only = Suite::new(KemId::X25519HkdfSha256, KdfId::HkdfSha256, AeadId::ExportOnly);
        assert!(!export_only.is_supported());
    }
}
