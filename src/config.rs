//! ObliviousDoHConfigs parsing and selection.
//!
//! ObliviousDoHConfigs:
//!   list_len[2] || ObliviousDoHConfig*
//! ObliviousDoHConfig:
//!   version[2] || contents_len[2] || contents
//! ObliviousDoHConfigContents (version 0x0001):
//!   kem_id[2] || kdf_id[2] || aead_id[2] || public_key_len[2] || public_key

extern crate alloc;
use alloc::vec::Vec;
use core::fmt;

use tracing::debug;

use crate::error::OdohError;
use crate::kdf::Prk;
use crate::suite::{AeadId, KdfId, KemId, Suite};
use crate::wire::{put_vec16, Reader, LABEL_KEY_ID, ODOH_VERSION};

/// One resolver config: a suite and the public key to encapsulate against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    version: u16,
    suite: Suite,
    public_key: Vec<u8>,
}

impl ResolverConfig {
    /// Build a version 0x0001 config, checking the key length against the KEM.
    pub fn new(suite: Suite, public_key: Vec<u8>) -> Result<Self, OdohError> {
        if public_key.len() != suite.kem.public_key_len() {
            return Err(OdohError::MalformedConfig);
        }
        Ok(Self {
            version: ODOH_VERSION,
            suite,
            public_key,
        })
    }

    /// Parse an `ObliviousDoHConfigContents` body.
    pub fn from_contents(contents: &[u8]) -> Result<Self, OdohError> {
        let mut r = Reader::new(contents);
        let kem = KemId::try_from(r.read_u16().ok_or(OdohError::MalformedConfig)?)?;
        let kdf = KdfId::try_from(r.read_u16().ok_or(OdohError::MalformedConfig)?)?;
        let aead = AeadId::try_from(r.read_u16().ok_or(OdohError::MalformedConfig)?)?;
        let public_key = r.read_vec16().ok_or(OdohError::MalformedConfig)?;
        if !r.is_empty() {
            return Err(OdohError::MalformedConfig);
        }
        Self::new(Suite::new(kem, kdf, aead), public_key.to_vec())
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    pub fn kem_id(&self) -> KemId {
        self.suite.kem
    }

    pub fn kdf_id(&self) -> KdfId {
        self.suite.kdf
    }

    pub fn aead_id(&self) -> AeadId {
        self.suite.aead
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Serialize the `ObliviousDoHConfigContents` body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.public_key.len());
        out.extend_from_slice(&self.suite.kem.to_u16().to_be_bytes());
        out.extend_from_slice(&self.suite.kdf.to_u16().to_be_bytes());
        out.extend_from_slice(&self.suite.aead.to_u16().to_be_bytes());
        // Npk is at most 133, so the length prefix always fits.
        out.extend_from_slice(&(self.public_key.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.public_key);
        out
    }

    /// `Expand(Extract("", contents), "odoh key id", Nh)`.
    pub fn key_id(&self) -> Result<Vec<u8>, OdohError> {
        let prk = Prk::extract(self.suite.kdf, &[], &self.to_bytes());
        let mut id = alloc::vec![0u8; self.suite.kdf.hash_len()];
        prk.expand(LABEL_KEY_ID, &mut id)
            .map_err(|_| OdohError::MalformedConfig)?;
        Ok(id)
    }
}

impl fmt::Display for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ODoH config v{} | {} | {}-byte public key",
            self.version,
            self.suite,
            self.public_key.len()
        )
    }
}

/// Parse `ObliviousDoHConfigs`, keeping input order.
///
/// Entries with an unknown version are skipped. Entries with a known
/// version but unusable contents are skipped too, as is a truncated final
/// entry. Only a broken outer list is `MalformedConfig`; a list with no
/// usable entry is `NoUsableConfig`.
pub fn parse_configs(raw: &[u8]) -> Result<Vec<ResolverConfig>, OdohError> {
    let mut outer = Reader::new(raw);
    let list = outer.read_vec16().ok_or(OdohError::MalformedConfig)?;
    if !outer.is_empty() {
        return Err(OdohError::MalformedConfig);
    }

    let mut entries = Reader::new(list);
    let mut configs = Vec::new();
    while !entries.is_empty() {
        let (version, contents) = match (entries.read_u16(), entries.read_vec16()) {
            (Some(version), Some(contents)) => (version, contents),
            _ => {
                debug!("truncated trailing odoh config entry");
                break;
            }
        };
        if version != ODOH_VERSION {
            debug!(version, "skipping odoh config with unknown version");
            continue;
        }
        match ResolverConfig::from_contents(contents) {
            Ok(config) => configs.push(config),
            Err(_) => debug!(len = contents.len(), "skipping malformed odoh config contents"),
        }
    }

    if configs.is_empty() {
        return Err(OdohError::NoUsableConfig);
    }
    debug!(count = configs.len(), "parsed odoh configs");
    Ok(configs)
}

/// First config whose suite this crate implements.
pub fn select_config(configs: &[ResolverConfig]) -> Result<&ResolverConfig, OdohError> {
    let selected = configs
        .iter()
        .find(|c| c.suite.is_supported())
        .ok_or(OdohError::UnsupportedSuite)?;
    debug!(suite = %selected.suite, "selected odoh config");
    Ok(selected)
}

/// Serialize configs as `ObliviousDoHConfigs`, the body resolvers publish.
pub fn compose_configs(configs: &[ResolverConfig]) -> Result<Vec<u8>, OdohError> {
    let mut list = Vec::new();
    for config in configs {
        list.extend_from_slice(&config.version.to_be_bytes());
        put_vec16(&mut list, &config.to_bytes())?;
    }
    let mut out = Vec::with_capacity(2 + list.len());
    put_vec16(&mut out, &list)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn entry(version: u16, contents: &[u8]) -> Vec<u8> {
        let mut out = version.to_be_bytes().to_vec();
        out.extend_from_slice(&(contents.len() as u16).to_be_bytes());
        out.extend_from_slice(contents);
        out
    }

    fn wrap(entries: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = entries.concat();
        let mut out = (body.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(&body);
        out
    }

    fn x25519_config(fill: u8) -> ResolverConfig {
        ResolverConfig::new(Suite::DEFAULT, vec![fill; 32]).unwrap()
    }

    #[test]
    fn contents_layout() {
        let bytes = x25519_config(7).to_bytes();
        assert_eq!(&bytes[..8], &[0x00, 0x20, 0x00, 0x01, 0x00, 0x01, 0x00, 0x20]);
        assert_eq!(bytes.len(), 8 + 32);
        assert_eq!(ResolverConfig::from_contents(&bytes).unwrap(), x25519_config(7));
    }

    #[test]
    fn compose_then_parse_preserves_order() {
        let configs = vec![x25519_config(1), x25519_config(2)];
        let raw = compose_configs(&configs).unwrap();
        assert_eq!(parse_configs(&raw).unwrap(), configs);
    }

    #[test]
    fn skips_unknown_version() {
        let good = x25519_config(3);
        let raw = wrap(&[entry(0xff06, &[1, 2, 3]), entry(ODOH_VERSION, &good.to_bytes())]);
        assert_eq!(parse_configs(&raw).unwrap(), vec![good]);
    }

    #[test]
    fn skips_corrupt_contents() {
        let good = x25519_config(4);
        let mut short_key = good.to_bytes();
        short_key.truncate(20);
        let raw = wrap(&[entry(ODOH_VERSION, &short_key), entry(ODOH_VERSION, &good.to_bytes())]);
        assert_eq!(parse_configs(&raw).unwrap(), vec![good]);
    }

    #[test]
    fn key_length_must_match_kem() {
        let mut contents = vec![0x00, 0x10, 0x00, 0x01, 0x00, 0x01, 0x00, 0x20];
        contents.extend_from_slice(&[9u8; 32]);
        // P-256 with a 32-byte key
        assert_eq!(ResolverConfig::from_contents(&contents), Err(OdohError::MalformedConfig));
    }

    #[test]
    fn only_unknown_versions_is_unusable() {
        let raw = wrap(&[entry(0x0002, &x25519_config(5).to_bytes())]);
        assert_eq!(parse_configs(&raw), Err(OdohError::NoUsableConfig));
        assert_eq!(parse_configs(&[0, 0]), Err(OdohError::NoUsableConfig));
    }

    #[test]
    fn broken_outer_list_is_malformed() {
        assert_eq!(parse_configs(&[]), Err(OdohError::MalformedConfig));
        assert_eq!(parse_configs(&[0]), Err(OdohError::MalformedConfig));
        assert_eq!(parse_configs(&[0, 10, 0, 1]), Err(OdohError::MalformedConfig));
        let mut trailing = compose_configs(&[x25519_config(6)]).unwrap();
        trailing.push(0);
        assert_eq!(parse_configs(&trailing), Err(OdohError::MalformedConfig));
    }

    #[test]
    fn truncated_last_entry_keeps_earlier_ones() {
        let good = x25519_config(8);
        let mut body = entry(ODOH_VERSION, &good.to_bytes());
        body.extend_from_slice(&[0x00, 0x01, 0x00, 0x50, 0x00]);
        let raw = wrap(&[body]);
        assert_eq!(parse_configs(&raw).unwrap(), vec![good]);
    }

    #[test]
    fn selection_skips_unsupported_suites() {
        let x448 = ResolverConfig::new(
            Suite::new(KemId::X448HkdfSha512, KdfId::HkdfSha512, AeadId::Aes256Gcm),
            vec![1; 56],
        )
        .unwrap();
        let supported = x25519_config(9);
        let configs = vec![x448.clone(), supported.clone()];
        assert_eq!(select_config(&configs).unwrap(), &supported);
        assert_eq!(select_config(&[x448]), Err(OdohError::UnsupportedSuite));
    }

    #[test]
    fn key_id_depends_on_contents() {
        let a = x25519_config(1);
        let b = x25519_config(2);
        assert_eq!(a.key_id().unwrap().len(), 32);
        assert_eq!(a.key_id().unwrap(), a.clone().key_id().unwrap());
        assert_ne!(a.key_id().unwrap(), b.key_id().unwrap());

        let sha512 = ResolverConfig::new(
            Suite::new(KemId::X25519HkdfSha256, KdfId::HkdfSha512, AeadId::Aes128Gcm),
            vec![1; 32],
        )
        .unwrap();
        assert_eq!(sha512.key_id().unwrap().len(), 64);
    }

    #[test]
    fn key_id_known_answer() {
        let public_key =
            hex::decode("5fd47633b5e43fca7bad1bfbe424feacb175d9d4d4a30f166dbd30636f0b446b").unwrap();
        let config = ResolverConfig::new(Suite::DEFAULT, public_key).unwrap();
        assert_eq!(
            hex::encode(config.key_id().unwrap()),
            "36c6dc7b5ec18b4134691d41d366e7c911ea512c05ac46a35d89af1e980c1847"
        );
    }

    #[test]
    fn display_describes_suite() {
        let text = alloc::format!("{}", x25519_config(0));
        assert_eq!(
            text,
            "ODoH config v1 | DHKEM(X25519, HKDF-SHA256) + HKDF-SHA256 + AES-128-GCM | 32-byte public key"
        );
    }
}
