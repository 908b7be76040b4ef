//! Target (resolver) side: key pair, published configs, query opening and
//! response sealing.

extern crate alloc;
use alloc::vec::Vec;
use core::fmt;

use rand_core::{CryptoRng, OsRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::trace;
use zeroize::Zeroizing;

use crate::config::{compose_configs, ResolverConfig};
use crate::context::{decapsulate, derive_keypair, generate_keypair, QuerySecret};
use crate::error::OdohError;
use crate::suite::Suite;
use crate::wire::{
    decode_plaintext, encode_plaintext, message_aad, MessageType, ObliviousMessage, Padding,
    LABEL_QUERY,
};

/// A resolver's HPKE key pair together with the config it publishes.
///
/// The private key is wiped on drop.
pub struct ResolverKeyPair {
    config: ResolverConfig,
    key_id: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl ResolverKeyPair {
    /// Fresh key pair from the OS RNG.
    pub fn generate(suite: Suite) -> Result<Self, OdohError> {
        Self::generate_with_rng(suite, &mut OsRng)
    }

    pub fn generate_with_rng<R: CryptoRng + RngCore>(
        suite: Suite,
        rng: &mut R,
    ) -> Result<Self, OdohError> {
        let (private_key, public_key) = generate_keypair(suite, rng)?;
        Self::from_parts(suite, private_key, public_key)
    }

    /// Deterministic key pair from input keying material, so a resolver can
    /// keep a stable config across restarts.
    pub fn from_seed(suite: Suite, ikm: &[u8]) -> Result<Self, OdohError> {
        let (private_key, public_key) = derive_keypair(suite, ikm)?;
        Self::from_parts(suite, private_key, public_key)
    }

    fn from_parts(
        suite: Suite,
        private_key: Zeroizing<Vec<u8>>,
        public_key: Vec<u8>,
    ) -> Result<Self, OdohError> {
        let config = ResolverConfig::new(suite, public_key)?;
        let key_id = config.key_id()?;
        Ok(Self {
            config,
            key_id,
            private_key,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    /// `ObliviousDoHConfigs` carrying just this key pair's config.
    pub fn configs_bytes(&self) -> Result<Vec<u8>, OdohError> {
        compose_configs(core::slice::from_ref(&self.config))
    }

    /// Open a query sealed to this key pair.
    ///
    /// Returns the DNS query and the secret the response must be sealed
    /// with. A query for another key id, a bad encapsulated key and a bad
    /// ciphertext all fail with the same `Open` error.
    pub fn decrypt_query(
        &self,
        message: &ObliviousMessage,
    ) -> Result<(Vec<u8>, QuerySecret), OdohError> {
        if message.message_type != MessageType::Query {
            return Err(OdohError::MalformedMessage);
        }
        if !bool::from(message.key_id.as_slice().ct_eq(self.key_id.as_slice())) {
            return Err(OdohError::Open);
        }

        let suite = self.config.suite();
        let (encapsulated_key, ciphertext) =
            message.split_query(suite.kem).ok_or(OdohError::Open)?;
        let aad = message_aad(MessageType::Query, &message.key_id)?;

        let (plaintext, secret) = decapsulate(
            suite,
            &self.private_key,
            encapsulated_key,
            LABEL_QUERY,
            ciphertext,
            &aad,
        )?;
        let plaintext = Zeroizing::new(plaintext);
        let (dns_message, padding_len) = decode_plaintext(&plaintext)?;
        trace!(query_len = dns_message.len(), padding_len, "opened odoh query");

        Ok((dns_message.to_vec(), secret.with_padding(padding_len)))
    }
}

impl fmt::Debug for ResolverKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverKeyPair")
            .field("config", &self.config)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Seal `response` as the answer to `query`, consuming the query's secret.
pub fn encrypt_response(
    secret: QuerySecret,
    query: &[u8],
    response: &[u8],
) -> Result<ObliviousMessage, OdohError> {
    encrypt_response_with_rng(secret, query, response, Padding::None, &mut OsRng)
}

/// [`encrypt_response`] with explicit response padding and nonce source.
pub fn encrypt_response_with_rng<R: CryptoRng + RngCore>(
    secret: QuerySecret,
    query: &[u8],
    response: &[u8],
    padding: Padding,
    rng: &mut R,
) -> Result<ObliviousMessage, OdohError> {
    let query_plaintext = Zeroizing::new(encode_plaintext(query, secret.padding_len())?);
    let response_plaintext = Zeroizing::new(encode_plaintext(
        response,
        padding.padding_for(response.len()),
    )?);

    let mut nonce = alloc::vec![0u8; secret.suite().response_nonce_len()];
    rng.fill_bytes(&mut nonce);

    let ctx = secret.reopen(&query_plaintext, &nonce)?;
    let aad = message_aad(MessageType::Response, &nonce)?;
    let ciphertext = ctx.seal(&response_plaintext, &aad)?;
    Ok(ObliviousMessage::response(nonce, ciphertext))
}
