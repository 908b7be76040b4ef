//! Client side of ODoH: seal queries to a resolver config and open the
//! responses.
//!
//! A query moves through its states by ownership: the codec is built from
//! configs, `encrypt_query` hands back the message to send plus the
//! `QuerySecret` to hold while awaiting the response, and
//! `decrypt_response` consumes that secret. Any `Err` is terminal.

extern crate alloc;
use alloc::vec::Vec;

use rand_core::{CryptoRng, OsRng, RngCore};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::config::{parse_configs, select_config, ResolverConfig};
use crate::context::{encapsulate_with_rng, QuerySecret};
use crate::error::OdohError;
use crate::wire::{
    decode_plaintext, encode_plaintext, message_aad, MessageType, ObliviousMessage, Padding,
    LABEL_QUERY, MAX_VEC16_LEN,
};

/// Query encryptor bound to one selected resolver config.
///
/// Holds only public data, so one codec can be shared across threads and
/// used for any number of queries. Per-query state lives in the
/// `QuerySecret` each call returns.
///
/// # Example
///
/// ```
/// use odoh_hpke::{OdohCodec, ResolverKeyPair, Suite};
///
/// let target = ResolverKeyPair::generate(Suite::DEFAULT).unwrap();
/// let codec = OdohCodec::new(&target.configs_bytes().unwrap()).unwrap();
///
/// let (query, secret) = codec.encrypt_query(b"dns query").unwrap();
///
/// let (plain_query, target_secret) = target.decrypt_query(&query).unwrap();
/// let response = odoh_hpke::encrypt_response(target_secret, &plain_query, b"dns answer").unwrap();
///
/// let answer = codec.decrypt_response(secret, b"dns query", &response).unwrap();
/// assert_eq!(answer, b"dns answer");
/// ```
#[derive(Debug, Clone)]
pub struct OdohCodec {
    config: ResolverConfig,
    key_id: Vec<u8>,
    padding: Padding,
}

impl OdohCodec {
    /// Parse `ObliviousDoHConfigs` bytes and select the first supported config.
    pub fn new(config_bytes: &[u8]) -> Result<Self, OdohError> {
        let configs = parse_configs(config_bytes)?;
        let config = select_config(&configs)?.clone();
        Self::from_config(config)
    }

    /// Use an already-parsed config.
    pub fn from_config(config: ResolverConfig) -> Result<Self, OdohError> {
        if !config.suite().is_supported() {
            return Err(OdohError::UnsupportedSuite);
        }
        let key_id = config.key_id()?;
        Ok(Self {
            config,
            key_id,
            padding: Padding::None,
        })
    }

    /// Pad query plaintexts before sealing them.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Seal `query` with a fresh encapsulation.
    pub fn encrypt_query(&self, query: &[u8]) -> Result<(ObliviousMessage, QuerySecret), OdohError> {
        self.encrypt_query_with_rng(query, &mut OsRng)
    }

    /// Seal `query`, drawing the ephemeral key from `rng`.
    pub fn encrypt_query_with_rng<R: CryptoRng + RngCore>(
        &self,
        query: &[u8],
        rng: &mut R,
    ) -> Result<(ObliviousMessage, QuerySecret), OdohError> {
        let padding_len = self.padding.padding_for(query.len());
        let plaintext = Zeroizing::new(encode_plaintext(query, padding_len)?);
        let aad = message_aad(MessageType::Query, &self.key_id)?;

        let (ctx, secret) = encapsulate_with_rng(&self.config, LABEL_QUERY, rng)?;
        let encapsulated_key = ctx.encapsulated_key().to_vec();
        let ciphertext = ctx.seal(&plaintext, &aad)?;

        if encapsulated_key.len() + ciphertext.len() > MAX_VEC16_LEN {
            return Err(OdohError::InvalidInput);
        }
        trace!(
            query_len = query.len(),
            padding_len,
            ciphertext_len = ciphertext.len(),
            "sealed odoh query"
        );

        let message = ObliviousMessage::query(self.key_id.clone(), &encapsulated_key, &ciphertext);
        Ok((message, secret.with_padding(padding_len)))
    }

    /// Open the response to a query this codec sealed.
    pub fn decrypt_response(
        &self,
        secret: QuerySecret,
        original_query: &[u8],
        response: &ObliviousMessage,
    ) -> Result<Vec<u8>, OdohError> {
        decrypt_response(secret, original_query, response)
    }
}

/// One-shot query encryption from raw config bytes.
pub fn encrypt_query(
    config_bytes: &[u8],
    query: &[u8],
) -> Result<(ObliviousMessage, QuerySecret), OdohError> {
    OdohCodec::new(config_bytes)?.encrypt_query(query)
}

/// Open `response` with the secret from the query it answers.
///
/// `original_query` must be the exact DNS message that was sealed; it is
/// bound into the response key, so a response spliced onto another query
/// fails to open. The secret is consumed whatever the outcome.
///
/// A response whose type or nonce length cannot belong to the query fails
/// with `AssociatedDataMismatch`. Every authentication failure is the same
/// `Open` error.
pub fn decrypt_response(
    secret: QuerySecret,
    original_query: &[u8],
    response: &ObliviousMessage,
) -> Result<Vec<u8>, OdohError> {
    if response.message_type != MessageType::Response {
        debug!(message_type = ?response.message_type, "expected an odoh response");
        return Err(OdohError::AssociatedDataMismatch);
    }

    let query_plaintext = Zeroizing::new(encode_plaintext(original_query, secret.padding_len())?);
    let nonce = &response.key_id;
    let ctx = secret.reopen(&query_plaintext, nonce)?;
    let aad = message_aad(MessageType::Response, nonce)?;

    let plaintext = Zeroizing::new(ctx.open(&response.encrypted_message, &aad)?);
    let (dns_message, _) = decode_plaintext(&plaintext)?;
    Ok(dns_message.to_vec())
}
