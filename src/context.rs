//! HPKE contexts for one query.
//!
//! Query direction (HPKE base mode, RFC 9180):
//!   (enc, ctx) = SetupBaseS(pkR, "odoh query")
//!   secret     = ctx.Export("odoh response", Nk)
//!
//! Response direction (RFC 9230 section 6.4), no new KEM operation:
//!   salt  = Q_plain || len(resp_nonce)[2] || resp_nonce
//!   prk   = Extract(salt, secret)
//!   key   = Expand(prk, "odoh key", Nk)
//!   nonce = Expand(prk, "odoh nonce", Nn)
//!
//! Every context and secret here is consumed by value and zeroized on drop.

extern crate alloc;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hpke::{
    aead::{Aead as AeadTrait, AeadCtxS, AesGcm128, AesGcm256, ChaCha20Poly1305},
    kdf::{HkdfSha256, HkdfSha384, HkdfSha512, Kdf as KdfTrait},
    kem::{DhP256HkdfSha256, Kem as KemTrait, X25519HkdfSha256},
    Deserializable, HpkeError, OpModeR, OpModeS, Serializable,
};
use rand_core::{CryptoRng, OsRng, RngCore};
use tracing::trace;
use zeroize::{Zeroize, Zeroizing};

use crate::aead;
use crate::config::ResolverConfig;
use crate::error::OdohError;
use crate::kdf::Prk;
use crate::suite::{AeadId, KdfId, KemId, Suite};
use crate::wire::{LABEL_KEY, LABEL_NONCE, LABEL_RESPONSE};

// ---------------------------------------------------------------------------
// Suite dispatch
// ---------------------------------------------------------------------------

/// An operation generic over the three HPKE algorithm types.
trait SuiteOp {
    type Output;

    fn run<A, K, M>(self) -> Self::Output
    where
        A: AeadTrait + 'static,
        K: KdfTrait + 'static,
        M: KemTrait + 'static;
}

/// Monomorphize `op` for `suite`. `None` if the suite is not implemented.
fn dispatch<O: SuiteOp>(suite: Suite, op: O) -> Option<O::Output> {
    match suite.kem {
        KemId::X25519HkdfSha256 => dispatch_kdf::<X25519HkdfSha256, O>(suite, op),
        KemId::P256HkdfSha256 => dispatch_kdf::<DhP256HkdfSha256, O>(suite, op),
        KemId::P384HkdfSha384 | KemId::P521HkdfSha512 | KemId::X448HkdfSha512 => None,
    }
}

fn dispatch_kdf<M: KemTrait + 'static, O: SuiteOp>(suite: Suite, op: O) -> Option<O::Output> {
    match suite.kdf {
        KdfId::HkdfSha256 => dispatch_aead::<M, HkdfSha256, O>(suite, op),
        KdfId::HkdfSha384 => dispatch_aead::<M, HkdfSha384, O>(suite, op),
        KdfId::HkdfSha512 => dispatch_aead::<M, HkdfSha512, O>(suite, op),
    }
}

fn dispatch_aead<M, K, O>(suite: Suite, op: O) -> Option<O::Output>
where
    M: KemTrait + 'static,
    K: KdfTrait + 'static,
    O: SuiteOp,
{
    match suite.aead {
        AeadId::Aes128Gcm => Some(op.run::<AesGcm128, K, M>()),
        AeadId::Aes256Gcm => Some(op.run::<AesGcm256, K, M>()),
        AeadId::ChaCha20Poly1305 => Some(op.run::<ChaCha20Poly1305, K, M>()),
        AeadId::ExportOnly => None,
    }
}

/// Serialized key material, wiping the intermediate array.
fn secret_bytes<S: Serializable>(value: &S) -> Zeroizing<Vec<u8>> {
    let mut raw = value.to_bytes();
    let out = Zeroizing::new(raw.to_vec());
    raw.as_mut_slice().zeroize();
    out
}

// ---------------------------------------------------------------------------
// Sender side
// ---------------------------------------------------------------------------

/// Object-safe view of an HPKE sender context.
trait SenderContext {
    fn seal_once(&mut self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, HpkeError>;
}

impl<A: AeadTrait, K: KdfTrait, M: KemTrait> SenderContext for AeadCtxS<A, K, M> {
    fn seal_once(&mut self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, HpkeError> {
        self.seal(plaintext, aad)
    }
}

struct Encap<'a, R> {
    public_key: &'a [u8],
    info: &'a [u8],
    secret_len: usize,
    rng: &'a mut R,
}

type EncapOutput = (Vec<u8>, Box<dyn SenderContext>, Zeroizing<Vec<u8>>);

impl<R: CryptoRng + RngCore> SuiteOp for Encap<'_, R> {
    type Output = Result<EncapOutput, OdohError>;

    fn run<A, K, M>(self) -> Self::Output
    where
        A: AeadTrait + 'static,
        K: KdfTrait + 'static,
        M: KemTrait + 'static,
    {
        let pk = M::PublicKey::from_bytes(self.public_key).map_err(|_| OdohError::KeyEncapsulation)?;
        let (enc, ctx) = hpke::setup_sender::<A, K, M, R>(&OpModeS::Base, &pk, self.info, self.rng)
            .map_err(|_| OdohError::KeyEncapsulation)?;

        let mut secret = Zeroizing::new(alloc::vec![0u8; self.secret_len]);
        ctx.export(LABEL_RESPONSE, &mut secret)
            .map_err(|_| OdohError::KeyEncapsulation)?;

        Ok((enc.to_bytes().to_vec(), Box::new(ctx), secret))
    }
}

/// Sender state for one query: the encapsulated key and the sealing context.
///
/// Consumed by [`EncryptionContext::seal`]; the context can seal exactly
/// one message.
pub struct EncryptionContext {
    suite: Suite,
    encapsulated_key: Vec<u8>,
    inner: Box<dyn SenderContext>,
}

impl EncryptionContext {
    pub fn suite(&self) -> Suite {
        self.suite
    }

    /// The sender's ephemeral KEM output, sent in front of the ciphertext.
    pub fn encapsulated_key(&self) -> &[u8] {
        &self.encapsulated_key
    }

    /// One-shot AEAD seal under the derived key and base nonce.
    pub fn seal(mut self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, OdohError> {
        self.inner
            .seal_once(plaintext, aad)
            .map_err(|_| OdohError::Seal)
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("suite", &self.suite)
            .field("encapsulated_key_len", &self.encapsulated_key.len())
            .finish_non_exhaustive()
    }
}

/// Encapsulate against `config` with fresh randomness from the OS.
pub fn encapsulate(
    config: &ResolverConfig,
    info: &[u8],
) -> Result<(EncryptionContext, QuerySecret), OdohError> {
    encapsulate_with_rng(config, info, &mut OsRng)
}

/// Encapsulate against `config`, drawing the ephemeral key from `rng`.
///
/// Also exports the query secret (`Nk` bytes) the response will be
/// opened with.
pub fn encapsulate_with_rng<R: CryptoRng + RngCore>(
    config: &ResolverConfig,
    info: &[u8],
    rng: &mut R,
) -> Result<(EncryptionContext, QuerySecret), OdohError> {
    let suite = config.suite();
    let op = Encap {
        public_key: config.public_key(),
        info,
        secret_len: suite.secret_len(),
        rng,
    };
    let (encapsulated_key, inner, secret) = dispatch(suite, op).ok_or(OdohError::UnsupportedSuite)??;
    trace!(suite = %suite, enc_len = encapsulated_key.len(), "hpke sender context ready");

    Ok((
        EncryptionContext {
            suite,
            encapsulated_key,
            inner,
        },
        QuerySecret::new(suite, secret),
    ))
}

// ---------------------------------------------------------------------------
// Receiver side (target)
// ---------------------------------------------------------------------------

struct Decap<'a> {
    private_key: &'a [u8],
    encapsulated_key: &'a [u8],
    info: &'a [u8],
    ciphertext: &'a [u8],
    aad: &'a [u8],
    secret_len: usize,
}

impl SuiteOp for Decap<'_> {
    type Output = Result<(Vec<u8>, Zeroizing<Vec<u8>>), OdohError>;

    fn run<A, K, M>(self) -> Self::Output
    where
        A: AeadTrait + 'static,
        K: KdfTrait + 'static,
        M: KemTrait + 'static,
    {
        let sk = M::PrivateKey::from_bytes(self.private_key).map_err(|_| OdohError::Open)?;
        let enc = M::EncappedKey::from_bytes(self.encapsulated_key).map_err(|_| OdohError::Open)?;
        let mut ctx = hpke::setup_receiver::<A, K, M>(&OpModeR::Base, &sk, &enc, self.info)
            .map_err(|_| OdohError::Open)?;

        let plaintext = ctx.open(self.ciphertext, self.aad).map_err(|_| OdohError::Open)?;

        let mut secret = Zeroizing::new(alloc::vec![0u8; self.secret_len]);
        ctx.export(LABEL_RESPONSE, &mut secret)
            .map_err(|_| OdohError::Open)?;
        Ok((plaintext, secret))
    }
}

/// Target side of [`encapsulate`]: set up the receiver context, open the
/// query ciphertext and export the matching query secret.
///
/// Every failure is `Open`.
pub(crate) fn decapsulate(
    suite: Suite,
    private_key: &[u8],
    encapsulated_key: &[u8],
    info: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, QuerySecret), OdohError> {
    let op = Decap {
        private_key,
        encapsulated_key,
        info,
        ciphertext,
        aad,
        secret_len: suite.secret_len(),
    };
    let (plaintext, secret) = dispatch(suite, op).ok_or(OdohError::Open)??;
    Ok((plaintext, QuerySecret::new(suite, secret)))
}

struct GenerateKeyPair<'a, R> {
    rng: &'a mut R,
}

impl<R: CryptoRng + RngCore> SuiteOp for GenerateKeyPair<'_, R> {
    type Output = (Zeroizing<Vec<u8>>, Vec<u8>);

    fn run<A, K, M>(self) -> Self::Output
    where
        A: AeadTrait + 'static,
        K: KdfTrait + 'static,
        M: KemTrait + 'static,
    {
        let (sk, pk) = M::gen_keypair(self.rng);
        (secret_bytes(&sk), pk.to_bytes().to_vec())
    }
}

struct DeriveKeyPair<'a> {
    ikm: &'a [u8],
}

impl SuiteOp for DeriveKeyPair<'_> {
    type Output = (Zeroizing<Vec<u8>>, Vec<u8>);

    fn run<A, K, M>(self) -> Self::Output
    where
        A: AeadTrait + 'static,
        K: KdfTrait + 'static,
        M: KemTrait + 'static,
    {
        let (sk, pk) = M::derive_keypair(self.ikm);
        (secret_bytes(&sk), pk.to_bytes().to_vec())
    }
}

/// `(private_key, public_key)` bytes for `suite`'s KEM.
pub(crate) fn generate_keypair<R: CryptoRng + RngCore>(
    suite: Suite,
    rng: &mut R,
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), OdohError> {
    dispatch(suite, GenerateKeyPair { rng }).ok_or(OdohError::UnsupportedSuite)
}

/// Deterministic variant of [`generate_keypair`] (RFC 9180 DeriveKeyPair).
pub(crate) fn derive_keypair(
    suite: Suite,
    ikm: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), OdohError> {
    dispatch(suite, DeriveKeyPair { ikm }).ok_or(OdohError::UnsupportedSuite)
}

// ---------------------------------------------------------------------------
// Query secret and response context
// ---------------------------------------------------------------------------

/// Secret exported from one query's HPKE context.
///
/// Not `Clone`: opening a response consumes it, so a secret cannot be used
/// twice. The bytes are wiped on drop.
pub struct QuerySecret {
    suite: Suite,
    padding_len: usize,
    secret: Zeroizing<Vec<u8>>,
}

impl QuerySecret {
    pub(crate) fn new(suite: Suite, secret: Zeroizing<Vec<u8>>) -> Self {
        Self {
            suite,
            padding_len: 0,
            secret,
        }
    }

    /// Record the padding the query plaintext was framed with, so the
    /// response side can rebuild the exact `Q_plain`.
    pub(crate) fn with_padding(mut self, padding_len: usize) -> Self {
        self.padding_len = padding_len;
        self
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    pub fn padding_len(&self) -> usize {
        self.padding_len
    }

    /// Rederive the response AEAD key and nonce.
    ///
    /// `query_plaintext` is the framed query (`ObliviousDoHMessagePlaintext`)
    /// and `response_nonce` the nonce carried in the response's key id
    /// field. A nonce of the wrong length cannot belong to this suite and is
    /// rejected as `AssociatedDataMismatch`.
    pub fn reopen(
        self,
        query_plaintext: &[u8],
        response_nonce: &[u8],
    ) -> Result<ResponseContext, OdohError> {
        if response_nonce.len() != self.suite.response_nonce_len() {
            return Err(OdohError::AssociatedDataMismatch);
        }

        let mut salt = Zeroizing::new(Vec::with_capacity(
            query_plaintext.len() + 2 + response_nonce.len(),
        ));
        salt.extend_from_slice(query_plaintext);
        salt.extend_from_slice(&(response_nonce.len() as u16).to_be_bytes());
        salt.extend_from_slice(response_nonce);

        let prk = Prk::extract(self.suite.kdf, &salt, &self.secret);
        let aead = self.suite.aead;
        let mut key = Zeroizing::new(alloc::vec![0u8; aead.key_len()]);
        let mut nonce = Zeroizing::new(alloc::vec![0u8; aead.nonce_len()]);
        prk.expand(LABEL_KEY, &mut key).map_err(|_| OdohError::Open)?;
        prk.expand(LABEL_NONCE, &mut nonce).map_err(|_| OdohError::Open)?;

        Ok(ResponseContext { aead, key, nonce })
    }
}

impl fmt::Debug for QuerySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySecret")
            .field("suite", &self.suite)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// AEAD key and nonce for the single response of a query.
pub struct ResponseContext {
    aead: AeadId,
    key: Zeroizing<Vec<u8>>,
    nonce: Zeroizing<Vec<u8>>,
}

impl ResponseContext {
    /// Open the response. Fails closed with `Open`; no partial output.
    pub fn open(self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, OdohError> {
        aead::open(self.aead, &self.key, &self.nonce, ciphertext, aad)
    }

    /// Seal the response (target side).
    pub fn seal(self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, OdohError> {
        aead::seal(self.aead, &self.key, &self.nonce, plaintext, aad)
    }
}

impl fmt::Debug for ResponseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseContext")
            .field("aead", &self.aead)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::LABEL_QUERY;
    use rand::{rngs::StdRng, SeedableRng};

    fn target(suite: Suite) -> (Zeroizing<Vec<u8>>, ResolverConfig) {
        let (sk, pk) = generate_keypair(suite, &mut OsRng).unwrap();
        (sk, ResolverConfig::new(suite, pk).unwrap())
    }

    #[test]
    fn sender_and_receiver_agree_on_every_supported_suite() {
        for kem in [KemId::X25519HkdfSha256, KemId::P256HkdfSha256] {
            for kdf in [KdfId::HkdfSha256, KdfId::HkdfSha384, KdfId::HkdfSha512] {
                for aead in [AeadId::Aes128Gcm, AeadId::Aes256Gcm, AeadId::ChaCha20Poly1305] {
                    let suite = Suite::new(kem, kdf, aead);
                    let (sk, config) = target(suite);

                    let (ctx, client_secret) = encapsulate(&config, LABEL_QUERY).unwrap();
                    assert_eq!(ctx.encapsulated_key().len(), kem.encapsulated_key_len());
                    let enc = ctx.encapsulated_key().to_vec();
                    let ct = ctx.seal(b"query", b"aad").unwrap();
                    assert_eq!(ct.len(), 5 + aead.tag_len());

                    let (pt, target_secret) =
                        decapsulate(suite, &sk, &enc, LABEL_QUERY, &ct, b"aad").unwrap();
                    assert_eq!(pt, b"query");
                    assert_eq!(*client_secret.secret, *target_secret.secret);
                    assert_eq!(client_secret.secret.len(), aead.key_len());
                }
            }
        }
    }

    #[test]
    fn info_must_match() {
        let (sk, config) = target(Suite::DEFAULT);
        let (ctx, _) = encapsulate(&config, LABEL_QUERY).unwrap();
        let enc = ctx.encapsulated_key().to_vec();
        let ct = ctx.seal(b"query", b"").unwrap();
        assert_eq!(
            decapsulate(Suite::DEFAULT, &sk, &enc, b"odoh other", &ct, b"").unwrap_err(),
            OdohError::Open
        );
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let (_, config) = target(Suite::DEFAULT);
        let (a, _) = encapsulate_with_rng(&config, LABEL_QUERY, &mut StdRng::seed_from_u64(7)).unwrap();
        let (b, _) = encapsulate_with_rng(&config, LABEL_QUERY, &mut StdRng::seed_from_u64(7)).unwrap();
        let (c, _) = encapsulate_with_rng(&config, LABEL_QUERY, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.encapsulated_key(), b.encapsulated_key());
        assert_ne!(a.encapsulated_key(), c.encapsulated_key());
    }

    #[test]
    fn unsupported_suite_is_rejected_before_encapsulation() {
        let suite = Suite::new(KemId::X448HkdfSha512, KdfId::HkdfSha512, AeadId::Aes256Gcm);
        let config = ResolverConfig::new(suite, alloc::vec![1; 56]).unwrap();
        assert_eq!(encapsulate(&config, LABEL_QUERY).unwrap_err(), OdohError::UnsupportedSuite);
    }

    #[test]
    fn invalid_public_key_fails_encapsulation() {
        // 65 bytes, but not a point on P-256.
        let suite = Suite::new(KemId::P256HkdfSha256, KdfId::HkdfSha256, AeadId::Aes128Gcm);
        let config = ResolverConfig::new(suite, alloc::vec![0xFF; 65]).unwrap();
        assert_eq!(encapsulate(&config, LABEL_QUERY).unwrap_err(), OdohError::KeyEncapsulation);
    }

    #[test]
    fn response_context_is_bound_to_nonce_and_query() {
        let secret = || QuerySecret::new(Suite::DEFAULT, Zeroizing::new(alloc::vec![9u8; 16]));
        let nonce = [1u8; 16];

        let ct = secret().reopen(b"query", &nonce).unwrap().seal(b"answer", b"aad").unwrap();
        assert_eq!(secret().reopen(b"query", &nonce).unwrap().open(&ct, b"aad").unwrap(), b"answer");
        assert_eq!(
            secret().reopen(b"other", &nonce).unwrap().open(&ct, b"aad").unwrap_err(),
            OdohError::Open
        );
        assert_eq!(
            secret().reopen(b"query", &[2u8; 16]).unwrap().open(&ct, b"aad").unwrap_err(),
            OdohError::Open
        );
    }

    #[test]
    fn response_key_schedule_known_answer() {
        let secret = QuerySecret::new(Suite::DEFAULT, Zeroizing::new(alloc::vec![0x42u8; 16]));
        let query_plaintext = crate::wire::encode_plaintext(b"query", 0).unwrap();

        let ctx = secret.reopen(&query_plaintext, &[0x09; 16]).unwrap();
        assert_eq!(hex::encode(&*ctx.key), "027000b988bc01f01b0d0d0df3b1c39b");
        assert_eq!(hex::encode(&*ctx.nonce), "74c697fe3819f215dfa2f828");
        assert_eq!(
            hex::encode(ctx.seal(b"answer", b"aad").unwrap()),
            "172022c389d336b3373c9ebe6ec56001cc46946e1a60"
        );
    }

    #[test]
    fn nonce_length_mismatch() {
        let secret = QuerySecret::new(Suite::DEFAULT, Zeroizing::new(alloc::vec![9u8; 16]));
        assert_eq!(
            secret.reopen(b"query", &[0u8; 12]).unwrap_err(),
            OdohError::AssociatedDataMismatch
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let secret = QuerySecret::new(Suite::DEFAULT, Zeroizing::new(alloc::vec![0xAB; 16]));
        let text = alloc::format!("{:?}", secret);
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("171"));
    }
}
