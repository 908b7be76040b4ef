//! Unified error type for ODoH encryption.
//!
//! Every variant is a unit so errors compare by value and carry nothing
//! about secret material. Authentication failures of any kind collapse
//! into [`OdohError::Open`].

/// Errors surfaced by config parsing, query encryption and response
/// decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OdohError {
    /// Config bytes are truncated or their outer framing is inconsistent.
    #[error("malformed odoh config")]
    MalformedConfig,

    /// Config framing was valid but no entry could be used.
    #[error("no usable odoh config")]
    NoUsableConfig,

    /// None of the advertised configs uses a supported HPKE suite.
    #[error("unsupported hpke suite")]
    UnsupportedSuite,

    /// HPKE encapsulation against the resolver public key failed.
    #[error("key encapsulation failed")]
    KeyEncapsulation,

    /// AEAD seal failed.
    #[error("encryption failed")]
    Seal,

    /// AEAD open failed, for any cause.
    #[error("decryption failed")]
    Open,

    /// Response framing does not belong to the query it is opened against.
    #[error("associated data mismatch")]
    AssociatedDataMismatch,

    /// Wire envelope could not be decoded.
    #[error("malformed oblivious message")]
    MalformedMessage,

    /// Caller input cannot be framed (empty, or longer than a u16 vector).
    #[error("invalid input")]
    InvalidInput,
}

pub type Result<T> = core::result::Result<T, OdohError>;
