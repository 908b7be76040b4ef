//! # odoh-hpke
//!
//! Oblivious DNS-over-HTTPS (RFC 9230) message encryption over HPKE.
//!
//! ## Quick Start
//!
//! ```rust
//! use odoh_hpke::{decrypt_response, encrypt_query, encrypt_response, ResolverKeyPair, Suite};
//!
//! // Target: publish a config.
//! let target = ResolverKeyPair::generate(Suite::DEFAULT).unwrap();
//! let config_bytes = target.configs_bytes().unwrap();
//!
//! // Client: seal a query, keep the secret.
//! let (query_msg, secret) = encrypt_query(&config_bytes, b"dns query").unwrap();
//! let wire = query_msg.to_bytes().unwrap();
//!
//! // Target: open the query, seal the answer.
//! let received = odoh_hpke::ObliviousMessage::from_bytes(&wire).unwrap();
//! let (query, target_secret) = target.decrypt_query(&received).unwrap();
//! let response = encrypt_response(target_secret, &query, b"dns answer").unwrap();
//!
//! // Client: open the answer with the secret and the original query.
//! let answer = decrypt_response(secret, b"dns query", &response).unwrap();
//! assert_eq!(answer, b"dns answer");
//! ```
//!
//! ## Security Properties
//!
//! - **Fresh encapsulation**: every query gets its own ephemeral HPKE key
//! - **Query binding**: the response key is derived from the original query
//! - **Single-use secrets**: `QuerySecret` is consumed by value and wiped on drop
//! - **Uniform errors**: every authentication failure is the same `Open` error
//!
//! ## What's NOT Provided
//!
//! - Config discovery (DNS HTTPS records, well-known fetch)
//! - HTTP transport to the proxy
//! - DNS message parsing

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// ---------------------------------------------------------------------------
// Internal modules (not part of public API)
// ---------------------------------------------------------------------------

mod aead;
mod kdf;

// ---------------------------------------------------------------------------
// Public modules
// ---------------------------------------------------------------------------

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod suite;
pub mod target;
pub mod wire;

pub use codec::{decrypt_response, encrypt_query, OdohCodec};
pub use config::{compose_configs, parse_configs, select_config, ResolverConfig};
pub use context::{encapsulate, encapsulate_with_rng, EncryptionContext, QuerySecret, ResponseContext};
pub use error::{OdohError, Result};
pub use suite::{AeadId, KdfId, KemId, Suite};
pub use target::{encrypt_response, encrypt_response_with_rng, ResolverKeyPair};
pub use wire::{MessageType, ObliviousMessage, Padding};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
