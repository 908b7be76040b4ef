//! Wire format (RFC 9230)
//!
//! ObliviousDoHMessage:
//!   message_type[1] || key_id_len[2] || key_id || encrypted_message_len[2] || encrypted_message
//!
//! For queries, `key_id` identifies the target config and
//! `encrypted_message = encapsulated_key[Nenc] || ciphertext`.
//! For responses, `key_id` carries the response nonce.
//!
//! ObliviousDoHMessagePlaintext (the AEAD payload):
//!   dns_message_len[2] || dns_message || padding_len[2] || padding (zero bytes)

extern crate alloc;
use alloc::vec::Vec;

use crate::error::OdohError;
use crate::suite::KemId;

/// Config version this crate understands.
pub const ODOH_VERSION: u16 = 0x0001;

/// HPKE `info` for query encapsulation.
pub const LABEL_QUERY: &[u8] = b"odoh query";
/// HPKE export label for the response secret.
pub const LABEL_RESPONSE: &[u8] = b"odoh response";
/// Expand label for config key ids.
pub const LABEL_KEY_ID: &[u8] = b"odoh key id";
/// Expand label for the response AEAD key.
pub const LABEL_KEY: &[u8] = b"odoh key";
/// Expand label for the response AEAD nonce.
pub const LABEL_NONCE: &[u8] = b"odoh nonce";

/// HTTP media type for oblivious DNS messages.
pub const ODOH_MEDIA_TYPE: &str = "application/oblivious-dns-message";
/// Path resolvers publish their `ObliviousDoHConfigs` under.
pub const WELL_KNOWN_CONFIG_PATH: &str = "/.well-known/odohconfigs";

/// Largest body a u16 length prefix can describe.
pub const MAX_VEC16_LEN: usize = u16::MAX as usize;

/// Message type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Query = 0x01,
    Response = 0x02,
}

impl TryFrom<u8> for MessageType {
    type Error = OdohError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(MessageType::Query),
            0x02 => Ok(MessageType::Response),
            _ => Err(OdohError::MalformedMessage),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive readers / writers
// ---------------------------------------------------------------------------

/// Forward-only reader over a byte slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    pub(crate) fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// A `u16`-length-prefixed vector.
    pub(crate) fn read_vec16(&mut self) -> Option<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }
}

/// Append `v` as a `u16`-length-prefixed vector.
pub(crate) fn put_vec16(out: &mut Vec<u8>, v: &[u8]) -> Result<(), OdohError> {
    if v.len() > MAX_VEC16_LEN {
        return Err(OdohError::InvalidInput);
    }
    out.extend_from_slice(&(v.len() as u16).to_be_bytes());
    out.extend_from_slice(v);
    Ok(())
}

/// `type || len(key_id) || key_id`, the AAD for both message directions.
pub(crate) fn message_aad(message_type: MessageType, key_id: &[u8]) -> Result<Vec<u8>, OdohError> {
    let mut aad = Vec::with_capacity(1 + 2 + key_id.len());
    aad.push(message_type as u8);
    put_vec16(&mut aad, key_id)?;
    Ok(aad)
}

// ---------------------------------------------------------------------------
// ObliviousDoHMessage
// ---------------------------------------------------------------------------

/// The envelope exchanged between client, proxy and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObliviousMessage {
    pub message_type: MessageType,
    /// Config key id for queries, response nonce for responses.
    pub key_id: Vec<u8>,
    pub encrypted_message: Vec<u8>,
}

impl ObliviousMessage {
    /// Build a query from its parts: `encrypted_message = enc || ciphertext`.
    pub fn query(key_id: Vec<u8>, encapsulated_key: &[u8], ciphertext: &[u8]) -> Self {
        let mut encrypted_message = Vec::with_capacity(encapsulated_key.len() + ciphertext.len());
        encrypted_message.extend_from_slice(encapsulated_key);
        encrypted_message.extend_from_slice(ciphertext);
        Self {
            message_type: MessageType::Query,
            key_id,
            encrypted_message,
        }
    }

    pub fn response(nonce: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            message_type: MessageType::Response,
            key_id: nonce,
            encrypted_message: ciphertext,
        }
    }

    /// Split a query's payload into `(encapsulated_key, ciphertext)`.
    ///
    /// Returns `None` for responses or when the payload is too short to
    /// hold an encapsulated key for `kem`.
    pub fn split_query(&self, kem: KemId) -> Option<(&[u8], &[u8])> {
        if self.message_type != MessageType::Query {
            return None;
        }
        let nenc = kem.encapsulated_key_len();
        if self.encrypted_message.len() <= nenc {
            return None;
        }
        Some(self.encrypted_message.split_at(nenc))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, OdohError> {
        if self.encrypted_message.is_empty() {
            return Err(OdohError::InvalidInput);
        }
        let mut out =
            Vec::with_capacity(1 + 2 + self.key_id.len() + 2 + self.encrypted_message.len());
        out.push(self.message_type as u8);
        put_vec16(&mut out, &self.key_id)?;
        put_vec16(&mut out, &self.encrypted_message)?;
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, OdohError> {
        let mut r = Reader::new(data);
        let message_type = MessageType::try_from(r.read_u8().ok_or(OdohError::MalformedMessage)?)?;
        let key_id = r.read_vec16().ok_or(OdohError::MalformedMessage)?;
        let encrypted_message = r.read_vec16().ok_or(OdohError::MalformedMessage)?;
        if encrypted_message.is_empty() || !r.is_empty() {
            return Err(OdohError::MalformedMessage);
        }
        Ok(Self {
            message_type,
            key_id: key_id.to_vec(),
            encrypted_message: encrypted_message.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// ObliviousDoHMessagePlaintext
// ---------------------------------------------------------------------------

/// How much zero padding to put after a DNS message before sealing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    #[default]
    None,
    /// Pad the DNS message up to the next multiple of this many bytes.
    /// `Block(0)` behaves like `None`.
    Block(u16),
}

impl Padding {
    /// Padding length for a DNS message of `len` bytes.
    pub fn padding_for(self, len: usize) -> usize {
        match self {
            Padding::None | Padding::Block(0) => 0,
            Padding::Block(block) => {
                let block = block as usize;
                (block - len % block) % block
            }
        }
    }
}

/// Frame a DNS message with `padding_len` zero bytes of padding.
pub(crate) fn encode_plaintext(dns_message: &[u8], padding_len: usize) -> Result<Vec<u8>, OdohError> {
    if dns_message.is_empty() || padding_len > MAX_VEC16_LEN {
        return Err(OdohError::InvalidInput);
    }
    let mut out = Vec::with_capacity(2 + dns_message.len() + 2 + padding_len);
    put_vec16(&mut out, dns_message)?;
    out.extend_from_slice(&(padding_len as u16).to_be_bytes());
    out.resize(out.len() + padding_len, 0);
    Ok(out)
}

/// Unframe an opened payload into `(dns_message, padding_len)`.
///
/// Framing errors and non-zero padding are reported as `Open`.
pub(crate) fn decode_plaintext(data: &[u8]) -> Result<(&[u8], usize), OdohError> {
    let mut r = Reader::new(data);
    let dns_message = r.read_vec16().ok_or(OdohError::Open)?;
    let padding = r.read_vec16().ok_or(OdohError::Open)?;
    if dns_message.is_empty() || !r.is_empty() {
        return Err(OdohError::Open);
    }
    if padding.iter().fold(0u8, |acc, b| acc | b) != 0 {
        return Err(OdohError::Open);
    }
    Ok((dns_message, padding.len()))
}
