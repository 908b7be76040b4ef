//! AEAD seal/open for the response path: AES-128-GCM, AES-256-GCM,
//! ChaCha20-Poly1305. Key and nonce lengths are checked before use.

extern crate alloc;
use alloc::vec::Vec;

use aes_gcm::{
    aead::{generic_array::typenum::Unsigned, Aead, AeadCore, KeyInit, Nonce, Payload},
    Aes128Gcm, Aes256Gcm,
};
use chacha20poly1305::ChaCha20Poly1305;

use crate::error::OdohError;
use crate::suite::AeadId;

fn seal_with<C: KeyInit + Aead>(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, OdohError> {
    let cipher = C::new_from_slice(key).map_err(|_| OdohError::Seal)?;
    if nonce.len() != <C as AeadCore>::NonceSize::USIZE {
        return Err(OdohError::Seal);
    }
    let payload = Payload { msg: plaintext, aad };
    cipher
        .encrypt(Nonce::<C>::from_slice(nonce), payload)
        .map_err(|_| OdohError::Seal)
}

fn open_with<C: KeyInit + Aead>(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, OdohError> {
    let cipher = C::new_from_slice(key).map_err(|_| OdohError::Open)?;
    if nonce.len() != <C as AeadCore>::NonceSize::USIZE {
        return Err(OdohError::Open);
    }
    let payload = Payload { msg: ciphertext, aad };
    cipher
        .decrypt(Nonce::<C>::from_slice(nonce), payload)
        .map_err(|_| OdohError::Open)
}

/// AEAD seal (response encrypt path). Returns `Seal` on failure.
pub(crate) fn seal(
    aead: AeadId,
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, OdohError> {
    match aead {
        AeadId::Aes128Gcm => seal_with::<Aes128Gcm>(key, nonce, plaintext, aad),
        AeadId::Aes256Gcm => seal_with::<Aes256Gcm>(key, nonce, plaintext, aad),
        AeadId::ChaCha20Poly1305 => seal_with::<ChaCha20Poly1305>(key, nonce, plaintext, aad),
        AeadId::ExportOnly => Err(OdohError::Seal),
    }
}

/// AEAD open (response decrypt path). Returns `Open` on failure.
pub(crate) fn open(
    aead: AeadId,
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, OdohError> {
    match aead {
        AeadId::Aes128Gcm => open_with::<Aes128Gcm>(key, nonce, ciphertext, aad),
        AeadId::Aes256Gcm => open_with::<Aes256Gcm>(key, nonce, ciphertext, aad),
        AeadId::ChaCha20Poly1305 => open_with::<ChaCha20Poly1305>(key, nonce, ciphertext, aad),
        AeadId::ExportOnly => Err(OdohError::Open),
    }
}
