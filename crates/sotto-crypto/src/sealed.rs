//! The sealed-envelope codec.
//!
//! Wire format: `base64(nonce[12] || ciphertext || tag[16])` with
//! ChaCha20-Poly1305. A fresh random nonce is drawn for every [`seal`] call;
//! nonce reuse under one key breaks the AEAD, so there is deliberately no way
//! to supply a nonce from outside.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::{OpenError, SealError};
use crate::keys::SharedKey;

/// Nonce length in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Seals a plaintext under a conversation key.
///
/// Every call draws a fresh random nonce, so sealing the same plaintext
/// twice yields different blobs.
///
/// # Errors
///
/// Returns [`SealError`] if AEAD encryption fails.
pub fn seal(plaintext: &str, key: &SharedKey) -> Result<String, SealError> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, plaintext.as_bytes()).map_err(|_| SealError)?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(combined))
}

/// Opens a sealed blob under a conversation key.
///
/// # Errors
///
/// Returns the uniform [`OpenError`] for every failure mode: invalid base64,
/// truncated input, authentication failure (tampering or wrong key), and
/// non-UTF-8 plaintext. Callers render a fixed placeholder; no partial
/// plaintext ever escapes.
pub fn open(blob: &str, key: &SharedKey) -> Result<String, OpenError> {
    let combined = BASE64.decode(blob).map_err(|_| OpenError)?;
    if combined.len() < NONCE_SIZE + TAG_SIZE {
        return Err(OpenError);
    }
    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let plaintext =
        cipher.decrypt(Nonce::from_slice(nonce_bytes), ciphertext).map_err(|_| OpenError)?;

    String::from_utf8(plaintext).map_err(|_| OpenError)
}
