//! Crypto error types.
//!
//! [`OpenError`] is deliberately a single opaque value: decryption failure
//! must not reveal whether the key, the tag, the encoding, or the length was
//! at fault.

use thiserror::Error;

/// Errors from pairwise key agreement.
///
/// Callers must treat any of these as "this conversation has no key"; never
/// substitute a default key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyAgreementError {
    /// Key material had the wrong length.
    #[error("key material must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// The Diffie-Hellman output was all zeroes (low-order peer point).
    #[error("key agreement produced a non-contributory result")]
    NonContributory,

    /// The key-derivation step itself failed.
    #[error("key derivation failed")]
    Derivation,
}

/// Sealing a plaintext failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to seal plaintext")]
pub struct SealError;

/// Opening a sealed envelope failed.
///
/// One uniform value for tampering, truncation, wrong key, bad encoding, and
/// non-UTF-8 plaintext alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("envelope could not be authenticated")]
pub struct OpenError;
