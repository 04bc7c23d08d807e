//! Key material types.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::KeyAgreementError;

/// Length of every key in this crate, in bytes.
pub const KEY_SIZE: usize = 32;

/// X25519 public key of one user.
///
/// Public data: freely copyable, safe to log in truncated form.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Wraps raw public key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a public key from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`KeyAgreementError::InvalidKeyLength`] if the slice is not
    /// exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyAgreementError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            KeyAgreementError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self(arr))
    }

    /// The key as raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// X25519 static private key of one user.
///
/// Never leaves the owning client. Zeroized on drop, intentionally not
/// `Clone`, and `Debug` prints `[REDACTED]`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; KEY_SIZE]);

impl PrivateKey {
    /// Generates a fresh private key from the OS RNG.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(OsRng).to_bytes())
    }

    /// Parses a private key from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`KeyAgreementError::InvalidKeyLength`] if the slice is not
    /// exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyAgreementError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            KeyAgreementError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self(arr))
    }

    /// The public key corresponding to this private key.
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(DalekPublicKey::from(&secret).to_bytes())
    }

    /// The key as raw bytes. Handle with care.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// Symmetric key shared by the two ends of one conversation.
///
/// Derived, never transmitted; held only in memory and zeroized on drop.
/// Usable solely by [`crate::seal`] and [`crate::open`].
#[derive(Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    /// Wraps derived key bytes.
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// The key as raw bytes. Do not log or persist.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedKey([REDACTED])")
    }
}
