//! Cryptographic primitives for Sotto pairwise messaging.
//!
//! Two operations cover the whole surface:
//!
//! - [`derive_shared_key`]: X25519 Diffie-Hellman between one user's static
//!   private key and the counterpart's public key, stretched through
//!   HKDF-SHA256 into a per-conversation [`SharedKey`]. Both participants
//!   derive bit-identical key material without a round trip.
//! - [`seal`] / [`open`]: ChaCha20-Poly1305 with a fresh random 96-bit nonce
//!   per call, transported as `base64(nonce || ciphertext || tag)`.
//!
//! Secrets ([`PrivateKey`], [`SharedKey`]) are zeroized on drop and print as
//! `[REDACTED]`; neither implements `Clone` or serde, so key material cannot
//! leave the process by accident.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agreement;
pub mod errors;
pub mod keys;
pub mod sealed;

pub use agreement::derive_shared_key;
pub use errors::{KeyAgreementError, OpenError, SealError};
pub use keys::{PrivateKey, PublicKey, SharedKey, KEY_SIZE};
pub use sealed::{open, seal, NONCE_SIZE, TAG_SIZE};
