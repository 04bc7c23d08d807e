//! Session-layer building blocks shared by Sotto clients and tooling.
//!
//! # Components
//!
//! - [`directory`]: the provisioning collaborator, answering who exists and which
//!   keys they hold. Consumed interface; the in-process
//!   [`StaticDirectory`] stands in for a real provisioning service.
//! - [`keyring`]: the per-conversation [`SharedKey`] cache, populated once
//!   per session and discarded on disconnect.
//! - [`assist`]: the AI text-transform collaborator. Plaintext in,
//!   plaintext out, applied by the sender before encryption. Consumed
//!   interface only.
//!
//! [`SharedKey`]: sotto_crypto::SharedKey

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assist;
pub mod directory;
pub mod keyring;

pub use assist::{Assist, AssistError, PlainMessage, Tone, MAX_SMART_REPLIES};
pub use directory::{Contact, Directory, StaticDirectory, UserIdentity};
pub use keyring::KeyRing;
