//! Client side of the Sotto protocol.
//!
//! # Architecture
//!
//! Session semantics live in [`ClientSession`], a pure state machine with no
//! I/O: sending encrypts and appends an optimistic local copy, inbound
//! frames mutate local history, and decryption happens lazily when a message
//! is rendered. The [`Controller`] owns the runtime side: the WebSocket
//! connection, the channel-pumped reader/writer tasks, key establishment at
//! connect, and the teardown rules that keep key material from leaking
//! across an identity switch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod controller;
pub mod errors;
pub mod session;

pub use controller::Controller;
pub use errors::ClientError;
pub use session::{ClientSession, SessionAction, SessionError, DECRYPT_FAILED_PLACEHOLDER};
