//! Wire format for the Sotto messaging relay.
//!
//! One WebSocket text frame carries one JSON object of the shape
//! `{"type": ..., "payload": ...}`. The relay routes envelopes by their
//! conversation identifier without ever inspecting message content: the
//! `ciphertext` field is an opaque string produced and consumed entirely by
//! clients.
//!
//! The crate is deliberately I/O-free. It defines identifiers, the
//! [`Envelope`] record, the [`MessageStatus`] lifecycle, and the frame enums
//! exchanged between client and relay, so that both sides (and their tests)
//! share a single source of truth for the protocol.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod frames;
pub mod ids;

pub use envelope::{Envelope, MessageStatus};
pub use errors::ProtocolError;
pub use frames::{ClientFrame, ServerFrame};
pub use ids::{ConversationId, MessageId, UserId};
