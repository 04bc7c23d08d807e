//! Store-and-forward relay for sealed Sotto envelopes.
//!
//! The relay never holds a key and never reads a plaintext: envelopes are
//! opaque records that it appends to per-conversation histories and forwards
//! to whichever participant is online. History lives in memory for the
//! lifetime of the process; offline users pull their backlog on their next
//! connect.
//!
//! # Architecture
//!
//! Session semantics live in [`RelayManager`], a pure state machine that
//! turns connection events into [`RelayAction`]s without doing any I/O. The
//! WebSocket driver in [`server`] owns the sockets: one task per connection,
//! one mutex around the manager so duplicate detection and append are
//! atomic, and one unbounded outbound channel per connection so a slow peer
//! can never stall the manager or anyone else.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod manager;
pub mod server;

pub use manager::{ConnectionId, RelayAction, RelayError, RelayManager};
pub use server::RelayServer;
