//! Relay session manager.
//!
//! # Architecture: Action-Based State Machine
//!
//! The manager holds the connection registry and every conversation history,
//! but performs no I/O itself: each operation returns [`RelayAction`]s for
//! the driver to execute. This keeps routing semantics testable without
//! sockets and makes the locking story trivial: the driver wraps one
//! manager in one mutex and executes actions after mutating.
//!
//! # Connection lifecycle
//!
//! ```text
//! Unauthenticated ──userId present──> Online ──socket closed──> Closed
//!        │
//!        └──userId absent──> Closed (handshake rejected by the driver)
//! ```
//!
//! A user has at most one Online connection; a second connect for the same
//! user supersedes the first.

use std::collections::{BTreeMap, HashMap};

use sotto_proto::{ConversationId, Envelope, ServerFrame, UserId};
use thiserror::Error;

/// Driver-assigned identifier of one accepted connection.
///
/// Delivery targets connections rather than users so that a frame raced
/// against a reconnect can never reach the wrong session.
pub type ConnectionId = u64;

/// Effects returned by the manager for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Send a frame over the given connection (best effort).
    Deliver {
        /// Target connection.
        to: ConnectionId,
        /// Frame to serialize and send.
        frame: ServerFrame,
    },

    /// Drop a connection that was superseded by a newer one.
    Close {
        /// The superseded connection.
        conn: ConnectionId,
    },
}

/// Why an inbound send was rejected.
///
/// A rejection is logged and the frame dropped; the connection stays Online.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The envelope's conversation id does not match its sender/recipient
    /// pair.
    #[error("conversation id mismatch: envelope says {got}, route says {expected}")]
    ConversationMismatch {
        /// Conversation id computed from the route.
        expected: ConversationId,
        /// Conversation id claimed by the envelope.
        got: ConversationId,
    },

    /// The envelope claims a sender other than the connection's user.
    #[error("sender mismatch: connection belongs to {connection_user}, envelope says {claimed}")]
    SenderMismatch {
        /// User the submitting connection authenticated as.
        connection_user: UserId,
        /// Sender id inside the envelope.
        claimed: UserId,
    },
}

/// Connection registry plus per-conversation histories.
///
/// Owned by the server, created at service start and dropped at shutdown;
/// histories do not survive the process.
#[derive(Debug, Default)]
pub struct RelayManager {
    online: HashMap<UserId, ConnectionId>,
    histories: BTreeMap<ConversationId, Vec<Envelope>>,
}

impl RelayManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn` as `user`'s connection and emits the stored-history
    /// batch.
    ///
    /// Any prior connection for the same user is superseded and closed. The
    /// `initialMessages` frame is sent exactly once per connection, and even
    /// when no history exists, so clients have a deterministic point at
    /// which their backlog is known to be complete.
    pub fn connect(&mut self, user: UserId, conn: ConnectionId) -> Vec<RelayAction> {
        let mut actions = Vec::new();
        if let Some(previous) = self.online.insert(user.clone(), conn) {
            actions.push(RelayAction::Close { conn: previous });
        }

        let backlog: BTreeMap<ConversationId, Vec<Envelope>> = self
            .histories
            .iter()
            .filter(|(id, _)| id.involves(&user))
            .map(|(id, history)| (id.clone(), history.clone()))
            .collect();
        actions.push(RelayAction::Deliver {
            to: conn,
            frame: ServerFrame::InitialMessages(backlog),
        });
        actions
    }

    /// Processes one `sendMessage` submission.
    ///
    /// Validates the envelope against its route, appends it to the
    /// conversation history unless an entry with the same id already exists
    /// (idempotent retry), forwards a fresh envelope verbatim to the
    /// recipient when they are online, and always acknowledges the sender;
    /// acknowledgement means "stored", not "delivered".
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] for envelopes that fail validation; the
    /// caller logs and drops them without touching any history.
    pub fn handle_send(
        &mut self,
        sender: &UserId,
        recipient: &UserId,
        envelope: Envelope,
    ) -> Result<Vec<RelayAction>, RelayError> {
        if envelope.sender_id != *sender {
            return Err(RelayError::SenderMismatch {
                connection_user: sender.clone(),
                claimed: envelope.sender_id,
            });
        }
        let expected = ConversationId::between(sender.clone(), recipient.clone());
        if envelope.conversation_id != expected {
            return Err(RelayError::ConversationMismatch {
                expected,
                got: envelope.conversation_id,
            });
        }

        let history = self.histories.entry(expected.clone()).or_default();
        let fresh = !history.iter().any(|stored| stored.id == envelope.id);

        let mut actions = Vec::new();
        if fresh {
            history.push(envelope.clone());
            if let Some(&conn) = self.online.get(recipient) {
                actions.push(RelayAction::Deliver {
                    to: conn,
                    frame: ServerFrame::NewMessage(envelope.clone()),
                });
            }
        } else {
            tracing::debug!(conversation = %expected, id = %envelope.id, "duplicate envelope ignored");
        }

        if let Some(&conn) = self.online.get(sender) {
            actions.push(RelayAction::Deliver {
                to: conn,
                frame: ServerFrame::SendAck {
                    conversation_id: expected,
                    message_id: envelope.id,
                },
            });
        }
        Ok(actions)
    }

    /// Deregisters a closed connection.
    ///
    /// Only removes the registration if `conn` is still current for its
    /// user: the late close of a superseded socket must not evict its
    /// replacement. Histories are untouched.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<UserId> {
        let user = self
            .online
            .iter()
            .find_map(|(user, &c)| (c == conn).then(|| user.clone()))?;
        self.online.remove(&user);
        Some(user)
    }

    /// Whether a user currently has an Online connection.
    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains_key(user)
    }

    /// Stored history for a conversation, if any.
    pub fn history(&self, conversation: &ConversationId) -> Option<&[Envelope]> {
        self.histories.get(conversation).map(Vec::as_slice)
    }
}
