//! Client session state machine.
//!
//! # Architecture: Action-Based State Machine
//!
//! The session is pure: methods mutate local state and return actions for
//! the runtime to execute, so the full send/receive/reconcile lifecycle is
//! testable without a socket.
//!
//! # Optimistic sends and reconciliation
//!
//! `send_message` appends a local copy with status `pending-send` before the
//! relay has seen anything; the copy is provisional until the relay's
//! `sendAck` advances it to `sent`. The wire envelope carries `sent`: that
//! is what the relay stores and what the recipient's history shows.
//!
//! # Lazy decryption
//!
//! History stores ciphertext. [`ClientSession::render_text`] decrypts at
//! display time with whatever key is cached for the conversation, so a
//! message that fails to authenticate renders a fixed placeholder without
//! affecting its neighbors.

use std::collections::BTreeMap;

use sotto_core::KeyRing;
use sotto_crypto::{seal, SealError};
use sotto_proto::{
    ClientFrame, ConversationId, Envelope, MessageId, MessageStatus, ServerFrame, UserId,
};
use thiserror::Error;

/// Fixed, non-leaking text shown for a message that cannot be decrypted.
pub const DECRYPT_FAILED_PLACEHOLDER: &str = "[message could not be decrypted]";

/// Effects returned by the session for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this frame to the relay.
    Dispatch(ClientFrame),
}

/// Why a local operation was refused.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No cached key for the recipient's conversation: the send is refused
    /// locally and nothing is transmitted.
    #[error("no shared key for conversation with {peer}; message not sent")]
    NoSharedKey {
        /// The counterpart the send was addressed to.
        peer: UserId,
    },

    /// Messages to oneself are not a conversation.
    #[error("cannot send a message to yourself")]
    SelfRecipient,

    /// Encryption failed; nothing was appended or transmitted.
    #[error(transparent)]
    Seal(#[from] SealError),
}

/// Local state of one connected identity.
///
/// Dropping the session drops the key ring (every key zeroizes) and the
/// decrypted-on-render histories, which is the whole teardown story for an
/// identity switch.
#[derive(Debug)]
pub struct ClientSession {
    user_id: UserId,
    keys: KeyRing,
    histories: BTreeMap<ConversationId, Vec<Envelope>>,
}

impl ClientSession {
    /// Creates a session for `user_id` with an established key ring.
    pub fn new(user_id: UserId, keys: KeyRing) -> Self {
        Self { user_id, keys, histories: BTreeMap::new() }
    }

    /// The identity this session belongs to.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Whether a key is cached for the given conversation.
    pub fn has_key(&self, conversation: &ConversationId) -> bool {
        self.keys.contains(conversation)
    }

    /// Local history for the conversation with `peer`, in arrival order.
    pub fn history_with(&self, peer: &UserId) -> &[Envelope] {
        let id = ConversationId::between(self.user_id.clone(), peer.clone());
        self.histories.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Number of conversations with local history.
    pub fn conversation_count(&self) -> usize {
        self.histories.len()
    }

    /// Encrypts `text` for `recipient` and stages it for dispatch.
    ///
    /// Fail closed: without a cached key for the conversation this returns
    /// an error and neither appends nor dispatches anything: plaintext is
    /// never transmitted and no substitute key is ever used. On success the
    /// local copy is appended optimistically with status `pending-send`;
    /// the returned action carries the wire envelope with status `sent`.
    ///
    /// # Errors
    ///
    /// [`SessionError::SelfRecipient`], [`SessionError::NoSharedKey`], or a
    /// sealing failure.
    pub fn send_message(
        &mut self,
        recipient: &UserId,
        text: &str,
        id: MessageId,
        timestamp: u64,
    ) -> Result<SessionAction, SessionError> {
        if *recipient == self.user_id {
            return Err(SessionError::SelfRecipient);
        }
        let conversation = ConversationId::between(self.user_id.clone(), recipient.clone());
        let key = self
            .keys
            .get(&conversation)
            .ok_or_else(|| SessionError::NoSharedKey { peer: recipient.clone() })?;

        let ciphertext = seal(text, key)?;
        let wire = Envelope {
            id,
            sender_id: self.user_id.clone(),
            ciphertext,
            timestamp,
            status: MessageStatus::Sent,
            conversation_id: conversation.clone(),
        };

        let mut local = wire.clone();
        local.status = MessageStatus::PendingSend;
        self.append(local);

        Ok(SessionAction::Dispatch(ClientFrame::SendMessage {
            message: wire,
            recipient_id: recipient.clone(),
        }))
    }

    /// Applies one relay frame to local state.
    pub fn handle_frame(&mut self, frame: ServerFrame) {
        match frame {
            ServerFrame::InitialMessages(batch) => self.merge_initial(batch),
            ServerFrame::NewMessage(envelope) => self.append(envelope),
            ServerFrame::SendAck { conversation_id, message_id } => {
                self.reconcile_ack(&conversation_id, &message_id);
            },
        }
    }

    /// Clears cached keys (each zeroizes on drop) and all local history.
    ///
    /// Called at teardown so that nothing survives into the next session.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.histories.clear();
    }

    /// Decrypts an envelope for display.
    ///
    /// Uses the key cached for the envelope's conversation; a missing key or
    /// failed authentication yields the fixed placeholder. Nothing else is
    /// affected, neither other messages nor the connection.
    pub fn render_text(&self, envelope: &Envelope) -> String {
        let Some(key) = self.keys.get(&envelope.conversation_id) else {
            return DECRYPT_FAILED_PLACEHOLDER.to_string();
        };
        match sotto_crypto::open(&envelope.ciphertext, key) {
            Ok(text) => text,
            Err(_) => DECRYPT_FAILED_PLACEHOLDER.to_string(),
        }
    }

    /// Appends an envelope to its conversation, deduplicated by id.
    fn append(&mut self, envelope: Envelope) {
        let history = self.histories.entry(envelope.conversation_id.clone()).or_default();
        if history.iter().any(|stored| stored.id == envelope.id) {
            tracing::debug!(id = %envelope.id, "duplicate envelope ignored");
            return;
        }
        history.push(envelope);
    }

    /// Replaces local history with the relay batch, then re-appends local
    /// provisional entries the relay has not stored yet.
    ///
    /// The relay copy is authoritative for everything it contains; only
    /// `pending-send` entries survive from the local side.
    fn merge_initial(&mut self, batch: BTreeMap<ConversationId, Vec<Envelope>>) {
        let previous = std::mem::replace(&mut self.histories, batch);
        for (conversation, history) in previous {
            for envelope in history {
                if envelope.status != MessageStatus::PendingSend {
                    continue;
                }
                let merged = self.histories.entry(conversation.clone()).or_default();
                if !merged.iter().any(|stored| stored.id == envelope.id) {
                    merged.push(envelope);
                }
            }
        }
    }

    /// Advances an optimistic entry to `sent` when its ack arrives.
    ///
    /// Unknown ids and repeated acks are no-ops; the status transition is
    /// monotonic so a late ack can never regress a delivered or read
    /// message.
    fn reconcile_ack(&mut self, conversation: &ConversationId, message: &MessageId) {
        let Some(history) = self.histories.get_mut(conversation) else {
            tracing::debug!(%conversation, "ack for unknown conversation");
            return;
        };
        let Some(envelope) = history.iter_mut().find(|stored| stored.id == *message) else {
            tracing::debug!(%conversation, id = %message, "ack for unknown message");
            return;
        };
        envelope.status.advance(MessageStatus::Sent);
    }
}
