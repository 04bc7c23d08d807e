//! Per-conversation key cache.

use std::collections::HashMap;

use sotto_crypto::{derive_shared_key, SharedKey};
use sotto_proto::ConversationId;

use crate::directory::{Directory, UserIdentity};

/// Cache of one [`SharedKey`] per conversation, for one session.
///
/// Populated once when a session starts and cleared when it ends; keys exist
/// only in memory (the `SharedKey` values zeroize themselves on drop). A
/// conversation with no entry is send-disabled: callers must fail closed
/// rather than derive on demand mid-send.
#[derive(Debug, Default)]
pub struct KeyRing {
    keys: HashMap<ConversationId, SharedKey>,
}

impl KeyRing {
    /// An empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a key for every counterpart the directory knows.
    ///
    /// Derivations are independent: a failure for one counterpart is logged
    /// and skipped, leaving that conversation send-disabled while the rest
    /// of the ring populates normally.
    pub fn establish(identity: &UserIdentity, directory: &dyn Directory) -> Self {
        let mut ring = Self::new();
        for contact in directory.contacts(&identity.id) {
            match derive_shared_key(identity.private_key(), &contact.public_key) {
                Ok(key) => {
                    let id = ConversationId::between(identity.id.clone(), contact.id.clone());
                    ring.keys.insert(id, key);
                },
                Err(err) => {
                    tracing::warn!(peer = %contact.id, error = %err, "key establishment failed, conversation disabled");
                },
            }
        }
        ring
    }

    /// The cached key for a conversation, if one was established.
    pub fn get(&self, conversation: &ConversationId) -> Option<&SharedKey> {
        self.keys.get(conversation)
    }

    /// Whether a key exists for the conversation.
    pub fn contains(&self, conversation: &ConversationId) -> bool {
        self.keys.contains_key(conversation)
    }

    /// Number of established conversations.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drops every cached key (each zeroizes on drop).
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
