//! The transportable message unit and its delivery lifecycle.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, MessageId, UserId};

/// Delivery state of a message, as seen by one client.
///
/// Transitions move strictly forward along
/// `pending-send -> sent -> delivered -> read`; [`MessageStatus::Failed`] is
/// terminal and reachable from any non-terminal state. [`MessageStatus::advance`]
/// enforces this, so a late or duplicated status frame can never regress a
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStatus {
    /// Appended locally, not yet acknowledged by the relay.
    PendingSend,
    /// Accepted into the relay's history.
    Sent,
    /// Handed to the recipient's connection.
    Delivered,
    /// Seen by the recipient.
    Read,
    /// Permanently failed; no further transitions.
    Failed,
}

impl MessageStatus {
    /// Position in the forward chain; `None` for the terminal failure state.
    fn rank(self) -> Option<u8> {
        match self {
            Self::PendingSend => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Failed => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        match (self.rank(), next.rank()) {
            // Failed is terminal.
            (None, _) => false,
            // Any non-terminal state may fail.
            (Some(_), None) => true,
            (Some(from), Some(to)) => to > from,
        }
    }

    /// Applies `next` if it is a legal forward transition.
    ///
    /// Returns whether the status changed; illegal transitions leave the
    /// value untouched.
    pub fn advance(&mut self, next: Self) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// One transportable, relay-storable message.
///
/// `ciphertext` is the only representation of the message content that ever
/// crosses a socket or sits in relay memory; it is produced by the sender's
/// envelope codec and opaque to everything in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Client-assigned id, unique within the conversation's history.
    pub id: MessageId,
    /// The author of the message.
    pub sender_id: UserId,
    /// Sealed message content (base64 of nonce plus AEAD output).
    pub ciphertext: String,
    /// Sender-claimed creation time, milliseconds since the Unix epoch.
    ///
    /// Informational only; history ordering follows arrival at the relay.
    pub timestamp: u64,
    /// Delivery state as claimed by whoever last serialized the envelope.
    pub status: MessageStatus,
    /// Routing key binding the envelope to one pair of users.
    pub conversation_id: ConversationId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn status_moves_forward_only() {
        let mut status = MessageStatus::PendingSend;
        assert!(status.advance(MessageStatus::Sent));
        assert!(status.advance(MessageStatus::Delivered));
        assert!(!status.advance(MessageStatus::Sent));
        assert_eq!(status, MessageStatus::Delivered);
        assert!(status.advance(MessageStatus::Read));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn status_may_skip_intermediate_states() {
        let mut status = MessageStatus::PendingSend;
        assert!(status.advance(MessageStatus::Read));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn failed_is_terminal() {
        let mut status = MessageStatus::Sent;
        assert!(status.advance(MessageStatus::Failed));
        assert!(!status.advance(MessageStatus::Read));
        assert!(!status.advance(MessageStatus::Failed));
        assert_eq!(status, MessageStatus::Failed);
    }

    #[test]
    fn read_cannot_fail() {
        let mut status = MessageStatus::Read;
        assert!(!status.advance(MessageStatus::Failed));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::PendingSend).unwrap(),
            "\"pending-send\""
        );
        assert_eq!(serde_json::to_string(&MessageStatus::Sent).unwrap(), "\"sent\"");
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let envelope = Envelope {
            id: MessageId::new("m1"),
            sender_id: uid("user-1"),
            ciphertext: "b64".into(),
            timestamp: 42,
            status: MessageStatus::Sent,
            conversation_id: ConversationId::between(uid("user-1"), uid("user-2")),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "m1",
                "senderId": "user-1",
                "ciphertext": "b64",
                "timestamp": 42,
                "status": "sent",
                "conversationId": "user-1:user-2",
            })
        );
        let back: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }
}
