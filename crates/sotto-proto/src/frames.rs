//! JSON frames exchanged over a relay connection.
//!
//! Every frame is a single `{"type": ..., "payload": ...}` object. The
//! client speaks [`ClientFrame`], the relay answers with [`ServerFrame`];
//! there is no other traffic on the socket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::ids::{ConversationId, MessageId, UserId};

/// Frames sent from a client to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Submit one sealed envelope for storage and forwarding.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// The envelope to store and forward.
        message: Envelope,
        /// Who the envelope is for.
        recipient_id: UserId,
    },
}

/// Frames sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Full stored history for every conversation involving the connecting
    /// user, keyed by conversation id. Sent exactly once, immediately after
    /// the connection comes online, and sent even when empty so clients have
    /// a deterministic "history loaded" point.
    InitialMessages(BTreeMap<ConversationId, Vec<Envelope>>),

    /// One envelope forwarded verbatim to its recipient.
    NewMessage(Envelope),

    /// Acknowledgement that a submitted envelope reached the relay's
    /// history. Decoupled from recipient delivery: it fires whether or not
    /// the recipient is online, and also for idempotently ignored
    /// duplicates.
    #[serde(rename_all = "camelCase")]
    SendAck {
        /// Conversation the acknowledged message belongs to.
        conversation_id: ConversationId,
        /// Id of the acknowledged message.
        message_id: MessageId,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::envelope::MessageStatus;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn envelope(id: &str) -> Envelope {
        Envelope {
            id: MessageId::new(id),
            sender_id: uid("user-1"),
            ciphertext: "opaque".into(),
            timestamp: 7,
            status: MessageStatus::Sent,
            conversation_id: ConversationId::between(uid("user-1"), uid("user-2")),
        }
    }

    #[test]
    fn send_message_wire_shape() {
        let frame = ClientFrame::SendMessage { message: envelope("m1"), recipient_id: uid("user-2") };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "sendMessage");
        assert_eq!(value["payload"]["recipientId"], "user-2");
        assert_eq!(value["payload"]["message"]["id"], "m1");
        let back: ClientFrame = serde_json::from_value(value).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn initial_messages_payload_is_a_map_keyed_by_conversation() {
        let cid = ConversationId::between(uid("user-1"), uid("user-2"));
        let mut conversations = BTreeMap::new();
        conversations.insert(cid, vec![envelope("m1"), envelope("m2")]);
        let frame = ServerFrame::InitialMessages(conversations);

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "initialMessages");
        assert_eq!(value["payload"]["user-1:user-2"][0]["id"], "m1");
        assert_eq!(value["payload"]["user-1:user-2"][1]["id"], "m2");
        let back: ServerFrame = serde_json::from_value(value).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn new_message_payload_is_the_envelope() {
        let frame = ServerFrame::NewMessage(envelope("m3"));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "newMessage");
        assert_eq!(value["payload"]["id"], "m3");
    }

    #[test]
    fn send_ack_wire_shape() {
        let frame = ServerFrame::SendAck {
            conversation_id: ConversationId::between(uid("user-1"), uid("user-2")),
            message_id: MessageId::new("m1"),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "sendAck");
        assert_eq!(value["payload"]["conversationId"], "user-1:user-2");
        assert_eq!(value["payload"]["messageId"], "m1");
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let raw = r#"{"type":"presence","payload":{}}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
        assert!(serde_json::from_str::<ServerFrame>(raw).is_err());
    }
}
