//! Relay manager tests.
//!
//! The manager is routing-only: it stores and forwards opaque envelopes and
//! never needs a key, so every test here uses placeholder ciphertext.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;

use sotto_proto::{
    ConversationId, Envelope, MessageId, MessageStatus, ServerFrame, UserId,
};
use sotto_relay::{RelayAction, RelayError, RelayManager};

fn uid(s: &str) -> UserId {
    UserId::new(s).unwrap()
}

fn envelope(id: &str, sender: &str, recipient: &str) -> Envelope {
    Envelope {
        id: MessageId::new(id),
        sender_id: uid(sender),
        ciphertext: format!("opaque-{id}"),
        timestamp: 1_000,
        status: MessageStatus::Sent,
        conversation_id: ConversationId::between(uid(sender), uid(recipient)),
    }
}

#[test]
fn connect_pushes_empty_initial_batch() {
    let mut manager = RelayManager::new();
    let actions = manager.connect(uid("user-1"), 1);

    assert_eq!(
        actions,
        vec![RelayAction::Deliver {
            to: 1,
            frame: ServerFrame::InitialMessages(BTreeMap::new()),
        }]
    );
    assert!(manager.is_online(&uid("user-1")));
}

#[test]
fn send_to_offline_recipient_stores_and_acks() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);

    let actions = manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();

    // Recipient offline: no forward, only the ack.
    assert_eq!(actions.len(), 1);
    assert!(matches!(
        &actions[0],
        RelayAction::Deliver { to: 1, frame: ServerFrame::SendAck { message_id, .. } }
            if message_id.as_str() == "m1"
    ));

    let cid = ConversationId::between(uid("user-1"), uid("user-2"));
    assert_eq!(manager.history(&cid).unwrap().len(), 1);
}

#[test]
fn connect_after_offline_send_replays_history() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);
    manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();

    let actions = manager.connect(uid("user-2"), 2);

    let cid = ConversationId::between(uid("user-1"), uid("user-2"));
    match &actions[..] {
        [RelayAction::Deliver { to: 2, frame: ServerFrame::InitialMessages(batch) }] => {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[&cid][0].id.as_str(), "m1");
        },
        other => panic!("expected one initialMessages delivery, got {other:?}"),
    }
}

#[test]
fn initial_batch_excludes_unrelated_conversations() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);
    manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();
    manager
        .handle_send(&uid("user-1"), &uid("user-3"), envelope("m2", "user-1", "user-3"))
        .unwrap();

    let actions = manager.connect(uid("user-2"), 2);

    match &actions[..] {
        [RelayAction::Deliver { frame: ServerFrame::InitialMessages(batch), .. }] => {
            assert_eq!(batch.len(), 1);
            assert!(batch.contains_key(&ConversationId::between(uid("user-1"), uid("user-2"))));
        },
        other => panic!("unexpected actions: {other:?}"),
    }
}

#[test]
fn online_recipient_gets_the_envelope_verbatim() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);
    manager.connect(uid("user-2"), 2);

    let sent = envelope("m1", "user-1", "user-2");
    let actions = manager.handle_send(&uid("user-1"), &uid("user-2"), sent.clone()).unwrap();

    assert_eq!(actions.len(), 2);
    match &actions[0] {
        RelayAction::Deliver { to: 2, frame: ServerFrame::NewMessage(forwarded) } => {
            // Forwarded byte-for-byte: same ciphertext, never re-encrypted.
            assert_eq!(forwarded, &sent);
        },
        other => panic!("expected newMessage to user-2's connection, got {other:?}"),
    }
    assert!(matches!(
        &actions[1],
        RelayAction::Deliver { to: 1, frame: ServerFrame::SendAck { .. } }
    ));
}

#[test]
fn duplicate_id_does_not_grow_history_or_reforward() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);
    manager.connect(uid("user-2"), 2);

    manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();
    let retry = manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();

    let cid = ConversationId::between(uid("user-1"), uid("user-2"));
    assert_eq!(manager.history(&cid).unwrap().len(), 1);

    // The retry is still acknowledged, but nothing is forwarded again.
    assert_eq!(retry.len(), 1);
    assert!(matches!(
        &retry[0],
        RelayAction::Deliver { to: 1, frame: ServerFrame::SendAck { .. } }
    ));
}

#[test]
fn mismatched_conversation_id_is_rejected() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);

    // Envelope routed to user-2 but tagged for the user-1/user-3 pair.
    let mut bad = envelope("m1", "user-1", "user-3");
    bad.conversation_id = ConversationId::between(uid("user-1"), uid("user-3"));
    let result = manager.handle_send(&uid("user-1"), &uid("user-2"), bad);

    assert!(matches!(result, Err(RelayError::ConversationMismatch { .. })));
    assert!(manager.history(&ConversationId::between(uid("user-1"), uid("user-2"))).is_none());
}

#[test]
fn spoofed_sender_is_rejected() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);

    let spoofed = envelope("m1", "user-3", "user-2");
    let result = manager.handle_send(&uid("user-1"), &uid("user-2"), spoofed);

    assert!(matches!(result, Err(RelayError::SenderMismatch { .. })));
}

#[test]
fn reconnect_supersedes_the_previous_connection() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-2"), 1);
    let actions = manager.connect(uid("user-2"), 2);

    assert!(matches!(actions[0], RelayAction::Close { conn: 1 }));

    // Forwarding now targets the new connection.
    manager.connect(uid("user-1"), 3);
    let send = manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();
    assert!(matches!(
        &send[0],
        RelayAction::Deliver { to: 2, frame: ServerFrame::NewMessage(_) }
    ));
}

#[test]
fn stale_disconnect_does_not_evict_the_replacement() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-2"), 1);
    manager.connect(uid("user-2"), 2);

    // The superseded socket's close arrives late.
    assert_eq!(manager.disconnect(1), None);
    assert!(manager.is_online(&uid("user-2")));

    assert_eq!(manager.disconnect(2), Some(uid("user-2")));
    assert!(!manager.is_online(&uid("user-2")));
}

#[test]
fn disconnect_keeps_history() {
    let mut manager = RelayManager::new();
    manager.connect(uid("user-1"), 1);
    manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();

    manager.disconnect(1);

    let cid = ConversationId::between(uid("user-1"), uid("user-2"));
    assert_eq!(manager.history(&cid).unwrap().len(), 1);
}

#[test]
fn offline_sender_send_still_stores() {
    // A sender whose connection dropped between frames: the envelope is
    // stored and forwarded, only the ack has nowhere to go.
    let mut manager = RelayManager::new();
    manager.connect(uid("user-2"), 2);

    let actions = manager
        .handle_send(&uid("user-1"), &uid("user-2"), envelope("m1", "user-1", "user-2"))
        .unwrap();

    assert_eq!(actions.len(), 1);
    assert!(matches!(
        &actions[0],
        RelayAction::Deliver { to: 2, frame: ServerFrame::NewMessage(_) }
    ));
}
