//! WebSocket driver tests against a live listener on a loopback port.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use sotto_proto::{
    ClientFrame, ConversationId, Envelope, MessageId, MessageStatus, ServerFrame, UserId,
};
use sotto_relay::RelayServer;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_relay() -> String {
    let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    format!("ws://{addr}")
}

async fn next_server_frame(
    stream: &mut (impl Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
) -> ServerFrame {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("undecodable server frame");
        }
    }
}

fn envelope(id: &str, sender: &str, recipient: &str) -> Envelope {
    Envelope {
        id: MessageId::new(id),
        sender_id: UserId::new(sender).unwrap(),
        ciphertext: format!("opaque-{id}"),
        timestamp: 1_000,
        status: MessageStatus::Sent,
        conversation_id: ConversationId::between(
            UserId::new(sender).unwrap(),
            UserId::new(recipient).unwrap(),
        ),
    }
}

#[tokio::test]
async fn handshake_without_user_id_is_rejected() {
    let url = spawn_relay().await;
    assert!(connect_async(url.as_str()).await.is_err());
}

#[tokio::test]
async fn handshake_with_empty_user_id_is_rejected() {
    let url = spawn_relay().await;
    assert!(connect_async(format!("{url}/?userId=").as_str()).await.is_err());
}

#[tokio::test]
async fn connect_receives_initial_messages_first() {
    let url = spawn_relay().await;
    let (mut ws, _) = connect_async(format!("{url}/?userId=user-1").as_str()).await.unwrap();

    let frame = next_server_frame(&mut ws).await;
    assert!(matches!(frame, ServerFrame::InitialMessages(batch) if batch.is_empty()));
}

#[tokio::test]
async fn malformed_frame_does_not_close_the_connection() {
    let url = spawn_relay().await;
    let (mut ws, _) = connect_async(format!("{url}/?userId=user-1").as_str()).await.unwrap();
    let _ = next_server_frame(&mut ws).await; // initialMessages

    // Garbage, then an unknown frame type: both must be dropped silently.
    ws.send(Message::Text("not json at all".into())).await.unwrap();
    ws.send(Message::Text(r#"{"type":"presence","payload":{}}"#.into())).await.unwrap();

    // The connection is still Online: a valid send is processed and acked.
    let frame = ClientFrame::SendMessage {
        message: envelope("m1", "user-1", "user-2"),
        recipient_id: UserId::new("user-2").unwrap(),
    };
    ws.send(Message::Text(serde_json::to_string(&frame).unwrap())).await.unwrap();

    let ack = next_server_frame(&mut ws).await;
    assert!(matches!(
        ack,
        ServerFrame::SendAck { message_id, .. } if message_id.as_str() == "m1"
    ));
}

#[tokio::test]
async fn online_recipient_receives_new_message_frame() {
    let url = spawn_relay().await;
    let (mut sender, _) = connect_async(format!("{url}/?userId=user-1").as_str()).await.unwrap();
    let (mut recipient, _) =
        connect_async(format!("{url}/?userId=user-2").as_str()).await.unwrap();
    let _ = next_server_frame(&mut sender).await;
    let _ = next_server_frame(&mut recipient).await;

    let sent = envelope("m2", "user-1", "user-2");
    let frame = ClientFrame::SendMessage {
        message: sent.clone(),
        recipient_id: UserId::new("user-2").unwrap(),
    };
    sender.send(Message::Text(serde_json::to_string(&frame).unwrap())).await.unwrap();

    let delivered = next_server_frame(&mut recipient).await;
    match delivered {
        ServerFrame::NewMessage(received) => assert_eq!(received, sent),
        other => panic!("expected newMessage, got {other:?}"),
    }
}

#[tokio::test]
async fn backlog_is_delivered_to_a_late_recipient() {
    let url = spawn_relay().await;
    let (mut sender, _) = connect_async(format!("{url}/?userId=user-1").as_str()).await.unwrap();
    let _ = next_server_frame(&mut sender).await;

    let frame = ClientFrame::SendMessage {
        message: envelope("m1", "user-1", "user-2"),
        recipient_id: UserId::new("user-2").unwrap(),
    };
    sender.send(Message::Text(serde_json::to_string(&frame).unwrap())).await.unwrap();
    // The ack proves the envelope is in history before user-2 connects.
    let _ = next_server_frame(&mut sender).await;

    let (mut recipient, _) =
        connect_async(format!("{url}/?userId=user-2").as_str()).await.unwrap();
    let batch = next_server_frame(&mut recipient).await;
    match batch {
        ServerFrame::InitialMessages(conversations) => {
            let cid = ConversationId::between(
                UserId::new("user-1").unwrap(),
                UserId::new("user-2").unwrap(),
            );
            assert_eq!(conversations[&cid].len(), 1);
            assert_eq!(conversations[&cid][0].id.as_str(), "m1");
        },
        other => panic!("expected initialMessages, got {other:?}"),
    }
}
