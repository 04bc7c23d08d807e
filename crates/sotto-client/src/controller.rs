//! Session controller runtime.
//!
//! Owns the relay connection for one identity at a time. Connecting
//! establishes keys for every known counterpart, opens the WebSocket with
//! the identity as a query parameter, and wires three tasks: a reader that
//! parses frames into an inbound queue, a single consumer that applies them
//! to the session (so arrival order is display order), and a writer that
//! drains the outbound queue. Switching identities tears all of that down,
//! key material included, before the next session starts.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use rand::rngs::OsRng;
use rand::RngCore;
use sotto_core::{Assist, Directory, KeyRing, PlainMessage, Tone, MAX_SMART_REPLIES};
use sotto_proto::{ClientFrame, MessageId, ServerFrame, UserId};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::session::{ClientSession, SessionAction};

/// Runtime state of one connected identity.
struct Active {
    user_id: UserId,
    session: Arc<Mutex<ClientSession>>,
    outbound: mpsc::UnboundedSender<ClientFrame>,
    tasks: Vec<JoinHandle<()>>,
}

/// Connects identities to the relay and drives their sessions.
pub struct Controller<D> {
    directory: Arc<D>,
    server_url: String,
    active: Option<Active>,
}

impl<D: Directory> Controller<D> {
    /// Creates a disconnected controller.
    ///
    /// `server_url` is the relay base URL, e.g. `ws://127.0.0.1:8080`.
    pub fn new(directory: Arc<D>, server_url: impl Into<String>) -> Self {
        Self { directory, server_url: server_url.into(), active: None }
    }

    /// The identity currently connected, if any.
    pub fn connected_user(&self) -> Option<&UserId> {
        self.active.as_ref().map(|active| &active.user_id)
    }

    /// Shared handle to the live session state, if connected.
    pub fn session(&self) -> Option<Arc<Mutex<ClientSession>>> {
        self.active.as_ref().map(|active| Arc::clone(&active.session))
    }

    /// Connects `user_id` to the relay.
    ///
    /// Any previous session (same identity or not) is fully torn down
    /// first, including its cached keys, so there is no overlap window
    /// between identities. Key establishment runs before the socket opens;
    /// counterparts whose derivation fails are logged and skipped, leaving
    /// only their conversation disabled.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownUser`] for an unprovisioned id, or
    /// [`ClientError::Connect`] if the relay is unreachable; in both cases
    /// the controller remains disconnected.
    pub async fn connect(&mut self, user_id: &UserId) -> Result<(), ClientError> {
        self.disconnect().await;

        let identity = self
            .directory
            .identity(user_id)
            .ok_or_else(|| ClientError::UnknownUser(user_id.to_string()))?;
        // Derivations are independent per counterpart (X25519 + HKDF, a few
        // microseconds each); KeyRing::establish logs and skips failures.
        let ring = KeyRing::establish(identity, &*self.directory);
        let session = Arc::new(Mutex::new(ClientSession::new(identity.id.clone(), ring)));

        let url = format!("{}/?userId={}", self.server_url.trim_end_matches('/'), user_id);
        let (ws, _response) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<ServerFrame>();

        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "dropping unserializable frame");
                        continue;
                    },
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader parses and enqueues; it never touches session state.
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(frame).is_err() {
                                break;
                            }
                        },
                        Err(err) => warn!(error = %err, "undecodable relay frame dropped"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {},
                }
            }
            debug!("relay connection closed");
        });

        // Single consumer: frames apply in arrival order, which is what
        // keeps one conversation's display order stable.
        let consumer = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                while let Some(frame) = inbound_rx.recv().await {
                    session.lock().await.handle_frame(frame);
                }
            })
        };

        self.active = Some(Active {
            user_id: user_id.clone(),
            session,
            outbound: outbound_tx,
            tasks: vec![writer, reader, consumer],
        });
        Ok(())
    }

    /// Tears down the current session, if any.
    ///
    /// Cached keys and local history are cleared before this returns, so a
    /// subsequent [`Controller::connect`] can never observe or leak
    /// state from the previous identity.
    pub async fn disconnect(&mut self) {
        let Some(active) = self.active.take() else { return };
        // Closing the outbound queue lets the writer shut the socket.
        drop(active.outbound);
        for task in &active.tasks {
            task.abort();
        }
        // Aborted tasks may hold their Arc clone a little longer; clear the
        // state now instead of waiting for those drops.
        active.session.lock().await.clear();
    }

    /// Encrypts and sends `text` to `recipient`, returning the new message's
    /// id.
    ///
    /// Fail closed: with no cached key for the recipient this returns the
    /// session's error and nothing leaves the process.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`], a [`crate::SessionError`], or
    /// [`ClientError::ConnectionClosed`] if the socket went away.
    pub async fn send(&self, recipient: &UserId, text: &str) -> Result<MessageId, ClientError> {
        let active = self.active.as_ref().ok_or(ClientError::NotConnected)?;
        let id = fresh_message_id();
        let action = {
            let mut session = active.session.lock().await;
            session.send_message(recipient, text, id.clone(), unix_millis())?
        };
        let SessionAction::Dispatch(frame) = action;
        active.outbound.send(frame).map_err(|_| ClientError::ConnectionClosed)?;
        Ok(id)
    }

    /// Decrypted view of the conversation with `peer`, for display or for
    /// the assist collaborator.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] when no session is live.
    pub async fn plain_history(&self, peer: &UserId) -> Result<Vec<PlainMessage>, ClientError> {
        let active = self.active.as_ref().ok_or(ClientError::NotConnected)?;
        let session = active.session.lock().await;
        Ok(session
            .history_with(peer)
            .iter()
            .map(|envelope| PlainMessage {
                sender_id: envelope.sender_id.clone(),
                text: session.render_text(envelope),
            })
            .collect())
    }

    /// Rewrites a draft via the assist collaborator before it is encrypted.
    ///
    /// # Errors
    ///
    /// Propagates the assist backend's failure.
    pub async fn rewrite_draft(
        &self,
        assist: &dyn Assist,
        text: &str,
        tone: Tone,
    ) -> Result<String, ClientError> {
        Ok(assist.rewrite(text, tone).await?)
    }

    /// Reply suggestions for the conversation with `peer`, capped at
    /// [`MAX_SMART_REPLIES`].
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or the assist backend's failure.
    pub async fn smart_replies(
        &self,
        assist: &dyn Assist,
        peer: &UserId,
    ) -> Result<Vec<String>, ClientError> {
        let history = self.plain_history(peer).await?;
        let mut replies = assist.smart_replies(&history).await?;
        replies.truncate(MAX_SMART_REPLIES);
        Ok(replies)
    }

    /// A short summary of the conversation with `peer`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or the assist backend's failure.
    pub async fn summarize(
        &self,
        assist: &dyn Assist,
        peer: &UserId,
    ) -> Result<String, ClientError> {
        let history = self.plain_history(peer).await?;
        Ok(assist.summarize(&history).await?)
    }
}

/// A locally unique message id: 128 random bits, hex-encoded.
fn fresh_message_id() -> MessageId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    MessageId::new(format!("msg-{}", hex::encode(bytes)))
}

/// Milliseconds since the Unix epoch, for the envelope's (informational)
/// timestamp.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
