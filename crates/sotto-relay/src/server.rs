//! WebSocket driver for the relay manager.
//!
//! One tokio task per accepted connection. The handshake must carry a
//! `userId` query parameter; without one the upgrade is rejected and the
//! socket never reaches the manager. Inbound frames are JSON-decoded and fed
//! to the [`RelayManager`] under a single mutex; the resulting actions are
//! executed while the lock is still held (executing an action is a
//! non-blocking channel write, so the critical section stays short).
//! Outbound traffic flows through one unbounded channel per connection,
//! drained by a dedicated writer task, so a slow or dead peer only ever backs
//! up its own queue.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use sotto_proto::{ClientFrame, ServerFrame, UserId};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::manager::{ConnectionId, RelayAction, RelayManager};

/// Everything guarded by the single service-wide lock.
#[derive(Debug, Default)]
struct Inner {
    manager: RelayManager,
    links: HashMap<ConnectionId, mpsc::UnboundedSender<ServerFrame>>,
    next_conn: ConnectionId,
}

/// Shared state handed to every connection task.
#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bound relay service.
///
/// Created at service start; dropping it (or the task running
/// [`RelayServer::run`]) tears down the registry and all histories.
#[derive(Debug)]
pub struct RelayServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl RelayServer {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the address cannot be bound.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, shared: Arc::new(Shared::default()) })
    }

    /// The bound address (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the local address is unavailable.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if `accept` fails.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                handle_connection(shared, stream, peer).await;
            });
        }
    }
}

/// Pulls the `userId` value out of the upgrade request's query string.
fn user_id_from_request(request: &Request) -> Option<&str> {
    request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some(("userId", value)) if !value.is_empty() => Some(value),
            _ => None,
        })
    })
}

fn reject(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Runs one connection from handshake to teardown.
async fn handle_connection(shared: Arc<Shared>, stream: TcpStream, peer: SocketAddr) {
    // Unauthenticated -> Online happens here or not at all: without a valid
    // userId the upgrade is refused and the socket closes immediately.
    let mut authenticated: Option<UserId> = None;
    let callback = |request: &Request, response: Response| match user_id_from_request(request) {
        Some(raw) => match UserId::new(raw) {
            Ok(user) => {
                authenticated = Some(user);
                Ok(response)
            },
            Err(err) => Err(reject(&err.to_string())),
        },
        None => Err(reject("userId query parameter is required")),
    };

    let ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(err) => {
            debug!(%peer, error = %err, "handshake rejected");
            return;
        },
    };
    let Some(user_id) = authenticated else { return };

    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let conn = {
        let mut inner = shared.lock();
        let conn = inner.next_conn;
        inner.next_conn += 1;
        inner.links.insert(conn, tx);
        let actions = inner.manager.connect(user_id.clone(), conn);
        execute(&mut inner, actions);
        conn
    };
    info!(user = %user_id, conn, %peer, "client online");

    // Writer: drains this connection's queue until the queue closes (its
    // link was removed) or the peer stops reading.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
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

    // Reader: a malformed frame is logged and dropped, the connection stays
    // Online. Only socket closure ends the loop.
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(user = %user_id, conn, error = %err, "socket error");
                break;
            },
        };
        match message {
            Message::Text(text) => handle_text(&shared, conn, &user_id, &text),
            Message::Close(_) => break,
            // Ping/pong are handled by the protocol layer; binary frames are
            // not part of the protocol.
            _ => {},
        }
    }

    let mut inner = shared.lock();
    inner.links.remove(&conn);
    if inner.manager.disconnect(conn).is_some() {
        info!(user = %user_id, conn, "client disconnected");
    }
    drop(inner);
    writer.abort();
}

/// Decodes and applies one inbound text frame.
fn handle_text(shared: &Shared, conn: ConnectionId, user_id: &UserId, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(user = %user_id, conn, error = %err, "malformed frame dropped");
            return;
        },
    };
    match frame {
        ClientFrame::SendMessage { message, recipient_id } => {
            let mut inner = shared.lock();
            match inner.manager.handle_send(user_id, &recipient_id, message) {
                Ok(actions) => execute(&mut inner, actions),
                Err(err) => {
                    warn!(user = %user_id, conn, error = %err, "send rejected");
                },
            }
        },
    }
}

/// Executes manager actions. Channel writes never block; a send to a closed
/// or missing link is silently best-effort, matching the forwarding
/// contract.
fn execute(inner: &mut Inner, actions: Vec<RelayAction>) {
    for action in actions {
        match action {
            RelayAction::Deliver { to, frame } => {
                if let Some(link) = inner.links.get(&to) {
                    let _ = link.send(frame);
                }
            },
            RelayAction::Close { conn } => {
                // Dropping the link closes the writer's queue, which closes
                // the superseded socket.
                inner.links.remove(&conn);
            },
        }
    }
}
