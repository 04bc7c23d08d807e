//! Client error types.

use sotto_core::AssistError;
use thiserror::Error;

use crate::session::SessionError;

/// Errors surfaced by the [`crate::Controller`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested identity is not in the directory.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// No session is currently connected.
    #[error("not connected")]
    NotConnected,

    /// The relay could not be reached or the handshake failed.
    ///
    /// Surfaced to the user; the controller returns to the disconnected
    /// state.
    #[error("connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    /// The session state machine rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The outbound channel closed underneath a send.
    #[error("connection closed")]
    ConnectionClosed,

    /// The assist collaborator failed.
    #[error(transparent)]
    Assist(#[from] AssistError),
}
