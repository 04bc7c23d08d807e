//! AI text-transform collaborator.
//!
//! An [`Assist`] backend operates strictly on locally decrypted plaintext:
//! the sender applies it *before* encryption, and it never sees ciphertext
//! or key material. The trait is a consumed interface; real backends live
//! outside this workspace; tests use small stubs.

use async_trait::async_trait;
use sotto_proto::UserId;
use thiserror::Error;

/// Upper bound on reply suggestions returned by [`Assist::smart_replies`].
pub const MAX_SMART_REPLIES: usize = 3;

/// Requested register for [`Assist::rewrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// More formal phrasing.
    Formal,
    /// More casual phrasing.
    Casual,
}

/// One decrypted message as handed to an assist backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainMessage {
    /// Who wrote the message.
    pub sender_id: UserId,
    /// Decrypted text.
    pub text: String,
}

/// An assist backend failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assist backend failure: {0}")]
pub struct AssistError(
    /// Human-readable reason reported by the backend.
    pub String,
);

/// Plaintext transformation service consumed by the sending client.
#[async_trait]
pub trait Assist: Send + Sync {
    /// Up to [`MAX_SMART_REPLIES`] short reply suggestions for the given
    /// conversation history.
    async fn smart_replies(&self, history: &[PlainMessage]) -> Result<Vec<String>, AssistError>;

    /// Rewrites a draft in the requested tone.
    async fn rewrite(&self, text: &str, tone: Tone) -> Result<String, AssistError>;

    /// A short summary of the conversation.
    async fn summarize(&self, history: &[PlainMessage]) -> Result<String, AssistError>;
}
