//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while constructing or parsing wire identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A user identifier failed validation.
    #[error("invalid user id: {reason}")]
    InvalidUserId {
        /// Why the identifier was rejected.
        reason: String,
    },

    /// A conversation identifier string could not be parsed.
    #[error("invalid conversation id {value:?}: expected \"<low>:<high>\"")]
    InvalidConversationId {
        /// The rejected input.
        value: String,
    },
}
