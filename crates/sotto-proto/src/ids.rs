//! Identifiers for users, messages, and conversations.
//!
//! A [`ConversationId`] is a structured unordered pair of user ids rather
//! than a joined string: both participants compute the identical value
//! independently, and the counterpart is recovered through a field accessor
//! instead of string surgery. The `low:high` string form exists only at the
//! serialization boundary (JSON map keys), which is why [`UserId`] forbids
//! the `:` separator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Separator used in the wire form of a [`ConversationId`].
///
/// Must never occur inside a [`UserId`]; the constructor enforces this.
pub const CONVERSATION_SEPARATOR: char = ':';

/// Validated identifier of a registered user.
///
/// Non-empty, no whitespace, and no [`CONVERSATION_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validates and wraps a user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidUserId`] if the token is empty,
    /// contains whitespace, or contains the conversation separator.
    pub fn new(id: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::InvalidUserId { reason: "must not be empty".into() });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidUserId {
                reason: "must not contain whitespace".into(),
            });
        }
        if id.contains(CONVERSATION_SEPARATOR) {
            return Err(ProtocolError::InvalidUserId {
                reason: format!("must not contain {CONVERSATION_SEPARATOR:?}"),
            });
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Client-assigned identifier of a single message.
///
/// Opaque to the relay; uniqueness within a conversation is the sending
/// client's responsibility, and the relay's idempotent append depends on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a message identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic, order-independent identifier for a pair of users.
///
/// The two participant ids are stored sorted, so
/// `ConversationId::between(a, b) == ConversationId::between(b, a)` holds for
/// every pair and both ends of a conversation derive the same routing key
/// without coordination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationId {
    low: UserId,
    high: UserId,
}

impl ConversationId {
    /// Builds the conversation identifier for an unordered pair of users.
    pub fn between(a: UserId, b: UserId) -> Self {
        if a <= b { Self { low: a, high: b } } else { Self { low: b, high: a } }
    }

    /// The lexicographically smaller participant.
    pub fn low(&self) -> &UserId {
        &self.low
    }

    /// The lexicographically larger participant.
    pub fn high(&self) -> &UserId {
        &self.high
    }

    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: &UserId) -> bool {
        self.low == *user || self.high == *user
    }

    /// The counterpart of `user` in this conversation.
    ///
    /// Returns `None` if `user` is not a participant. For the degenerate
    /// self-conversation both sides are the same id and that id is returned.
    pub fn other_party(&self, user: &UserId) -> Option<&UserId> {
        if self.low == *user {
            Some(&self.high)
        } else if self.high == *user {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CONVERSATION_SEPARATOR}{}", self.low, self.high)
    }
}

impl FromStr for ConversationId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidConversationId { value: s.to_string() };
        let (low, high) = s.split_once(CONVERSATION_SEPARATOR).ok_or_else(invalid)?;
        let low = UserId::new(low).map_err(|_| invalid())?;
        let high = UserId::new(high).map_err(|_| invalid())?;
        if high < low {
            return Err(invalid());
        }
        Ok(Self { low, high })
    }
}

impl Serialize for ConversationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
