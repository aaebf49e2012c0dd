//! Message data model: identifiers, the raw queue message, and the
//! resolved view handed to hooks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue-assigned message identifier.
///
/// String-backed because queue backends issue opaque ids; the in-memory
/// implementation mints ULIDs into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Proof of an active lease, required to delete a message.
///
/// Reissued by the queue on every delivery; a delete with a stale token
/// fails, which is what prevents double-acknowledging a redelivered
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseToken(String);

impl LeaseToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as fetched from the queue, owned by the queue; the pump
/// holds it only while the lease is active.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: MessageId,
    pub lease_token: LeaseToken,

    /// Raw body: either the payload itself or an overflow pointer.
    pub body: Vec<u8>,

    /// How many times the queue has delivered this message, this
    /// delivery included. Maintained by the queue, never by the pump.
    pub dequeue_count: u32,

    pub inserted_at: DateTime<Utc>,

    /// When the current lease expires and the message becomes
    /// redeliverable again.
    pub next_visible_at: DateTime<Utc>,
}

/// The view a message hook observes: overflow already resolved, so
/// `content` is always the actual payload, never a pointer.
#[derive(Debug, Clone)]
pub struct ResolvedMessage {
    pub message: QueueMessage,

    /// The resolved payload bytes.
    pub content: Vec<u8>,

    /// Set when the payload was spilled to the blob store; the pump
    /// deletes this blob after the message reaches a terminal outcome.
    pub overflow_key: Option<String>,
}
