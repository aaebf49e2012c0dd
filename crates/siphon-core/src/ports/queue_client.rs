//! QueueClient port: a durable queue with lease-based fetch.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PumpError;
use crate::message::{LeaseToken, MessageId, QueueMessage};

/// A durable, at-least-once queue, already bound to one named queue.
///
/// Correctness of "no two workers process the same message concurrently"
/// rests entirely on the backend's lease mechanism: a fetched message is
/// hidden for `visibility_timeout`, and expiry without deletion makes it
/// redeliverable with an incremented dequeue count.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Fetch up to `max_count` messages, leasing each for
    /// `visibility_timeout`. An empty vec is a valid, non-error result.
    async fn fetch_batch(
        &self,
        max_count: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, PumpError>;

    /// Delete a message. The lease token must match the message's
    /// current lease; a stale token is an error, not a silent no-op.
    async fn delete_message(
        &self,
        id: &MessageId,
        lease_token: &LeaseToken,
    ) -> Result<(), PumpError>;

    /// Enqueue a raw body. Run it through
    /// [`OverflowCodec::encode`](crate::overflow::OverflowCodec::encode)
    /// first if it may exceed the inline size limit.
    async fn enqueue_message(&self, body: Vec<u8>) -> Result<MessageId, PumpError>;

    async fn create_if_not_exists(&self) -> Result<(), PumpError>;

    /// Delete every message in the queue.
    async fn clear(&self) -> Result<(), PumpError>;

    /// Approximate number of messages currently in the queue, if the
    /// backend can report it. Feeds the `queued_messages_approx` gauge.
    async fn approximate_message_count(&self) -> Result<Option<u64>, PumpError> {
        Ok(None)
    }
}
