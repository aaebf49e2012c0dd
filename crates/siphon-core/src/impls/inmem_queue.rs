//! In-memory queue client with real visibility-timeout semantics.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ulid::Ulid;

use crate::error::PumpError;
use crate::message::{LeaseToken, MessageId, QueueMessage};
use crate::ports::QueueClient;

struct StoredMessage {
    id: MessageId,
    body: Vec<u8>,
    dequeue_count: u32,
    inserted_at: DateTime<Utc>,
    next_visible_at: DateTime<Utc>,
    lease_token: LeaseToken,
}

/// Queue client backed by a `Vec` behind a mutex.
///
/// Fetching hides a message until its visibility timeout elapses,
/// increments its dequeue count, and reissues the lease token; deleting
/// validates the token, so a delete racing a redelivery fails instead
/// of acknowledging the wrong delivery. Lease expiry needs no timer:
/// visibility is evaluated against the clock on every fetch.
pub struct InMemoryQueueClient {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryQueueClient {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total messages held, visible or leased.
    pub fn message_count(&self) -> usize {
        self.lock().len()
    }

    /// Fabricate a delivery history, so tests can drive a message into
    /// poison territory without waiting out real redeliveries.
    pub fn set_dequeue_count(&self, id: &MessageId, count: u32) {
        if let Some(stored) = self.lock().iter_mut().find(|m| &m.id == id) {
            stored.dequeue_count = count;
        }
    }
}

impl Default for InMemoryQueueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn fetch_batch(
        &self,
        max_count: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, PumpError> {
        let now = Utc::now();
        let lease = TimeDelta::from_std(visibility_timeout).unwrap_or(TimeDelta::MAX);

        let mut messages = self.lock();
        let mut batch = Vec::new();
        for stored in messages.iter_mut() {
            if batch.len() as u32 >= max_count {
                break;
            }
            if stored.next_visible_at > now {
                continue;
            }
            stored.dequeue_count += 1;
            stored.next_visible_at = now + lease;
            stored.lease_token = LeaseToken::new(Ulid::new().to_string());

            batch.push(QueueMessage {
                id: stored.id.clone(),
                lease_token: stored.lease_token.clone(),
                body: stored.body.clone(),
                dequeue_count: stored.dequeue_count,
                inserted_at: stored.inserted_at,
                next_visible_at: stored.next_visible_at,
            });
        }
        Ok(batch)
    }

    async fn delete_message(
        &self,
        id: &MessageId,
        lease_token: &LeaseToken,
    ) -> Result<(), PumpError> {
        let mut messages = self.lock();
        let position = messages.iter().position(|m| &m.id == id).ok_or_else(|| {
            PumpError::Queue(format!("message {id} not found"))
        })?;
        if &messages[position].lease_token != lease_token {
            return Err(PumpError::Queue(format!(
                "stale lease token for message {id}"
            )));
        }
        messages.remove(position);
        Ok(())
    }

    async fn enqueue_message(&self, body: Vec<u8>) -> Result<MessageId, PumpError> {
        let id = MessageId::new(Ulid::new().to_string());
        let now = Utc::now();
        self.lock().push(StoredMessage {
            id: id.clone(),
            body,
            dequeue_count: 0,
            inserted_at: now,
            next_visible_at: now,
            lease_token: LeaseToken::new(Ulid::new().to_string()),
        });
        Ok(id)
    }

    async fn create_if_not_exists(&self) -> Result<(), PumpError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), PumpError> {
        self.lock().clear();
        Ok(())
    }

    async fn approximate_message_count(&self) -> Result<Option<u64>, PumpError> {
        Ok(Some(self.lock().len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn fetch_leases_and_hides_the_message() {
        let queue = InMemoryQueueClient::new();
        queue.enqueue_message(b"one".to_vec()).await.unwrap();

        let batch = queue.fetch_batch(10, VT).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, b"one");
        assert_eq!(batch[0].dequeue_count, 1);

        // Leased, so invisible until the timeout elapses.
        assert!(queue.fetch_batch(10, VT).await.unwrap().is_empty());
        assert_eq!(queue.message_count(), 1);
    }

    #[tokio::test]
    async fn expiry_redelivers_with_incremented_count_and_fresh_token() {
        let queue = InMemoryQueueClient::new();
        queue.enqueue_message(b"again".to_vec()).await.unwrap();

        let first = queue.fetch_batch(10, VT).await.unwrap().remove(0);
        tokio::time::sleep(VT * 2).await;

        let second = queue.fetch_batch(10, VT).await.unwrap().remove(0);
        assert_eq!(second.dequeue_count, 2);
        assert_ne!(second.lease_token, first.lease_token);
    }

    #[tokio::test]
    async fn delete_requires_the_current_lease_token() {
        let queue = InMemoryQueueClient::new();
        queue.enqueue_message(b"x".to_vec()).await.unwrap();

        let first = queue.fetch_batch(10, VT).await.unwrap().remove(0);
        tokio::time::sleep(VT * 2).await;
        let second = queue.fetch_batch(10, VT).await.unwrap().remove(0);

        // First delivery's token went stale on redelivery.
        let err = queue
            .delete_message(&first.id, &first.lease_token)
            .await
            .unwrap_err();
        assert!(matches!(err, PumpError::Queue(_)));

        queue
            .delete_message(&second.id, &second.lease_token)
            .await
            .unwrap();
        assert_eq!(queue.message_count(), 0);
    }

    #[tokio::test]
    async fn fetch_respects_the_batch_limit() {
        let queue = InMemoryQueueClient::new();
        for i in 0..5 {
            queue.enqueue_message(vec![i]).await.unwrap();
        }

        let batch = queue.fetch_batch(3, VT).await.unwrap();
        assert_eq!(batch.len(), 3);
        let rest = queue.fetch_batch(10, VT).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn clear_empties_the_queue() {
        let queue = InMemoryQueueClient::new();
        queue.enqueue_message(b"a".to_vec()).await.unwrap();
        queue.enqueue_message(b"b".to_vec()).await.unwrap();
        assert_eq!(queue.approximate_message_count().await.unwrap(), Some(2));

        queue.clear().await.unwrap();
        assert_eq!(queue.message_count(), 0);
        assert_eq!(queue.approximate_message_count().await.unwrap(), Some(0));
    }
}
