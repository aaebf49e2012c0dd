//! BlobStore port: key-addressed storage for oversized payloads.

use async_trait::async_trait;

use crate::error::PumpError;

/// Key-addressed blob storage. Only used for payloads too large to fit
/// inline in a queue message.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PumpError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, PumpError>;

    async fn delete(&self, key: &str) -> Result<(), PumpError>;

    async fn create_if_not_exists(&self) -> Result<(), PumpError>;
}
