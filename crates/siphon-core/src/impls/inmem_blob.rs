//! In-memory blob store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::PumpError;
use crate::ports::BlobStore;

/// Blob store backed by a `HashMap`. Keys are opaque strings; the
/// overflow codec mints ULIDs into them.
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PumpError> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, PumpError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| PumpError::Overflow(format!("no blob under key {key:?}")))
    }

    async fn delete(&self, key: &str) -> Result<(), PumpError> {
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| PumpError::Overflow(format!("no blob under key {key:?}")))
    }

    async fn create_if_not_exists(&self) -> Result<(), PumpError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = InMemoryBlobStore::new();

        store.put("k", b"payload").await.unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.get("k").await.unwrap(), b"payload");

        store.delete("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let store = InMemoryBlobStore::new();
        assert!(store.get("absent").await.is_err());
        assert!(store.delete("absent").await.is_err());
    }
}
