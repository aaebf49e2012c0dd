//! Overflow codec: transparent spill of oversized payloads to the blob
//! store.
//!
//! At send time a payload over the inline limit is written to the blob
//! store under a fresh ULID key and replaced by a small JSON pointer.
//! At receive time the pointer is detected, the blob fetched, and the
//! original bytes substituted before any hook sees the message: hooks
//! never observe a pointer. The blob outlives the message until it
//! reaches a terminal outcome (ack or poison), then cleanup is
//! best-effort.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use ulid::Ulid;

use crate::error::PumpError;
use crate::ports::BlobStore;

/// Default inline size limit: the backing queue's 64 KiB message cap
/// minus headroom for envelope metadata and transport encoding.
pub const DEFAULT_MAX_INLINE_BYTES: usize = 48 * 1024;

/// Pointer envelope enqueued in place of an oversized payload.
///
/// Strict-parsed (`deny_unknown_fields`) so arbitrary inline payloads
/// pass through untouched. An inline payload that is *exactly* this
/// JSON shape would be misread as a pointer; producers of such payloads
/// must wrap them.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverflowPointer {
    overflow_blob_key: String,
}

/// Encodes payloads for enqueue and resolves message bodies on receipt.
pub struct OverflowCodec {
    blob_store: Arc<dyn BlobStore>,
    max_inline_bytes: usize,
}

impl OverflowCodec {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self::with_max_inline_bytes(blob_store, DEFAULT_MAX_INLINE_BYTES)
    }

    pub fn with_max_inline_bytes(blob_store: Arc<dyn BlobStore>, max_inline_bytes: usize) -> Self {
        Self {
            blob_store,
            max_inline_bytes,
        }
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }

    /// Send side: payloads at or under the limit pass through
    /// byte-identical; oversized payloads are spilled and replaced by a
    /// pointer envelope.
    pub async fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, PumpError> {
        if payload.len() <= self.max_inline_bytes {
            return Ok(payload.to_vec());
        }

        let key = Ulid::new().to_string();
        self.blob_store
            .put(&key, payload)
            .await
            .map_err(|e| PumpError::Overflow(format!("storing payload under {key}: {e}")))?;

        let pointer = OverflowPointer {
            overflow_blob_key: key,
        };
        serde_json::to_vec(&pointer).map_err(|e| PumpError::Overflow(e.to_string()))
    }

    /// Receive side: if the body is a pointer, fetch the blob and
    /// substitute its bytes as the resolved content. Returns the
    /// resolved bytes and the overflow key, if one was involved.
    pub async fn resolve(&self, body: &[u8]) -> Result<(Vec<u8>, Option<String>), PumpError> {
        let Ok(pointer) = serde_json::from_slice::<OverflowPointer>(body) else {
            return Ok((body.to_vec(), None));
        };

        let key = pointer.overflow_blob_key;
        let content = self
            .blob_store
            .get(&key)
            .await
            .map_err(|e| PumpError::Overflow(format!("resolving payload from {key}: {e}")))?;

        Ok((content, Some(key)))
    }

    /// Terminal-outcome cleanup. Best-effort: a failed delete leaves an
    /// orphaned blob behind, which is logged and otherwise ignored — it
    /// must never fail the acknowledgment.
    pub async fn cleanup(&self, overflow_key: Option<&str>) {
        let Some(key) = overflow_key else {
            return;
        };
        if let Err(e) = self.blob_store.delete(key).await {
            warn!(key, error = %e, "failed to delete overflow blob");
        }
    }
}
