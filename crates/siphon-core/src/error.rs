use thiserror::Error;

/// Crate-wide error type.
///
/// Fatal errors only ever occur at configuration/start time; everything
/// else flows through the retry/poison machinery and never escapes a
/// worker loop.
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("invalid pump configuration: {0}")]
    Configuration(String),

    /// The queue could not be reached or the fetch call failed.
    /// Retried with backoff, never fatal.
    #[error("queue fetch failed: {0}")]
    Fetch(String),

    /// A non-fetch queue operation (delete, enqueue, create, clear) failed.
    #[error("queue operation failed: {0}")]
    Queue(String),

    /// Blob read/write failed while storing or resolving an oversized
    /// payload. Treated as a processing failure for the affected message.
    #[error("overflow blob store operation failed: {0}")]
    Overflow(String),

    /// The message hook (or a typed handler) reported a failure.
    #[error("message processing failed: {0}")]
    Processing(String),

    /// The resolved content could not be parsed as a typed envelope.
    #[error("failed to decode message envelope: {0}")]
    Decode(String),

    #[error("no handler registered for message type {0:?}")]
    HandlerNotFound(String),

    #[error("handler already registered for message type {0:?}")]
    DuplicateHandler(String),
}

impl PumpError {
    /// Shorthand for handler code reporting an application-level failure.
    pub fn processing(message: impl Into<String>) -> Self {
        PumpError::Processing(message.into())
    }
}
