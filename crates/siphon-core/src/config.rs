//! Pump configuration.

use std::time::Duration;

use crate::error::PumpError;

/// Configuration for a [`MessagePump`](crate::pump::MessagePump).
///
/// Immutable once the pump is built; the builder moves it in.
/// The metrics sink and backoff policy are builder options rather than
/// config fields so this stays plain data.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Name of the backing queue. Used for diagnostics only; the
    /// [`QueueClient`](crate::ports::QueueClient) is already bound to
    /// its queue.
    pub queue_name: String,

    /// Number of independent worker loops. Fixed for the pump's lifetime.
    pub concurrency: usize,

    /// Maximum number of messages requested per fetch.
    pub max_messages_per_fetch: u32,

    /// Lease duration requested on every fetch. Must exceed worst-case
    /// processing latency or duplicate delivery becomes likely.
    pub visibility_timeout: Duration,

    /// A message delivered more than this many times whose processing
    /// fails is poison: deleted instead of retried.
    pub max_dequeue_attempts: u32,
}

impl PumpConfig {
    /// Create a config with defaults matching typical queue-consumer
    /// deployments: 25 workers, batches of 10, 30s leases, 3 attempts.
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            concurrency: 25,
            max_messages_per_fetch: 10,
            visibility_timeout: Duration::from_secs(30),
            max_dequeue_attempts: 3,
        }
    }

    /// Fail-fast validation, run when the pump is built.
    pub fn validate(&self) -> Result<(), PumpError> {
        if self.concurrency < 1 {
            return Err(PumpError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_messages_per_fetch < 1 {
            return Err(PumpError::Configuration(
                "max_messages_per_fetch must be at least 1".to_string(),
            ));
        }
        if self.max_dequeue_attempts < 1 {
            return Err(PumpError::Configuration(
                "max_dequeue_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PumpConfig::new("myqueue");
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_name, "myqueue");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = PumpConfig::new("myqueue");
        config.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PumpError::Configuration(_)));
    }

    #[test]
    fn zero_fetch_batch_is_rejected() {
        let mut config = PumpConfig::new("myqueue");
        config.max_messages_per_fetch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_dequeue_attempts_is_rejected() {
        let mut config = PumpConfig::new("myqueue");
        config.max_dequeue_attempts = 0;
        assert!(config.validate().is_err());
    }
}
