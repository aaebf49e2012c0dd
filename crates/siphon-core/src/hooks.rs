//! Hook traits: the caller-supplied processing surface.
//!
//! Hooks are set once on the builder, validated at `start()`, and never
//! mutated mid-run. Each receives the [`PumpHandle`] as its cancellation
//! signal; a hook may also call [`PumpHandle::stop`] to shut the pump
//! down from inside an invocation.
//!
//! Fault isolation: a hook failure is a `Result` error and affects only
//! the message currently being processed, never other workers or the
//! pump's lifecycle.

use async_trait::async_trait;

use crate::error::PumpError;
use crate::message::{QueueMessage, ResolvedMessage};
use crate::pump::PumpHandle;

/// Required hook: processes one resolved message.
///
/// Returning `Ok` acknowledges the message (it is deleted). Returning
/// `Err` is the normal processing-failure path: the error is classified
/// as retryable or poison by the message's dequeue count.
///
/// May be arbitrarily long-running; cancellation is cooperative and the
/// pump never aborts an in-flight invocation, so long handlers should
/// poll `handle.is_cancelled()` themselves. Delivery is at-least-once:
/// implementations must tolerate duplicates.
#[async_trait]
pub trait MessageHook: Send + Sync {
    async fn on_message(
        &self,
        message: &ResolvedMessage,
        handle: &PumpHandle,
    ) -> Result<(), PumpError>;
}

/// Optional hook: invoked whenever a fetch finds the queue empty.
/// Errors are logged and ignored; they never abort the worker.
///
/// The usual place to call `handle.stop()` in drain-then-exit setups.
#[async_trait]
pub trait QueueEmptyHook: Send + Sync {
    async fn on_queue_empty(&self, handle: &PumpHandle) -> Result<(), PumpError>;
}

/// Optional hook: observes failures.
///
/// `message` is `None` for transient fetch errors (no message in hand).
/// `is_poison` is true when the failure was terminal: the message's
/// dequeue count exceeded the retry budget and it is about to be
/// deleted rather than redelivered.
#[async_trait]
pub trait ErrorHook: Send + Sync {
    async fn on_error(&self, message: Option<&QueueMessage>, error: &PumpError, is_poison: bool);
}
