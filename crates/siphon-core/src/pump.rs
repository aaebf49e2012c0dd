//! The message pump: a fixed pool of worker loops draining one queue.
//!
//! Each worker independently fetches a batch, resolves overflow
//! pointers, invokes the message hook, and acknowledges or leaves the
//! message according to the retry/poison rules. Lifecycle is published
//! on a watch channel (`Idle → Running → Stopping → Stopped`); shutdown
//! is cooperative and never aborts an in-flight hook invocation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::config::PumpConfig;
use crate::error::PumpError;
use crate::hooks::{ErrorHook, MessageHook, QueueEmptyHook};
use crate::message::{QueueMessage, ResolvedMessage};
use crate::overflow::OverflowCodec;
use crate::ports::{BlobStore, MetricsSink, NoopMetricsSink, QueueClient, metric};

tokio::task_local! {
    /// Set on every worker task. Lets [`PumpHandle::stop`] detect that
    /// it is running inside a hook on a worker task, where waiting for
    /// the workers to finish would deadlock on the caller itself.
    static PUMP_WORKER: ();
}

/// Pump lifecycle state.
///
/// `Idle` until `start()`, `Stopping` once a stop has been requested,
/// `Stopped` once every worker has exited. Terminal; a pump is not
/// restartable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Cancellation signal and stop surface handed to hooks.
///
/// Cloneable and cheap; every clone observes the same pump. A hook that
/// wants the pump to wind down calls [`stop`](PumpHandle::stop) or
/// [`request_stop`](PumpHandle::request_stop) on the handle it was
/// given.
#[derive(Clone)]
pub struct PumpHandle {
    shutdown_tx: watch::Sender<bool>,
    state_tx: watch::Sender<PumpState>,
    stop_requested: Arc<AtomicBool>,
}

impl PumpHandle {
    pub fn state(&self) -> PumpState {
        *self.state_tx.borrow()
    }

    /// Whether a stop has been signalled. Long-running hooks should
    /// poll this and return early when it turns true.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Resolves when a stop is signalled. Suitable for `tokio::select!`
    /// inside a hook.
    pub async fn cancelled(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Signal the pump to stop without waiting for workers to finish.
    /// Idempotent and thread-safe.
    pub fn request_stop(&self) {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state_tx.send_if_modified(|state| {
            if *state == PumpState::Running {
                *state = PumpState::Stopping;
                true
            } else {
                false
            }
        });
        self.shutdown_tx.send_replace(true);
        info!("pump stop requested");
    }

    /// Signal the pump to stop and wait until every worker has exited.
    ///
    /// Safe to call from anywhere, including from inside a hook: when
    /// the caller is itself a worker task, waiting would deadlock, so
    /// this returns right after signalling and the workers wind down on
    /// their own. Before `start()` (state `Idle`) it returns
    /// immediately after signalling.
    pub async fn stop(&self) {
        self.request_stop();
        if PUMP_WORKER.try_with(|_| ()).is_ok() {
            return;
        }
        if matches!(self.state(), PumpState::Idle | PumpState::Stopped) {
            return;
        }
        let mut rx = self.state_tx.subscribe();
        let _ = rx.wait_for(|state| *state == PumpState::Stopped).await;
    }
}

#[cfg(test)]
impl PumpHandle {
    /// Handle wired to nothing, for exercising hooks outside a pump.
    pub(crate) fn detached() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(PumpState::Idle);
        Self {
            shutdown_tx,
            state_tx,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Builder for [`MessagePump`]. Hooks, metrics, and backoff are set
/// here; `build()` is the fail-fast validation point.
pub struct MessagePumpBuilder {
    config: PumpConfig,
    queue: Arc<dyn QueueClient>,
    blob_store: Arc<dyn BlobStore>,
    metrics: Arc<dyn MetricsSink>,
    backoff: BackoffPolicy,
    on_message: Option<Arc<dyn MessageHook>>,
    on_queue_empty: Option<Arc<dyn QueueEmptyHook>>,
    on_error: Option<Arc<dyn ErrorHook>>,
}

impl MessagePumpBuilder {
    pub fn new(
        config: PumpConfig,
        queue: Arc<dyn QueueClient>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            queue,
            blob_store,
            metrics: Arc::new(NoopMetricsSink),
            backoff: BackoffPolicy::default(),
            on_message: None,
            on_queue_empty: None,
            on_error: None,
        }
    }

    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Required. The pump refuses to build without one.
    pub fn on_message(mut self, hook: impl MessageHook + 'static) -> Self {
        self.on_message = Some(Arc::new(hook));
        self
    }

    pub fn on_queue_empty(mut self, hook: impl QueueEmptyHook + 'static) -> Self {
        self.on_queue_empty = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<MessagePump, PumpError> {
        self.config.validate()?;
        let on_message = self.on_message.ok_or_else(|| {
            PumpError::Configuration("a message hook is required".to_string())
        })?;

        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(PumpState::Idle);
        let handle = PumpHandle {
            shutdown_tx,
            state_tx,
            stop_requested: Arc::new(AtomicBool::new(false)),
        };

        Ok(MessagePump {
            inner: Arc::new(Inner {
                config: self.config,
                queue: self.queue,
                codec: OverflowCodec::new(self.blob_store),
                metrics: self.metrics,
                backoff: self.backoff,
                on_message,
                on_queue_empty: self.on_queue_empty,
                on_error: self.on_error,
                handle,
                started: AtomicBool::new(false),
            }),
        })
    }
}

struct Inner {
    config: PumpConfig,
    queue: Arc<dyn QueueClient>,
    codec: OverflowCodec,
    metrics: Arc<dyn MetricsSink>,
    backoff: BackoffPolicy,
    on_message: Arc<dyn MessageHook>,
    on_queue_empty: Option<Arc<dyn QueueEmptyHook>>,
    on_error: Option<Arc<dyn ErrorHook>>,
    handle: PumpHandle,
    started: AtomicBool,
}

/// A concurrent consumer over one queue.
pub struct MessagePump {
    inner: Arc<Inner>,
}

impl MessagePump {
    /// Cancellation handle, independently cloneable. The same handle is
    /// passed to every hook invocation.
    pub fn handle(&self) -> PumpHandle {
        self.inner.handle.clone()
    }

    pub fn state(&self) -> PumpState {
        self.inner.handle.state()
    }

    /// Run the pump until stopped. Blocks for the pump's whole
    /// lifetime; the final `Stopped` transition happens here, exactly
    /// once, after every worker has exited.
    ///
    /// Errors only before any worker is spawned: on a second start or
    /// when the queue/blob backends cannot be provisioned.
    pub async fn start(&self) -> Result<(), PumpError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(PumpError::Configuration(
                "pump already started".to_string(),
            ));
        }

        if let Err(err) = self.provision().await {
            self.inner.handle.state_tx.send_replace(PumpState::Stopped);
            return Err(err);
        }

        self.inner.handle.state_tx.send_if_modified(|state| {
            if *state == PumpState::Idle {
                *state = PumpState::Running;
                true
            } else {
                false
            }
        });
        info!(
            queue = %self.inner.config.queue_name,
            concurrency = self.inner.config.concurrency,
            "pump started"
        );

        let mut joins = Vec::with_capacity(self.inner.config.concurrency);
        for worker_id in 0..self.inner.config.concurrency {
            let inner = Arc::clone(&self.inner);
            joins.push(tokio::spawn(PUMP_WORKER.scope((), async move {
                let mut shutdown_rx = inner.handle.shutdown_tx.subscribe();
                Worker { id: worker_id, inner }.run(&mut shutdown_rx).await;
            })));
        }
        for join in joins {
            let _ = join.await;
        }

        self.inner.handle.state_tx.send_replace(PumpState::Stopped);
        info!(queue = %self.inner.config.queue_name, "pump stopped");
        Ok(())
    }

    async fn provision(&self) -> Result<(), PumpError> {
        self.inner.queue.create_if_not_exists().await?;
        self.inner.codec.blob_store().create_if_not_exists().await?;
        Ok(())
    }

    /// Signal a stop and wait for the pump to finish. See
    /// [`PumpHandle::stop`].
    pub async fn stop(&self) {
        self.inner.handle.stop().await;
    }
}

struct Worker {
    id: usize,
    inner: Arc<Inner>,
}

impl Worker {
    async fn run(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        // Consecutive fetches that yielded no work; drives the backoff.
        let mut idle_attempts: u32 = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let fetch_started = Instant::now();
            let fetched = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                result = self.inner.queue.fetch_batch(
                    self.inner.config.max_messages_per_fetch,
                    self.inner.config.visibility_timeout,
                ) => result,
            };

            let batch = match fetched {
                Ok(batch) => {
                    self.inner
                        .metrics
                        .record_timer(metric::MESSAGE_FETCH_TIME, fetch_started.elapsed());
                    batch
                }
                Err(err) => {
                    warn!(worker = self.id, error = %err, "fetch failed");
                    if let Some(hook) = &self.inner.on_error {
                        hook.on_error(None, &err, false).await;
                    }
                    idle_attempts = idle_attempts.saturating_add(1);
                    self.pause(shutdown_rx, idle_attempts).await;
                    continue;
                }
            };

            if batch.is_empty() {
                self.inner.metrics.incr_counter(metric::QUEUE_EMPTY_COUNT, 1);
                if let Some(hook) = &self.inner.on_queue_empty {
                    if let Err(err) = hook.on_queue_empty(&self.inner.handle).await {
                        warn!(worker = self.id, error = %err, "queue-empty hook failed");
                    }
                }
                idle_attempts = idle_attempts.saturating_add(1);
                self.pause(shutdown_rx, idle_attempts).await;
                continue;
            }

            idle_attempts = 0;
            self.emit_queue_depth().await;

            for message in batch {
                if *shutdown_rx.borrow() {
                    // Remaining leases expire and the messages redeliver.
                    break;
                }
                self.process_one(message).await;
            }
        }

        debug!(worker = self.id, "worker exited");
    }

    /// Backoff sleep, cut short by a shutdown signal.
    async fn pause(&self, shutdown_rx: &mut watch::Receiver<bool>, attempt: u32) {
        let delay = self.inner.backoff.jittered_delay_for(attempt);
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    /// Queue-depth gauge. Costs an extra backend call, so skipped when
    /// metrics are off.
    async fn emit_queue_depth(&self) {
        if !self.inner.metrics.enabled() {
            return;
        }
        match self.inner.queue.approximate_message_count().await {
            Ok(Some(count)) => self
                .inner
                .metrics
                .record_gauge(metric::QUEUED_MESSAGES_APPROX, count as f64),
            Ok(None) => {}
            Err(err) => debug!(worker = self.id, error = %err, "queue depth unavailable"),
        }
    }

    async fn process_one(&self, message: QueueMessage) {
        let (content, overflow_key) = match self.inner.codec.resolve(&message.body).await {
            Ok(resolved) => resolved,
            Err(err) => {
                self.handle_failure(&message, &err, None).await;
                return;
            }
        };
        let resolved = ResolvedMessage {
            message,
            content,
            overflow_key,
        };

        let started = Instant::now();
        let result = self
            .inner
            .on_message
            .on_message(&resolved, &self.inner.handle)
            .await;
        self.inner
            .metrics
            .record_timer(metric::MESSAGE_PROCESSING_TIME, started.elapsed());

        match result {
            Ok(()) => {
                let delete = self
                    .inner
                    .queue
                    .delete_message(&resolved.message.id, &resolved.message.lease_token)
                    .await;
                if let Err(err) = delete {
                    // The lease will expire and the message redeliver;
                    // handlers already tolerate duplicates.
                    warn!(
                        worker = self.id,
                        id = %resolved.message.id,
                        error = %err,
                        "delete after successful processing failed"
                    );
                    return;
                }
                self.inner.metrics.incr_counter(metric::MESSAGES_PROCESSED, 1);
                self.inner
                    .codec
                    .cleanup(resolved.overflow_key.as_deref())
                    .await;
            }
            Err(err) => {
                self.handle_failure(&resolved.message, &err, resolved.overflow_key.as_deref())
                    .await;
            }
        }
    }

    /// Retry/poison classification for a failed message.
    ///
    /// Poison (delivered more times than the retry budget allows) is
    /// deleted so it cannot wedge the queue; anything else is simply
    /// left for its lease to expire and the queue to redeliver.
    async fn handle_failure(
        &self,
        message: &QueueMessage,
        error: &PumpError,
        overflow_key: Option<&str>,
    ) {
        let is_poison = message.dequeue_count > self.inner.config.max_dequeue_attempts;

        if let Some(hook) = &self.inner.on_error {
            hook.on_error(Some(message), error, is_poison).await;
        }

        if is_poison {
            warn!(
                worker = self.id,
                id = %message.id,
                dequeue_count = message.dequeue_count,
                error = %error,
                "poison message, removing from queue"
            );
            match self
                .inner
                .queue
                .delete_message(&message.id, &message.lease_token)
                .await
            {
                Ok(()) => self.inner.codec.cleanup(overflow_key).await,
                Err(delete_err) => warn!(
                    worker = self.id,
                    id = %message.id,
                    error = %delete_err,
                    "poison delete failed"
                ),
            }
        } else {
            debug!(
                worker = self.id,
                id = %message.id,
                dequeue_count = message.dequeue_count,
                error = %error,
                "processing failed, message left for redelivery"
            );
        }
    }
}
