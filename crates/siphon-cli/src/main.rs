//! End-to-end demo against the in-memory backends.
//!
//! Phase 1 pushes raw messages through a plain hook; phase 2 pushes
//! typed envelopes (one of them oversized, to exercise the overflow
//! spill) through the dispatcher. Both run the pump at concurrency 10
//! and stop once the queue drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use siphon_core::dispatch::{
    Handler, HandlerRegistry, MessageDispatcher, TypedMessage, envelope_bytes,
};
use siphon_core::impls::{InMemoryBlobStore, InMemoryQueueClient};
use siphon_core::ports::{MetricsSink, QueueClient};
use siphon_core::{
    MessageHook, MessagePumpBuilder, OverflowCodec, PumpConfig, PumpError, PumpHandle,
    QueueEmptyHook, ResolvedMessage,
};

const MESSAGE_COUNT: usize = 25;

/// Metrics sink that just logs. Stands in for a real exporter.
struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn incr_counter(&self, name: &str, value: u64) {
        debug!(metric = name, value, "counter");
    }

    fn record_timer(&self, name: &str, elapsed: Duration) {
        debug!(metric = name, ?elapsed, "timer");
    }

    fn record_gauge(&self, name: &str, value: f64) {
        debug!(metric = name, value, "gauge");
    }
}

struct StopWhenDrained {
    queue: Arc<InMemoryQueueClient>,
}

#[async_trait]
impl QueueEmptyHook for StopWhenDrained {
    async fn on_queue_empty(&self, handle: &PumpHandle) -> Result<(), PumpError> {
        // An empty fetch can race messages still leased by other
        // workers; only stop once the queue is truly drained.
        if self.queue.message_count() == 0 {
            handle.stop().await;
        }
        Ok(())
    }
}

struct RawHook {
    processed: Arc<AtomicUsize>,
}

#[async_trait]
impl MessageHook for RawHook {
    async fn on_message(
        &self,
        message: &ResolvedMessage,
        _handle: &PumpHandle,
    ) -> Result<(), PumpError> {
        let text = String::from_utf8_lossy(&message.content);
        debug!(id = %message.message.id, bytes = message.content.len(), %text, "raw message");
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    name: String,
    note: String,
}

impl TypedMessage for Greeting {
    const TYPE: &'static str = "demo.greeting.v1";
}

struct GreetingHandler {
    processed: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler<Greeting> for GreetingHandler {
    async fn handle(&self, message: Greeting, _handle: &PumpHandle) -> Result<(), PumpError> {
        debug!(name = %message.name, note_bytes = message.note.len(), "greeting handled");
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn demo_config() -> PumpConfig {
    let mut config = PumpConfig::new("demo-queue");
    config.concurrency = 10;
    config
}

async fn run_raw_phase() -> Result<(), PumpError> {
    let queue = Arc::new(InMemoryQueueClient::new());
    let blobs = Arc::new(InMemoryBlobStore::new());

    for i in 0..MESSAGE_COUNT {
        queue
            .enqueue_message(format!("raw message {i}").into_bytes())
            .await?;
    }

    let processed = Arc::new(AtomicUsize::new(0));
    let pump = MessagePumpBuilder::new(demo_config(), queue.clone(), blobs)
        .metrics(Arc::new(TracingMetrics))
        .on_message(RawHook {
            processed: processed.clone(),
        })
        .on_queue_empty(StopWhenDrained { queue })
        .build()?;

    let started = Instant::now();
    pump.start().await?;
    info!(
        processed = processed.load(Ordering::SeqCst),
        elapsed = ?started.elapsed(),
        "raw phase done"
    );
    Ok(())
}

async fn run_typed_phase() -> Result<(), PumpError> {
    let queue = Arc::new(InMemoryQueueClient::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let codec = OverflowCodec::new(blobs.clone());

    for i in 0..MESSAGE_COUNT {
        // The last greeting is oversized and spills to the blob store.
        let note = if i == MESSAGE_COUNT - 1 {
            "x".repeat(100_000)
        } else {
            format!("note {i}")
        };
        let bytes = envelope_bytes(&Greeting {
            name: format!("subscriber {i}"),
            note,
        })?;
        queue.enqueue_message(codec.encode(&bytes).await?).await?;
    }
    info!(spilled_blobs = blobs.len(), "typed messages enqueued");

    let processed = Arc::new(AtomicUsize::new(0));
    let mut registry = HandlerRegistry::new();
    registry.register::<Greeting, _>(GreetingHandler {
        processed: processed.clone(),
    })?;

    let pump = MessagePumpBuilder::new(demo_config(), queue.clone(), blobs.clone())
        .metrics(Arc::new(TracingMetrics))
        .on_message(MessageDispatcher::new(registry))
        .on_queue_empty(StopWhenDrained { queue })
        .build()?;

    let started = Instant::now();
    pump.start().await?;
    info!(
        processed = processed.load(Ordering::SeqCst),
        remaining_blobs = blobs.len(),
        elapsed = ?started.elapsed(),
        "typed phase done"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), PumpError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run_raw_phase().await?;
    run_typed_phase().await?;
    Ok(())
}
