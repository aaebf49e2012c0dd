//! MetricsSink port: counters, timers, and gauges.
//!
//! Observability is side-effecting but never correctness-relevant:
//! absence of a sink degrades to no-ops, not failures, so nothing here
//! returns a `Result`.

use std::time::Duration;

/// Metric names emitted by the pump.
pub mod metric {
    /// Counter: messages processed to successful acknowledgment.
    pub const MESSAGES_PROCESSED: &str = "messages_processed";

    /// Timer: duration of one message-hook invocation.
    pub const MESSAGE_PROCESSING_TIME: &str = "message_processing_time";

    /// Timer: duration of one fetch call.
    pub const MESSAGE_FETCH_TIME: &str = "message_fetch_time";

    /// Counter: fetches that found the queue empty.
    pub const QUEUE_EMPTY_COUNT: &str = "queue_empty_count";

    /// Gauge: approximate number of messages waiting in the queue.
    pub const QUEUED_MESSAGES_APPROX: &str = "queued_messages_approx";
}

/// Sink for the pump's counters, timers, and gauges.
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &str, value: u64);

    fn record_timer(&self, name: &str, elapsed: Duration);

    fn record_gauge(&self, name: &str, value: f64);

    /// Whether emitting is worthwhile. The pump skips metrics that cost
    /// an extra backend call (the queue-depth gauge) when this is false.
    fn enabled(&self) -> bool {
        true
    }
}

/// The default sink: discards everything.
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn incr_counter(&self, _name: &str, _value: u64) {}

    fn record_timer(&self, _name: &str, _elapsed: Duration) {}

    fn record_gauge(&self, _name: &str, _value: f64) {}

    fn enabled(&self) -> bool {
        false
    }
}
