//! Ports: trait seams for the external collaborators.
//!
//! The pump never talks to a concrete queue or blob backend; it consumes
//! these traits. `crate::impls` provides in-memory implementations for
//! development and tests; production backends live in their own crates.

pub mod blob_store;
pub mod metrics_sink;
pub mod queue_client;

pub use self::blob_store::BlobStore;
pub use self::metrics_sink::{MetricsSink, NoopMetricsSink, metric};
pub use self::queue_client::QueueClient;
