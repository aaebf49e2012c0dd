//! In-memory implementations of the ports. Dev and test backends; the
//! lease semantics match what a durable queue backend provides.

mod inmem_blob;
mod inmem_queue;

pub use inmem_blob::InMemoryBlobStore;
pub use inmem_queue::InMemoryQueueClient;
