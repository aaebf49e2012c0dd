//! siphon-core
//!
//! A concurrent consumer engine for durable, at-least-once message
//! queues.
//!
//! # Module layout
//! - **config**: pump configuration and validation
//! - **message**: ids, the raw queue message, the resolved view
//! - **ports**: abstraction layer (QueueClient, BlobStore, MetricsSink)
//! - **hooks**: caller-supplied processing surface (message, queue-empty, error)
//! - **pump**: the worker pool, lifecycle, and retry/poison machinery
//! - **overflow**: transparent blob spill for oversized payloads
//! - **dispatch**: typed routing (TypedMessage, Handler, HandlerRegistry)
//! - **backoff**: empty-queue/fetch-error wait policy
//! - **impls**: in-memory port implementations for dev and tests

pub mod backoff;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod impls;
pub mod message;
pub mod overflow;
pub mod ports;
pub mod pump;

pub use backoff::BackoffPolicy;
pub use config::PumpConfig;
pub use error::PumpError;
pub use hooks::{ErrorHook, MessageHook, QueueEmptyHook};
pub use message::{LeaseToken, MessageId, QueueMessage, ResolvedMessage};
pub use overflow::OverflowCodec;
pub use pump::{MessagePump, MessagePumpBuilder, PumpHandle, PumpState};
