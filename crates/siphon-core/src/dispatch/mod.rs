//! Typed dispatch: route messages to handlers by a type discriminator.
//!
//! Producers wrap a serializable message in a [`TypedEnvelope`] carrying
//! its discriminator; the [`MessageDispatcher`] parses the envelope on
//! receipt and routes it to the one handler registered for that
//! discriminator. Dispatch adds no concurrency or retry semantics of
//! its own: it is just a [`MessageHook`](crate::hooks::MessageHook), and
//! its failures flow through the same retry/poison machinery as any
//! other processing failure.

mod dispatcher;
mod handler;
mod message;
mod registry;

pub use dispatcher::MessageDispatcher;
pub use handler::{DynHandler, Handler, TypedHandler};
pub use message::{TypedEnvelope, TypedMessage, envelope_bytes};
pub use registry::HandlerRegistry;
