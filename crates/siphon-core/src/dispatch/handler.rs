//! Handler traits and the type-erasure shim between them.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::message::TypedMessage;
use crate::error::PumpError;
use crate::pump::PumpHandle;

/// A typed handler: receives its one message type, already decoded.
///
/// `Handler<Ping>` can only ever see a `Ping`; the registry guarantees
/// the routing at compile time on the registration side and by
/// discriminator lookup on the receive side.
#[async_trait]
pub trait Handler<M: TypedMessage>: Send + Sync {
    async fn handle(&self, message: M, handle: &PumpHandle) -> Result<(), PumpError>;
}

/// Object-safe form of [`Handler`], so heterogeneous handlers can live
/// in one registry map.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        handle: &PumpHandle,
    ) -> Result<(), PumpError>;

    fn message_type(&self) -> &'static str;
}

/// Wraps a typed handler into a [`DynHandler`]: decodes the payload
/// into `M`, then delegates.
pub struct TypedHandler<M: TypedMessage, H: Handler<M>> {
    handler: H,
    _marker: PhantomData<fn(M)>,
}

impl<M: TypedMessage, H: Handler<M>> TypedHandler<M, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M: TypedMessage, H: Handler<M>> DynHandler for TypedHandler<M, H> {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        handle: &PumpHandle,
    ) -> Result<(), PumpError> {
        let message: M =
            serde_json::from_value(payload).map_err(|e| PumpError::Decode(e.to_string()))?;
        self.handler.handle(message, handle).await
    }

    fn message_type(&self) -> &'static str {
        M::TYPE
    }
}
