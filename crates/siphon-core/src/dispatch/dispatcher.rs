//! The dispatcher: a [`MessageHook`] that routes by envelope type.

use async_trait::async_trait;
use tracing::debug;

use super::message::TypedEnvelope;
use super::registry::HandlerRegistry;
use crate::error::PumpError;
use crate::hooks::MessageHook;
use crate::message::ResolvedMessage;
use crate::pump::PumpHandle;

/// Routes each resolved message to the handler registered for its
/// envelope's discriminator.
///
/// An unparseable envelope or an unregistered type is an ordinary
/// processing failure: the message is retried and eventually poisoned
/// like any other, which keeps one bad producer from wedging a worker.
pub struct MessageDispatcher {
    registry: HandlerRegistry,
}

impl MessageDispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessageHook for MessageDispatcher {
    async fn on_message(
        &self,
        message: &ResolvedMessage,
        handle: &PumpHandle,
    ) -> Result<(), PumpError> {
        let envelope: TypedEnvelope = serde_json::from_slice(&message.content)
            .map_err(|e| PumpError::Decode(e.to_string()))?;

        let handler = self
            .registry
            .get(&envelope.message_type)
            .ok_or_else(|| PumpError::HandlerNotFound(envelope.message_type.clone()))?;

        debug!(id = %message.message.id, message_type = %envelope.message_type, "dispatching");
        handler.handle_dyn(envelope.payload, handle).await
    }
}
