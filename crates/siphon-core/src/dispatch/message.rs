//! The typed-message contract and its wire envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PumpError;

/// A message type routable by the dispatcher.
///
/// `TYPE` is the wire discriminator; it must be unique within a
/// registry and stable across producer and consumer deployments.
pub trait TypedMessage: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;
}

/// Wire form of a typed message: discriminator plus JSON payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct TypedEnvelope {
    pub message_type: String,
    pub payload: serde_json::Value,
}

/// Serialize a typed message into envelope bytes ready to enqueue.
pub fn envelope_bytes<M: TypedMessage>(message: &M) -> Result<Vec<u8>, PumpError> {
    let envelope = TypedEnvelope {
        message_type: M::TYPE.to_string(),
        payload: serde_json::to_value(message).map_err(|e| PumpError::Decode(e.to_string()))?,
    };
    serde_json::to_vec(&envelope).map_err(|e| PumpError::Decode(e.to_string()))
}
