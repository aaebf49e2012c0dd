//! Handler registry: one handler per message-type discriminator.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::message::TypedMessage;
use crate::error::PumpError;

/// Registered handlers keyed by discriminator.
///
/// Populated before the pump starts and never mutated after; the
/// dispatcher only reads it. A duplicate registration is rejected
/// deterministically instead of silently replacing the earlier handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn DynHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<M: TypedMessage, H: Handler<M> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), PumpError> {
        if self.handlers.contains_key(M::TYPE) {
            return Err(PumpError::DuplicateHandler(M::TYPE.to_string()));
        }
        self.handlers
            .insert(M::TYPE, Arc::new(TypedHandler::new(handler)));
        Ok(())
    }

    pub fn get(&self, message_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(message_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::PumpHandle;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        value: u32,
    }

    impl TypedMessage for Ping {
        const TYPE: &'static str = "ping.v1";
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Pong {
        value: u32,
    }

    impl TypedMessage for Pong {
        const TYPE: &'static str = "pong.v1";
    }

    struct NoopHandler;

    #[async_trait]
    impl Handler<Ping> for NoopHandler {
        async fn handle(&self, _message: Ping, _handle: &PumpHandle) -> Result<(), PumpError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Handler<Pong> for NoopHandler {
        async fn handle(&self, _message: Pong, _handle: &PumpHandle) -> Result<(), PumpError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Ping, _>(NoopHandler).unwrap();

        assert!(registry.get(Ping::TYPE).is_some());
        assert!(registry.get("unknown.v1").is_none());
        assert_eq!(registry.registered_types(), vec![Ping::TYPE]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Ping, _>(NoopHandler).unwrap();

        let err = registry.register::<Ping, _>(NoopHandler).unwrap_err();
        assert!(matches!(err, PumpError::DuplicateHandler(_)));
    }

    #[test]
    fn distinct_types_coexist() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Ping, _>(NoopHandler).unwrap();
        registry.register::<Pong, _>(NoopHandler).unwrap();

        assert!(registry.get(Ping::TYPE).is_some());
        assert!(registry.get(Pong::TYPE).is_some());
    }
}
