use async_trait::async_trait;

use crate::Consumer;
use crate::EventBus;
use crate::EventBusError;
use crate::IncomingMessage;

/// Selected when no broker URL is configured. Publishes are logged no-ops;
/// consuming yields nothing, since there is nothing to consume from.
#[derive(Default)]
pub struct NoopEventBus;

impl NoopEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct EmptyConsumer;

#[async_trait]
impl Consumer for EmptyConsumer {
    async fn next(&mut self) -> Option<IncomingMessage> {
        std::future::pending::<()>().await;
        None
    }
}

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(
        &self,
        routing_key: &str,
        _payload: serde_json::Value,
    ) -> Result<(), EventBusError> {
        tracing::warn!(routing_key, "no event bus configured, dropping publish");
        Ok(())
    }

    async fn consume(&self, _queue: &str) -> Result<Box<dyn Consumer>, EventBusError> {
        Ok(Box::new(EmptyConsumer))
    }
}
