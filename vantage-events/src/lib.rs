#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use thiserror::Error;

mod in_memory;
mod noop;
mod rabbit;

pub use in_memory::InMemoryEventBus;
pub use noop::NoopEventBus;
pub use rabbit::RabbitEventBus;

pub const EXCHANGE: &str = "finance.exchange";
pub const QUEUE_ANOMALY_REQUESTS: &str = "ai.anomaly.queue";
pub const QUEUE_ANOMALY_RESULTS: &str = "ai.anomaly.results";
pub const ROUTING_KEY_TRANSACTIONS_NEW: &str = "transactions.new";
pub const ROUTING_KEY_ANOMALIES_DETECTED: &str = "anomalies.detected";

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("broker connection failed: {0}")]
    Connection(String),
    #[error("publish failed: {0}")]
    Publish(String),
}

/// A delivered message. The anomaly loop's accept-and-drop policy always
/// acks after processing, success or failure, so `ack` takes `self` by
/// value rather than exposing a separate nack path.
pub struct IncomingMessage {
    pub payload: serde_json::Value,
    ack: Box<dyn FnOnce() + Send>,
}

impl IncomingMessage {
    #[must_use]
    pub fn new(payload: serde_json::Value, ack: impl FnOnce() + Send + 'static) -> Self {
        Self {
            payload,
            ack: Box::new(ack),
        }
    }

    pub fn ack(self) {
        (self.ack)();
    }
}

#[async_trait]
pub trait Consumer: Send {
    async fn next(&mut self) -> Option<IncomingMessage>;
}

/// Topology is declared idempotently at construction time by each concrete
/// adapter; this trait only covers the publish/consume surface the rest of
/// the system needs.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventBusError>;

    async fn consume(&self, queue: &str) -> Result<Box<dyn Consumer>, EventBusError>;
}
