use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Consumer;
use crate::EventBus;
use crate::EventBusError;
use crate::IncomingMessage;
use crate::QUEUE_ANOMALY_REQUESTS;
use crate::QUEUE_ANOMALY_RESULTS;
use crate::ROUTING_KEY_ANOMALIES_DETECTED;
use crate::ROUTING_KEY_TRANSACTIONS_NEW;

struct Queue {
    sender: mpsc::UnboundedSender<serde_json::Value>,
    receiver: Option<mpsc::UnboundedReceiver<serde_json::Value>>,
}

/// Replays the real topology (`transactions.new` -> `ai.anomaly.queue`,
/// `anomalies.detected` -> `ai.anomaly.results`) over in-process channels so
/// the anomaly loop can be exercised end-to-end without a broker.
pub struct InMemoryEventBus {
    queues: Mutex<HashMap<&'static str, Queue>>,
    bindings: HashMap<&'static str, &'static str>,
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        let mut queues = HashMap::new();
        for name in [QUEUE_ANOMALY_REQUESTS, QUEUE_ANOMALY_RESULTS] {
            let (sender, receiver) = mpsc::unbounded_channel();
            queues.insert(
                name,
                Queue {
                    sender,
                    receiver: Some(receiver),
                },
            );
        }

        let mut bindings = HashMap::new();
        bindings.insert(ROUTING_KEY_TRANSACTIONS_NEW, QUEUE_ANOMALY_REQUESTS);
        bindings.insert(ROUTING_KEY_ANOMALIES_DETECTED, QUEUE_ANOMALY_RESULTS);

        Self {
            queues: Mutex::new(queues),
            bindings,
            published: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

struct ChannelConsumer(mpsc::UnboundedReceiver<serde_json::Value>);

#[async_trait]
impl Consumer for ChannelConsumer {
    async fn next(&mut self) -> Option<IncomingMessage> {
        let payload = self.0.recv().await?;
        Some(IncomingMessage::new(payload, || {}))
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventBusError> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((routing_key.to_string(), payload.clone()));

        if let Some(queue_name) = self.bindings.get(routing_key) {
            let queues = self.queues.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(queue) = queues.get(queue_name) {
                let _ = queue.sender.send(payload);
            }
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn Consumer>, EventBusError> {
        let mut queues = self.queues.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = queues
            .get_mut(queue)
            .ok_or_else(|| EventBusError::Connection(format!("unknown queue {queue}")))?;
        let receiver = entry
            .receiver
            .take()
            .ok_or_else(|| EventBusError::Connection(format!("queue {queue} already consumed")))?;
        Ok(Box::new(ChannelConsumer(receiver)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn publish_routes_to_bound_queue_and_is_recorded() {
        let bus = InMemoryEventBus::new();
        bus.publish(ROUTING_KEY_TRANSACTIONS_NEW, json!({"companyId": "c1", "txnIds": ["t1"]}))
            .await
            .expect("publish succeeds");

        let mut consumer = bus.consume(QUEUE_ANOMALY_REQUESTS).await.expect("consume succeeds");
        let message = consumer.next().await.expect("message delivered");
        assert_eq!(message.payload["companyId"], "c1");
        message.ack();

        assert_eq!(bus.published().len(), 1);
    }

    #[tokio::test]
    async fn consume_rejects_unknown_queue() {
        let bus = InMemoryEventBus::new();
        let err = match bus.consume("not-a-queue").await {
            Ok(_) => panic!("expected unknown queue to be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, EventBusError::Connection(_)));
    }
}
