use async_trait::async_trait;
use lapin::Channel;
use lapin::Connection;
use lapin::ConnectionProperties;
use lapin::ExchangeKind;
use lapin::options::BasicAckOptions;
use lapin::options::BasicConsumeOptions;
use lapin::options::BasicPublishOptions;
use lapin::options::ExchangeDeclareOptions;
use lapin::options::QueueBindOptions;
use lapin::options::QueueDeclareOptions;
use lapin::types::FieldTable;
use tokio_stream::StreamExt;

use crate::Consumer;
use crate::EventBus;
use crate::EventBusError;
use crate::IncomingMessage;
use crate::EXCHANGE;
use crate::QUEUE_ANOMALY_REQUESTS;
use crate::QUEUE_ANOMALY_RESULTS;
use crate::ROUTING_KEY_ANOMALIES_DETECTED;
use crate::ROUTING_KEY_TRANSACTIONS_NEW;

/// AMQP-backed event bus. Declares the full topology idempotently on
/// connect so repeated restarts never fail on "already exists".
pub struct RabbitEventBus {
    channel: Channel,
}

impl RabbitEventBus {
    pub async fn connect(amqp_url: &str) -> Result<Self, EventBusError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(|err| EventBusError::Connection(err.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|err| EventBusError::Connection(err.to_string()))?;

        channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|err| EventBusError::Connection(err.to_string()))?;

        for (queue, routing_key) in [
            (QUEUE_ANOMALY_REQUESTS, ROUTING_KEY_TRANSACTIONS_NEW),
            (QUEUE_ANOMALY_RESULTS, ROUTING_KEY_ANOMALIES_DETECTED),
        ] {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..QueueDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|err| EventBusError::Connection(err.to_string()))?;
            channel
                .queue_bind(
                    queue,
                    EXCHANGE,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|err| EventBusError::Connection(err.to_string()))?;
        }

        Ok(Self { channel })
    }
}

struct LapinConsumer(lapin::Consumer);

#[async_trait]
impl Consumer for LapinConsumer {
    async fn next(&mut self) -> Option<IncomingMessage> {
        let delivery = self.0.next().await?.ok()?;
        let payload = serde_json::from_slice(&delivery.data).ok()?;
        Some(IncomingMessage::new(payload, move || {
            tokio::spawn(async move {
                if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(%err, "failed to ack delivery");
                }
            });
        }))
    }
}

#[async_trait]
impl EventBus for RabbitEventBus {
    async fn publish(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventBusError> {
        let body = serde_json::to_vec(&payload)
            .map_err(|err| EventBusError::Publish(err.to_string()))?;
        self.channel
            .basic_publish(
                EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                lapin::BasicProperties::default(),
            )
            .await
            .map_err(|err| EventBusError::Publish(err.to_string()))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn Consumer>, EventBusError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                "vantage-consumer",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|err| EventBusError::Connection(err.to_string()))?;
        Ok(Box::new(LapinConsumer(consumer)))
    }
}
