#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use vantage_anomaly::AnomalyStore;
use vantage_anomaly::NewAnomaly;
use vantage_events::EventBus;
use vantage_events::QUEUE_ANOMALY_RESULTS;
use vantage_notify::AnomalySummary;
use vantage_notify::Notifier;

#[derive(Debug, Deserialize)]
struct IncomingAnomaly {
    #[serde(default)]
    id: Option<String>,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(rename = "companyId")]
    company_id: String,
    #[serde(default)]
    anomalies: Vec<IncomingAnomaly>,
}

/// Resolves a company to the owner's display name and email so the loop can
/// notify without depending on the tenancy store's full surface.
pub trait OwnerLookup: Send + Sync {
    fn resolve(&self, company_id: &str) -> Option<(String, String)>;
}

/// Long-lived consumer of `ai.anomaly.results`. Follows an accept-and-drop
/// error policy: any failure while handling a message is logged, and the
/// message is still acked — favoring availability over retrying, per the
/// documented trade-off. Duplicate delivery therefore produces duplicate
/// anomaly rows, which is accepted rather than guarded against.
pub struct AnomalyLoop {
    events: Arc<dyn EventBus>,
    anomalies: Arc<dyn AnomalyStore>,
    notifier: Arc<dyn Notifier>,
    owners: Arc<dyn OwnerLookup>,
}

impl AnomalyLoop {
    #[must_use]
    pub fn new(
        events: Arc<dyn EventBus>,
        anomalies: Arc<dyn AnomalyStore>,
        notifier: Arc<dyn Notifier>,
        owners: Arc<dyn OwnerLookup>,
    ) -> Self {
        Self {
            events,
            anomalies,
            notifier,
            owners,
        }
    }

    /// Runs until the underlying queue closes. Intended to be spawned as its
    /// own task; shutdown drains the in-flight message and then stops.
    pub async fn run(self) {
        let mut consumer = match self.events.consume(QUEUE_ANOMALY_RESULTS).await {
            Ok(consumer) => consumer,
            Err(err) => {
                tracing::warn!(%err, "anomaly loop could not start consuming, exiting");
                return;
            }
        };

        while let Some(message) = consumer.next().await {
            self.handle(message.payload.clone()).await;
            message.ack();
        }
    }

    async fn handle(&self, payload: serde_json::Value) {
        let parsed: IncomingMessage = match serde_json::from_value(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(%err, "dropping malformed anomaly message");
                return;
            }
        };

        if parsed.anomalies.is_empty() {
            return;
        }

        let mut summaries = Vec::with_capacity(parsed.anomalies.len());
        for entry in parsed.anomalies {
            let result = self
                .anomalies
                .insert(NewAnomaly {
                    company_id: parsed.company_id.clone(),
                    transaction_id: entry.id.clone(),
                    amount: entry.amount,
                })
                .await;
            match result {
                Ok(row) => summaries.push(AnomalySummary {
                    id: Some(row.id),
                    amount: row.amount,
                }),
                Err(err) => tracing::warn!(%err, company_id = parsed.company_id, "failed to persist anomaly"),
            }
        }

        if summaries.is_empty() {
            return;
        }

        let Some((company_name, owner_email)) = self.owners.resolve(&parsed.company_id) else {
            tracing::warn!(company_id = parsed.company_id, "could not resolve owner, skipping notification");
            return;
        };
        self.notifier.notify(&owner_email, &company_name, &summaries).await;
    }
}
