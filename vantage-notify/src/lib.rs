#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub const SIMULATED_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalySummary {
    pub id: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

fn render(company_name: &str, anomalies: &[AnomalySummary]) -> (String, String) {
    let subject = format!("{} anomalies detected for {company_name}", anomalies.len());
    let mut body = format!("The following anomalies were detected for {company_name}:\n");
    for anomaly in anomalies {
        body.push_str(&format!("- amount {}\n", anomaly.amount));
    }
    (subject, body)
}

/// Best-effort owner notification. The real mail relay is an external
/// collaborator out of scope here; this trait covers templated message
/// construction and the hand-off point to it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient_email: &str, company_name: &str, anomalies: &[AnomalySummary]);
}

/// Selected when no mail relay is configured.
#[derive(Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _recipient_email: &str, _company_name: &str, _anomalies: &[AnomalySummary]) {}
}

/// Hands the rendered message off to a separate scheduling resource so the
/// anomaly loop never waits on mail I/O; the relay call itself is simulated
/// since the mail relay is an external collaborator.
#[derive(Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, recipient_email: &str, company_name: &str, anomalies: &[AnomalySummary]) {
        let (subject, body) = render(company_name, anomalies);
        let recipient_email = recipient_email.to_string();
        tokio::spawn(async move {
            let outcome = tokio::time::timeout(SIMULATED_RELAY_TIMEOUT, async {
                tracing::info!(recipient_email, subject, body, "sending anomaly notification");
            })
            .await;
            if outcome.is_err() {
                tracing::warn!(recipient_email, "mail relay hand-off timed out");
            }
        });
    }
}

/// Records every call for test assertions instead of sending anything.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient_email: &str, company_name: &str, anomalies: &[AnomalySummary]) {
        let (subject, body) = render(company_name, anomalies);
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Notification {
                recipient_email: recipient_email.to_string(),
                subject,
                body,
            });
    }
}
