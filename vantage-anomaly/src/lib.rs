#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

mod in_memory;

pub use in_memory::InMemoryAnomalyStore;

pub type CompanyId = String;
pub type TransactionId = String;
pub type AnomalyId = String;

pub type AnomalyResult<T> = Result<T, AnomalyError>;

#[derive(Debug, Error)]
pub enum AnomalyError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// A flagged transaction amount produced by the anomaly-detection worker.
/// Append-only: rows are written once by the anomaly loop and only ever
/// removed by the owning tenant dismissing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub company_id: CompanyId,
    /// Orphaned (`None`) if the source transaction was deleted, or if the
    /// worker never attached one.
    pub transaction_id: Option<TransactionId>,
    pub amount: Decimal,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnomaly {
    pub company_id: CompanyId,
    pub transaction_id: Option<TransactionId>,
    pub amount: Decimal,
}

#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn insert(&self, anomaly: NewAnomaly) -> AnomalyResult<Anomaly>;

    async fn list(&self, company_id: &CompanyId) -> AnomalyResult<Vec<Anomaly>>;

    /// Removes an anomaly on behalf of its owning tenant. `Forbidden` if the
    /// anomaly belongs to a different company; `NotFound` if absent.
    async fn dismiss(&self, company_id: &CompanyId, id: &AnomalyId) -> AnomalyResult<()>;
}
