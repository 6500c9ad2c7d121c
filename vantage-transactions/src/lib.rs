#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use vantage_events::EventBus;
use vantage_events::ROUTING_KEY_TRANSACTIONS_NEW;
use vantage_ledger::CompanyId;
use vantage_ledger::LedgerError;
use vantage_ledger::LedgerStore;
use vantage_ledger::NewTransaction;
use vantage_ledger::Transaction;
use vantage_ledger::TransactionId;
use vantage_reporting::ReportingEngine;

#[derive(Debug, Error)]
pub enum TransactionServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Write path for transactions: persists the row, evicts the tenant's P&L
/// cache, and publishes to the event bus. Publish failure is logged and
/// never fails the write or rolls it back.
pub struct TransactionService {
    ledger: Arc<dyn LedgerStore>,
    reporting: Arc<ReportingEngine>,
    events: Arc<dyn EventBus>,
}

impl TransactionService {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        reporting: Arc<ReportingEngine>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            ledger,
            reporting,
            events,
        }
    }

    pub async fn list(&self, company_id: &CompanyId) -> Result<Vec<Transaction>, TransactionServiceError> {
        Ok(self.ledger.list_transactions(company_id).await?)
    }

    pub async fn create(
        &self,
        request: NewTransaction,
    ) -> Result<Transaction, TransactionServiceError> {
        let company_id = request.company_id.clone();
        let transaction = self.ledger.insert_transaction(request).await?;

        self.reporting.evict(&company_id);

        let payload = json!({
            "companyId": company_id,
            "txnIds": [transaction.id.clone()],
        });
        if let Err(err) = self
            .events
            .publish(ROUTING_KEY_TRANSACTIONS_NEW, payload)
            .await
        {
            tracing::warn!(%err, company_id, "failed to publish transaction event");
        }

        Ok(transaction)
    }

    pub async fn delete(
        &self,
        company_id: &CompanyId,
        id: &TransactionId,
    ) -> Result<(), TransactionServiceError> {
        self.ledger.delete_transaction(company_id, id).await?;
        self.reporting.evict(company_id);
        Ok(())
    }
}
