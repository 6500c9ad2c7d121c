use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Anomaly;
use crate::AnomalyError;
use crate::AnomalyId;
use crate::AnomalyResult;
use crate::AnomalyStore;
use crate::CompanyId;
use crate::NewAnomaly;

#[derive(Default)]
pub struct InMemoryAnomalyStore {
    rows: RwLock<HashMap<AnomalyId, Anomaly>>,
}

impl InMemoryAnomalyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnomalyStore for InMemoryAnomalyStore {
    async fn insert(&self, anomaly: NewAnomaly) -> AnomalyResult<Anomaly> {
        let row = Anomaly {
            id: Uuid::new_v4().to_string(),
            company_id: anomaly.company_id,
            transaction_id: anomaly.transaction_id,
            amount: anomaly.amount,
            detected_at: Utc::now(),
        };
        self.rows.write().await.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn list(&self, company_id: &CompanyId) -> AnomalyResult<Vec<Anomaly>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Anomaly> = rows
            .values()
            .filter(|a| &a.company_id == company_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| std::cmp::Reverse(a.detected_at));
        Ok(matching)
    }

    async fn dismiss(&self, company_id: &CompanyId, id: &AnomalyId) -> AnomalyResult<()> {
        let mut rows = self.rows.write().await;
        let Some(existing) = rows.get(id) else {
            return Err(AnomalyError::NotFound(format!("anomaly {id}")));
        };
        if &existing.company_id != company_id {
            return Err(AnomalyError::Forbidden(format!(
                "anomaly {id} does not belong to company {company_id}"
            )));
        }
        rows.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn insert_and_list_scoped_to_company() {
        let store = InMemoryAnomalyStore::new();
        store
            .insert(NewAnomaly {
                company_id: "company-1".into(),
                transaction_id: Some("txn-1".into()),
                amount: dec!(999.99),
            })
            .await
            .expect("insert succeeds");
        store
            .insert(NewAnomaly {
                company_id: "company-2".into(),
                transaction_id: None,
                amount: dec!(42.00),
            })
            .await
            .expect("insert succeeds");

        let rows = store.list(&"company-1".to_string()).await.expect("list succeeds");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, dec!(999.99));
    }

    #[tokio::test]
    async fn dismiss_rejects_cross_tenant_and_removes_on_owner() {
        let store = InMemoryAnomalyStore::new();
        let anomaly = store
            .insert(NewAnomaly {
                company_id: "company-1".into(),
                transaction_id: None,
                amount: dec!(10.00),
            })
            .await
            .expect("insert succeeds");

        let err = store
            .dismiss(&"company-2".to_string(), &anomaly.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AnomalyError::Forbidden(_)));

        store
            .dismiss(&"company-1".to_string(), &anomaly.id)
            .await
            .expect("owner can dismiss");
        assert!(store.list(&"company-1".to_string()).await.expect("list succeeds").is_empty());
    }

    #[tokio::test]
    async fn dismiss_missing_anomaly_is_not_found() {
        let store = InMemoryAnomalyStore::new();
        let err = store
            .dismiss(&"company-1".to_string(), &"missing".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AnomalyError::NotFound(_)));
    }
}
