use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Category;
use crate::CategoryId;
use crate::CategoryTotal;
use crate::CompanyId;
use crate::LedgerError;
use crate::LedgerResult;
use crate::LedgerStore;
use crate::NewTransaction;
use crate::Transaction;
use crate::TransactionId;
use crate::TransactionSource;
use crate::UNCATEGORIZED;

#[derive(Default)]
struct State {
    transactions: HashMap<TransactionId, Transaction>,
    categories: HashMap<CategoryId, Category>,
}

/// In-memory ledger used in place of a relational store: transactions and
/// categories live in plain maps and the four aggregations are computed by
/// filter-and-fold over them rather than SQL.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_categories(categories: Vec<Category>) -> Self {
        let mut by_id = HashMap::new();
        for category in categories {
            by_id.insert(category.id.clone(), category);
        }
        Self {
            state: RwLock::new(State {
                transactions: HashMap::new(),
                categories: by_id,
            }),
        }
    }

    fn in_range(transaction: &Transaction, company_id: &CompanyId, start: NaiveDate, end: NaiveDate) -> bool {
        &transaction.company_id == company_id && transaction.date >= start && transaction.date <= end
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_transaction(&self, transaction: NewTransaction) -> LedgerResult<Transaction> {
        let transaction = transaction.validate()?;
        let mut state = self.state.write().await;

        let row = Transaction {
            id: Uuid::new_v4().to_string(),
            company_id: transaction.company_id,
            date: transaction.date,
            amount: transaction.amount,
            description: transaction.description,
            source: TransactionSource::Manual,
            category_id: transaction.category_id,
            created_at: Utc::now(),
        };

        state.transactions.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn find_transaction(&self, id: &TransactionId) -> LedgerResult<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(id).cloned())
    }

    async fn list_transactions(&self, company_id: &CompanyId) -> LedgerResult<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut rows: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| &t.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| Reverse(t.date));
        Ok(rows)
    }

    async fn delete_transaction(
        &self,
        company_id: &CompanyId,
        id: &TransactionId,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let Some(existing) = state.transactions.get(id) else {
            return Err(LedgerError::NotFound(format!("transaction {id}")));
        };
        if &existing.company_id != company_id {
            return Err(LedgerError::Forbidden(format!(
                "transaction {id} does not belong to company {company_id}"
            )));
        }
        state.transactions.remove(id);
        Ok(())
    }

    async fn sum_positive(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal> {
        let state = self.state.read().await;
        let total = state
            .transactions
            .values()
            .filter(|t| Self::in_range(t, company_id, start, end) && t.amount > Decimal::ZERO)
            .fold(Decimal::ZERO, |acc, t| acc + t.amount);
        Ok(total)
    }

    async fn sum_negative(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal> {
        let state = self.state.read().await;
        let total = state
            .transactions
            .values()
            .filter(|t| Self::in_range(t, company_id, start, end) && t.amount < Decimal::ZERO)
            .fold(Decimal::ZERO, |acc, t| acc + t.amount);
        Ok(total)
    }

    async fn sum_by_category(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<CategoryTotal>> {
        let state = self.state.read().await;
        let mut totals: HashMap<String, Decimal> = HashMap::new();
        for transaction in state
            .transactions
            .values()
            .filter(|t| Self::in_range(t, company_id, start, end))
        {
            let name = transaction
                .category_id
                .as_ref()
                .and_then(|id| state.categories.get(id))
                .map_or_else(|| UNCATEGORIZED.to_string(), |category| category.name.clone());
            *totals.entry(name).or_insert(Decimal::ZERO) += transaction.amount;
        }

        let mut rows: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(name, amount)| CategoryTotal { name, amount })
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse(row.amount));
        Ok(rows)
    }

    async fn count(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<u64> {
        let state = self.state.read().await;
        let count = state
            .transactions
            .values()
            .filter(|t| Self::in_range(t, company_id, start, end))
            .count();
        Ok(count as u64)
    }

    async fn find_category(&self, id: &CategoryId) -> LedgerResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CategoryKind;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[tokio::test]
    async fn aggregations_are_zero_on_empty_input() {
        let store = InMemoryLedgerStore::new();
        let company = "company-1".to_string();
        let start = date(2026, 1, 1);
        let end = date(2026, 1, 31);

        assert_eq!(store.sum_positive(&company, start, end).await.unwrap(), Decimal::ZERO);
        assert_eq!(store.sum_negative(&company, start, end).await.unwrap(), Decimal::ZERO);
        assert_eq!(store.count(&company, start, end).await.unwrap(), 0);
        assert!(store.sum_by_category(&company, start, end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sum_positive_and_negative_split_by_sign() {
        let store = InMemoryLedgerStore::new();
        let company = "company-1".to_string();

        store
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 10),
                amount: dec!(100.00),
                description: "income".into(),
                category_id: None,
            })
            .await
            .expect("insert");
        store
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 11),
                amount: dec!(-40.00),
                description: "expense".into(),
                category_id: None,
            })
            .await
            .expect("insert");

        let start = date(2026, 1, 1);
        let end = date(2026, 1, 31);
        assert_eq!(store.sum_positive(&company, start, end).await.unwrap(), dec!(100.00));
        assert_eq!(store.sum_negative(&company, start, end).await.unwrap(), dec!(-40.00));
        assert_eq!(store.count(&company, start, end).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sum_by_category_falls_back_to_uncategorized_and_sorts_descending() {
        let category = Category {
            id: "cat-1".into(),
            company_id: None,
            name: "Rent".into(),
            kind: CategoryKind::Expense,
        };
        let store = InMemoryLedgerStore::with_categories(vec![category]);
        let company = "company-1".to_string();

        store
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 5),
                amount: dec!(-500.00),
                description: "rent".into(),
                category_id: Some("cat-1".into()),
            })
            .await
            .expect("insert");
        store
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 6),
                amount: dec!(-1000.00),
                description: "no category".into(),
                category_id: None,
            })
            .await
            .expect("insert");

        let totals = store
            .sum_by_category(&company, date(2026, 1, 1), date(2026, 1, 31))
            .await
            .expect("aggregation succeeds");

        assert_eq!(totals[0].name, "Rent");
        assert_eq!(totals[0].amount, dec!(-500.00));
        assert_eq!(totals[1].name, UNCATEGORIZED);
        assert_eq!(totals[1].amount, dec!(-1000.00));
    }

    #[tokio::test]
    async fn delete_transaction_rejects_cross_tenant() {
        let store = InMemoryLedgerStore::new();
        let transaction = store
            .insert_transaction(NewTransaction {
                company_id: "company-1".into(),
                date: date(2026, 1, 1),
                amount: dec!(10.00),
                description: "txn".into(),
                category_id: None,
            })
            .await
            .expect("insert");

        let err = store
            .delete_transaction(&"company-2".to_string(), &transaction.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        store
            .delete_transaction(&"company-1".to_string(), &transaction.id)
            .await
            .expect("owner can delete");
        assert!(store.find_transaction(&transaction.id).await.unwrap().is_none());
    }
}
