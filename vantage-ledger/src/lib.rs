#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

mod memory;

pub use memory::InMemoryLedgerStore;

pub type CompanyId = String;
pub type TransactionId = String;
pub type CategoryId = String;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation error: {0}")]
    Validation(String),
}

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSource {
    #[default]
    Manual,
    Imported,
    Scanned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    /// `None` means the category is global, shared across every tenant.
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub source: TransactionSource,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub category_id: Option<CategoryId>,
}

impl NewTransaction {
    pub fn validate(self) -> LedgerResult<Self> {
        if self.description.chars().count() > 512 {
            return Err(LedgerError::Validation(
                "description must be at most 512 characters".into(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub name: String,
    pub amount: Decimal,
}

/// Transaction and category storage plus the four read-side aggregations the
/// reporting engine builds P&L reports from. Every aggregation is inclusive
/// of both endpoints and returns a zero scalar, never an absent row, when no
/// transaction matches.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_transaction(&self, transaction: NewTransaction) -> LedgerResult<Transaction>;

    async fn find_transaction(&self, id: &TransactionId) -> LedgerResult<Option<Transaction>>;

    async fn list_transactions(&self, company_id: &CompanyId) -> LedgerResult<Vec<Transaction>>;

    async fn delete_transaction(
        &self,
        company_id: &CompanyId,
        id: &TransactionId,
    ) -> LedgerResult<()>;

    async fn sum_positive(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal>;

    async fn sum_negative(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal>;

    async fn sum_by_category(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<CategoryTotal>>;

    async fn count(
        &self,
        company_id: &CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<u64>;

    async fn find_category(&self, id: &CategoryId) -> LedgerResult<Option<Category>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_rejects_long_description() {
        let err = NewTransaction {
            company_id: "company-1".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            amount: Decimal::ONE,
            description: "x".repeat(513),
            category_id: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn new_transaction_accepts_max_length_description() {
        NewTransaction {
            company_id: "company-1".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            amount: Decimal::ONE,
            description: "x".repeat(512),
            category_id: None,
        }
        .validate()
        .expect("should validate");
    }
}
